// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::money::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub currency: String,
    pub balance_minor: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Expense,
    Income,
}

impl CategoryKind {
    pub fn tag(self) -> &'static str {
        match self {
            CategoryKind::Expense => "expense",
            CategoryKind::Income => "income",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "expense" => Some(CategoryKind::Expense),
            "income" => Some(CategoryKind::Income),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub icon_type: String,
    pub icon_value: String,
    /// `None` means the category is usable by both expenses and incomes.
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn tag(self) -> &'static str {
        match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "weekly" => Some(BudgetPeriod::Weekly),
            "monthly" => Some(BudgetPeriod::Monthly),
            "yearly" => Some(BudgetPeriod::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub period: BudgetPeriod,
    pub color: String,
    pub accounts: Vec<i64>,
    pub categories: Vec<i64>,
}

/// The closed set of money movements. Each variant carries exactly the fields
/// its balance rule needs, so dispatch sites stay exhaustive and adding an
/// eighth kind is a compile error everywhere it matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    Expense {
        account_id: i64,
        category_id: i64,
    },
    Income {
        account_id: i64,
        category_id: i64,
    },
    Transfer {
        from_account_id: i64,
        to_account_id: i64,
        exchange_rate: Decimal,
    },
    Lent {
        account_id: i64,
        due_date: Option<NaiveDate>,
    },
    Borrowed {
        account_id: i64,
        due_date: Option<NaiveDate>,
    },
    PaidLoan {
        account_id: i64,
        loan_id: i64,
    },
    CollectedDebt {
        account_id: i64,
        loan_id: i64,
    },
}

impl TransactionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            TransactionKind::Expense { .. } => "expense",
            TransactionKind::Income { .. } => "income",
            TransactionKind::Transfer { .. } => "transfer",
            TransactionKind::Lent { .. } => "lent",
            TransactionKind::Borrowed { .. } => "borrowed",
            TransactionKind::PaidLoan { .. } => "paid_loan",
            TransactionKind::CollectedDebt { .. } => "collected_debt",
        }
    }

    /// The repayment link, if this kind carries one.
    pub fn loan_id(&self) -> Option<i64> {
        match self {
            TransactionKind::PaidLoan { loan_id, .. }
            | TransactionKind::CollectedDebt { loan_id, .. } => Some(*loan_id),
            TransactionKind::Expense { .. }
            | TransactionKind::Income { .. }
            | TransactionKind::Transfer { .. }
            | TransactionKind::Lent { .. }
            | TransactionKind::Borrowed { .. } => None,
        }
    }

    pub fn is_loan(&self) -> bool {
        matches!(
            self,
            TransactionKind::Lent { .. } | TransactionKind::Borrowed { .. }
        )
    }

    /// Flatten the variant payload onto the transaction table's columns.
    pub fn columns(&self) -> KindColumns {
        let mut cols = KindColumns::default();
        match self {
            TransactionKind::Expense {
                account_id,
                category_id,
            }
            | TransactionKind::Income {
                account_id,
                category_id,
            } => {
                cols.account_id = Some(*account_id);
                cols.category_id = Some(*category_id);
            }
            TransactionKind::Transfer {
                from_account_id,
                to_account_id,
                exchange_rate,
            } => {
                cols.from_account_id = Some(*from_account_id);
                cols.to_account_id = Some(*to_account_id);
                cols.exchange_rate = Some(*exchange_rate);
            }
            TransactionKind::Lent {
                account_id,
                due_date,
            }
            | TransactionKind::Borrowed {
                account_id,
                due_date,
            } => {
                cols.account_id = Some(*account_id);
                cols.due_date = *due_date;
            }
            TransactionKind::PaidLoan {
                account_id,
                loan_id,
            }
            | TransactionKind::CollectedDebt {
                account_id,
                loan_id,
            } => {
                cols.account_id = Some(*account_id);
                cols.loan_id = Some(*loan_id);
            }
        }
        cols
    }

    /// Rebuild the variant from flattened columns. A tag/column mismatch is
    /// storage-level corruption, reported rather than guessed around.
    pub fn from_columns(tag: &str, cols: KindColumns) -> Result<Self> {
        let missing = |field: &'static str| LedgerError::Validation {
            field,
            reason: format!("column missing for stored '{}' row", tag),
        };
        match tag {
            "expense" => Ok(TransactionKind::Expense {
                account_id: cols.account_id.ok_or_else(|| missing("account"))?,
                category_id: cols.category_id.ok_or_else(|| missing("category"))?,
            }),
            "income" => Ok(TransactionKind::Income {
                account_id: cols.account_id.ok_or_else(|| missing("account"))?,
                category_id: cols.category_id.ok_or_else(|| missing("category"))?,
            }),
            "transfer" => Ok(TransactionKind::Transfer {
                from_account_id: cols.from_account_id.ok_or_else(|| missing("from_account"))?,
                to_account_id: cols.to_account_id.ok_or_else(|| missing("to_account"))?,
                exchange_rate: cols.exchange_rate.ok_or_else(|| missing("exchange_rate"))?,
            }),
            "lent" => Ok(TransactionKind::Lent {
                account_id: cols.account_id.ok_or_else(|| missing("account"))?,
                due_date: cols.due_date,
            }),
            "borrowed" => Ok(TransactionKind::Borrowed {
                account_id: cols.account_id.ok_or_else(|| missing("account"))?,
                due_date: cols.due_date,
            }),
            "paid_loan" => Ok(TransactionKind::PaidLoan {
                account_id: cols.account_id.ok_or_else(|| missing("account"))?,
                loan_id: cols.loan_id.ok_or_else(|| missing("loan"))?,
            }),
            "collected_debt" => Ok(TransactionKind::CollectedDebt {
                account_id: cols.account_id.ok_or_else(|| missing("account"))?,
                loan_id: cols.loan_id.ok_or_else(|| missing("loan"))?,
            }),
            other => Err(LedgerError::validation(
                "type",
                format!("unknown transaction type '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KindColumns {
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub from_account_id: Option<i64>,
    pub to_account_id: Option<i64>,
    pub exchange_rate: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub loan_id: Option<i64>,
}

/// A transaction as submitted for create/update, before it has an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub title: String,
    pub note: Option<String>,
    pub datetime: NaiveDateTime,
    pub amount: Money,
    pub kind: TransactionKind,
}

/// A committed transaction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub title: String,
    pub note: Option<String>,
    pub datetime: NaiveDateTime,
    pub amount: Money,
    pub kind: TransactionKind,
}

impl TransactionRecord {
    pub fn draft(&self) -> TransactionDraft {
        TransactionDraft {
            title: self.title.clone(),
            note: self.note.clone(),
            datetime: self.datetime,
            amount: self.amount.clone(),
            kind: self.kind.clone(),
        }
    }
}
