// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The transactional ledger engine. Every mutation of account balances goes
//! through here, inside one SQLite transaction per call: the row write and its
//! balance effect(s) commit or roll back together, so no partially-applied
//! state is ever observable. Edits and deletes reverse the pre-image's effect
//! exactly before applying anything new.

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use crate::errors::{LedgerError, Result};
use crate::models::{
    Account, Category, CategoryKind, KindColumns, TransactionDraft, TransactionKind,
    TransactionRecord,
};
use crate::money::{ExchangeRate, Money};
use crate::currency;

/// A signed adjustment to one account's persisted balance, in that account's
/// own minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    pub account_id: i64,
    pub delta_minor: i64,
}

impl Effect {
    fn inverse(self) -> Effect {
        Effect {
            account_id: self.account_id,
            delta_minor: -self.delta_minor,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Validate, then atomically insert the row and apply its balance effect(s).
pub fn create_transaction(conn: &mut Connection, draft: &TransactionDraft) -> Result<i64> {
    validate_draft(conn, draft, None)?;
    let tx = conn.transaction()?;
    let id = insert_row(&tx, draft)?;
    for effect in effects_of(&tx, &draft.amount, &draft.kind)? {
        apply_effect(&tx, effect)?;
    }
    tx.commit()?;
    Ok(id)
}

/// Replace a committed transaction in place. The old balance footprint is
/// cancelled using the pre-image (for transfers, its stored exchange rate,
/// never a fresh quote), then the new payload's effect is applied; both halves
/// share one atomic unit with the row update.
pub fn update_transaction(conn: &mut Connection, id: i64, draft: &TransactionDraft) -> Result<()> {
    let existing =
        get_transaction(conn, id)?.ok_or_else(|| LedgerError::not_found("transaction", id))?;
    validate_draft(conn, draft, Some(&existing))?;
    let tx = conn.transaction()?;
    for effect in effects_of(&tx, &existing.amount, &existing.kind)? {
        apply_effect(&tx, effect.inverse())?;
    }
    for effect in effects_of(&tx, &draft.amount, &draft.kind)? {
        apply_effect(&tx, effect)?;
    }
    update_row(&tx, id, draft)?;
    tx.commit()?;
    Ok(())
}

/// Reverse and remove a transaction. Deleting an absent id is a no-op.
/// Deleting a `lent`/`borrowed` transaction reverses and removes its linked
/// repayments first; each child carries its own balance effect, so a raw
/// foreign-key cascade would leave balances wrong.
pub fn delete_transaction(conn: &mut Connection, id: i64) -> Result<()> {
    let Some(existing) = get_transaction(conn, id)? else {
        return Ok(());
    };
    let tx = conn.transaction()?;
    reverse_and_delete(&tx, &existing)?;
    tx.commit()?;
    Ok(())
}

/// Bulk create as a single atomic unit: one bad item rolls back the whole
/// batch. Items are validated inside the unit so a repayment may reference a
/// loan created earlier in the same batch.
pub fn create_batch(conn: &mut Connection, drafts: &[TransactionDraft]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(drafts.len());
    for draft in drafts {
        validate_draft(&tx, draft, None)?;
        let id = insert_row(&tx, draft)?;
        for effect in effects_of(&tx, &draft.amount, &draft.kind)? {
            apply_effect(&tx, effect)?;
        }
        ids.push(id);
    }
    tx.commit()?;
    Ok(ids)
}

/// Remove an account and every transaction touching it, reversing each one
/// through the engine so surviving accounts keep exact balances.
pub fn delete_account(conn: &mut Connection, id: i64) -> Result<()> {
    load_account(conn, id)?;
    let tx = conn.transaction()?;
    let touching: Vec<i64> = {
        let mut stmt = tx.prepare(
            "SELECT id FROM transactions
             WHERE account_id=?1 OR from_account_id=?1 OR to_account_id=?1",
        )?;
        let rows = stmt.query_map(params![id], |r| r.get(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };
    for txn_id in touching {
        // A loan cascade earlier in the loop may already have removed this row.
        if let Some(rec) = get_transaction(&tx, txn_id)? {
            reverse_and_delete(&tx, &rec)?;
        }
    }
    tx.execute("DELETE FROM budget_accounts WHERE account_id=?1", params![id])?;
    tx.execute("DELETE FROM main_account WHERE account_id=?1", params![id])?;
    tx.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
    tx.commit()?;
    Ok(())
}

/// Remove a category and every expense/income filed under it, reversing each
/// through the engine.
pub fn delete_category(conn: &mut Connection, id: i64) -> Result<()> {
    load_category(conn, id)?;
    let tx = conn.transaction()?;
    let members: Vec<i64> = {
        let mut stmt = tx.prepare("SELECT id FROM transactions WHERE category_id=?1")?;
        let rows = stmt.query_map(params![id], |r| r.get(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };
    for txn_id in members {
        if let Some(rec) = get_transaction(&tx, txn_id)? {
            reverse_and_delete(&tx, &rec)?;
        }
    }
    tx.execute(
        "DELETE FROM budget_categories WHERE category_id=?1",
        params![id],
    )?;
    tx.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Balance effects
// ---------------------------------------------------------------------------

/// The signed balance footprint of a transaction, per variant. Transfers
/// credit the destination with `amount × rate` converted into the destination
/// account's currency scale.
pub fn effects_of(
    conn: &Connection,
    amount: &Money,
    kind: &TransactionKind,
) -> Result<Vec<Effect>> {
    let debit = |account_id: i64| Effect {
        account_id,
        delta_minor: -amount.minor,
    };
    let credit = |account_id: i64| Effect {
        account_id,
        delta_minor: amount.minor,
    };
    match kind {
        TransactionKind::Expense { account_id, .. }
        | TransactionKind::Lent { account_id, .. }
        | TransactionKind::PaidLoan { account_id, .. } => Ok(vec![debit(*account_id)]),
        TransactionKind::Income { account_id, .. }
        | TransactionKind::Borrowed { account_id, .. }
        | TransactionKind::CollectedDebt { account_id, .. } => Ok(vec![credit(*account_id)]),
        TransactionKind::Transfer {
            from_account_id,
            to_account_id,
            exchange_rate,
        } => {
            let to_account = load_account(conn, *to_account_id)?;
            let credited = amount.convert(&ExchangeRate {
                from: amount.currency.clone(),
                to: to_account.currency,
                rate: *exchange_rate,
            })?;
            Ok(vec![
                debit(*from_account_id),
                Effect {
                    account_id: *to_account_id,
                    delta_minor: credited.minor,
                },
            ])
        }
    }
}

fn apply_effect(conn: &Connection, effect: Effect) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET balance_minor = balance_minor + ?1,
         updated_at = datetime('now') WHERE id=?2",
        params![effect.delta_minor, effect.account_id],
    )?;
    if changed != 1 {
        return Err(LedgerError::not_found("account", effect.account_id));
    }
    Ok(())
}

fn reverse_and_delete(conn: &Connection, rec: &TransactionRecord) -> Result<()> {
    if rec.kind.is_loan() {
        for child in loan_children(conn, rec.id)? {
            reverse_and_delete(conn, &child)?;
        }
    }
    for effect in effects_of(conn, &rec.amount, &rec.kind)? {
        apply_effect(conn, effect.inverse())?;
    }
    conn.execute("DELETE FROM transactions WHERE id=?1", params![rec.id])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// All payload checks run before any mutation. `existing` is the pre-image
/// when validating an update.
pub fn validate_draft(
    conn: &Connection,
    draft: &TransactionDraft,
    existing: Option<&TransactionRecord>,
) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(LedgerError::validation("title", "title is required"));
    }
    if draft.amount.minor <= 0 {
        return Err(LedgerError::validation(
            "amount",
            "amount must be positive",
        ));
    }
    currency::lookup(&draft.amount.currency)?;

    match &draft.kind {
        TransactionKind::Expense {
            account_id,
            category_id,
        } => {
            let account = load_account(conn, *account_id)?;
            require_currency_match(&draft.amount, &account)?;
            require_category_kind(conn, *category_id, CategoryKind::Expense)?;
        }
        TransactionKind::Income {
            account_id,
            category_id,
        } => {
            let account = load_account(conn, *account_id)?;
            require_currency_match(&draft.amount, &account)?;
            require_category_kind(conn, *category_id, CategoryKind::Income)?;
        }
        TransactionKind::Transfer {
            from_account_id,
            to_account_id,
            exchange_rate,
        } => {
            if from_account_id == to_account_id {
                return Err(LedgerError::validation(
                    "to_account",
                    "transfer source and destination must differ",
                ));
            }
            if *exchange_rate <= Decimal::ZERO {
                return Err(LedgerError::validation(
                    "exchange_rate",
                    "exchange rate must be positive",
                ));
            }
            let from = load_account(conn, *from_account_id)?;
            // The destination side is implicitly converted; only the source
            // account's currency must match the amount.
            require_currency_match(&draft.amount, &from)?;
            let to = load_account(conn, *to_account_id)?;
            currency::lookup(&to.currency)?;
        }
        TransactionKind::Lent { account_id, .. } | TransactionKind::Borrowed { account_id, .. } => {
            let account = load_account(conn, *account_id)?;
            require_currency_match(&draft.amount, &account)?;
        }
        TransactionKind::PaidLoan {
            account_id,
            loan_id,
        } => {
            let account = load_account(conn, *account_id)?;
            require_currency_match(&draft.amount, &account)?;
            require_loan_counterpart(conn, *loan_id, "borrowed", existing)?;
        }
        TransactionKind::CollectedDebt {
            account_id,
            loan_id,
        } => {
            let account = load_account(conn, *account_id)?;
            require_currency_match(&draft.amount, &account)?;
            require_loan_counterpart(conn, *loan_id, "lent", existing)?;
        }
    }

    // Re-typing a loan that has linked repayments would orphan the
    // counterpart rule its children were validated against.
    if let Some(prior) = existing {
        if prior.kind.is_loan()
            && draft.kind.tag() != prior.kind.tag()
            && !loan_children(conn, prior.id)?.is_empty()
        {
            return Err(LedgerError::validation(
                "type",
                "loan has linked repayments; delete them first",
            ));
        }
    }
    Ok(())
}

fn require_currency_match(amount: &Money, account: &Account) -> Result<()> {
    if amount.currency != account.currency {
        return Err(LedgerError::validation(
            "amount",
            format!(
                "amount currency {} does not match account '{}' currency {}",
                amount.currency, account.name, account.currency
            ),
        ));
    }
    Ok(())
}

fn require_category_kind(conn: &Connection, category_id: i64, wanted: CategoryKind) -> Result<()> {
    let category = load_category(conn, category_id)?;
    match category.kind {
        None => Ok(()),
        Some(kind) if kind == wanted => Ok(()),
        Some(kind) => Err(LedgerError::validation(
            "category",
            format!(
                "category '{}' is {}-only and cannot classify a {} transaction",
                category.name,
                kind.tag(),
                wanted.tag()
            ),
        )),
    }
}

fn require_loan_counterpart(
    conn: &Connection,
    loan_id: i64,
    wanted_tag: &str,
    existing: Option<&TransactionRecord>,
) -> Result<()> {
    // An update may keep pointing at itself-adjacent rows; the referenced
    // loan must exist and be of the counterpart kind either way.
    if existing.map(|e| e.id) == Some(loan_id) {
        return Err(LedgerError::validation(
            "loan",
            "a repayment cannot reference itself",
        ));
    }
    let loan = get_transaction(conn, loan_id)?.ok_or_else(|| {
        LedgerError::validation("loan", format!("referenced loan {} does not exist", loan_id))
    })?;
    if loan.kind.tag() != wanted_tag {
        return Err(LedgerError::validation(
            "loan",
            format!(
                "loan {} is '{}', expected '{}'",
                loan_id,
                loan.kind.tag(),
                wanted_tag
            ),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row access
// ---------------------------------------------------------------------------

fn insert_row(conn: &Connection, draft: &TransactionDraft) -> Result<i64> {
    let cols = draft.kind.columns();
    conn.execute(
        "INSERT INTO transactions(type, title, note, datetime, amount_minor, currency,
            account_id, category_id, from_account_id, to_account_id, exchange_rate,
            due_date, loan_id)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        params![
            draft.kind.tag(),
            draft.title,
            draft.note,
            draft.datetime,
            draft.amount.minor,
            draft.amount.currency,
            cols.account_id,
            cols.category_id,
            cols.from_account_id,
            cols.to_account_id,
            cols.exchange_rate.map(|r| r.to_string()),
            cols.due_date,
            cols.loan_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_row(conn: &Connection, id: i64, draft: &TransactionDraft) -> Result<()> {
    let cols = draft.kind.columns();
    conn.execute(
        "UPDATE transactions SET type=?1, title=?2, note=?3, datetime=?4, amount_minor=?5,
            currency=?6, account_id=?7, category_id=?8, from_account_id=?9, to_account_id=?10,
            exchange_rate=?11, due_date=?12, loan_id=?13
         WHERE id=?14",
        params![
            draft.kind.tag(),
            draft.title,
            draft.note,
            draft.datetime,
            draft.amount.minor,
            draft.amount.currency,
            cols.account_id,
            cols.category_id,
            cols.from_account_id,
            cols.to_account_id,
            cols.exchange_rate.map(|r| r.to_string()),
            cols.due_date,
            cols.loan_id,
            id,
        ],
    )?;
    Ok(())
}

const TXN_COLUMNS: &str = "id, type, title, note, datetime, amount_minor, currency, account_id, \
     category_id, from_account_id, to_account_id, exchange_rate, due_date, loan_id";

fn record_from_row(row: &Row<'_>) -> Result<TransactionRecord> {
    let tag: String = row.get(1)?;
    let rate_raw: Option<String> = row.get(11)?;
    let exchange_rate = match rate_raw {
        Some(s) => Some(s.parse::<Decimal>().map_err(|_| {
            LedgerError::validation("exchange_rate", format!("unparseable stored rate '{}'", s))
        })?),
        None => None,
    };
    let cols = KindColumns {
        account_id: row.get(7)?,
        category_id: row.get(8)?,
        from_account_id: row.get(9)?,
        to_account_id: row.get(10)?,
        exchange_rate,
        due_date: row.get(12)?,
        loan_id: row.get(13)?,
    };
    let datetime: NaiveDateTime = row.get(4)?;
    Ok(TransactionRecord {
        id: row.get(0)?,
        title: row.get(2)?,
        note: row.get(3)?,
        datetime,
        amount: Money::new(row.get(5)?, row.get::<_, String>(6)?),
        kind: TransactionKind::from_columns(&tag, cols)?,
    })
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<TransactionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions WHERE id=?1",
        TXN_COLUMNS
    ))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(record_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn list_transactions(conn: &Connection) -> Result<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions ORDER BY datetime DESC, id DESC",
        TXN_COLUMNS
    ))?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(record_from_row(row)?);
    }
    Ok(out)
}

/// Repayments linked to a `lent`/`borrowed` transaction.
pub fn loan_children(conn: &Connection, loan_id: i64) -> Result<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions WHERE loan_id=?1 ORDER BY datetime, id",
        TXN_COLUMNS
    ))?;
    let mut rows = stmt.query(params![loan_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(record_from_row(row)?);
    }
    Ok(out)
}

pub fn load_account(conn: &Connection, id: i64) -> Result<Account> {
    let mut stmt = conn.prepare(
        "SELECT id, name, color, currency, balance_minor, created_at, updated_at
         FROM accounts WHERE id=?1",
    )?;
    stmt.query_row(params![id], |r| {
        Ok(Account {
            id: r.get(0)?,
            name: r.get(1)?,
            color: r.get(2)?,
            currency: r.get(3)?,
            balance_minor: r.get(4)?,
            created_at: r.get(5)?,
            updated_at: r.get(6)?,
        })
    })
    .optional()?
    .ok_or_else(|| LedgerError::not_found("account", id))
}

pub fn load_category(conn: &Connection, id: i64) -> Result<Category> {
    let mut stmt = conn.prepare(
        "SELECT id, name, color, icon_type, icon_value, kind FROM categories WHERE id=?1",
    )?;
    stmt.query_row(params![id], |r| {
        Ok(Category {
            id: r.get(0)?,
            name: r.get(1)?,
            color: r.get(2)?,
            icon_type: r.get(3)?,
            icon_value: r.get(4)?,
            kind: r
                .get::<_, Option<String>>(5)?
                .and_then(|t| CategoryKind::from_tag(&t)),
        })
    })
    .optional()?
    .ok_or_else(|| LedgerError::not_found("category", id))
}

/// Current persisted balance as `Money` in the account's currency.
pub fn account_balance(conn: &Connection, id: i64) -> Result<Money> {
    let account = load_account(conn, id)?;
    Ok(Money::new(account.balance_minor, account.currency))
}

/// Point the single main-account marker at `account_id`.
pub fn set_main_account(conn: &Connection, account_id: i64) -> Result<()> {
    load_account(conn, account_id)?;
    conn.execute("DELETE FROM main_account", [])?;
    conn.execute(
        "INSERT INTO main_account(account_id, updated_at) VALUES(?1, datetime('now'))",
        params![account_id],
    )?;
    Ok(())
}

/// The designated main account, latest pointer winning if the table ever
/// holds more than one row.
pub fn main_account(conn: &Connection) -> Result<Option<i64>> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT account_id FROM main_account ORDER BY updated_at DESC, rowid DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Recompute an account's balance from the committed transaction log,
/// independent of the persisted column. Used by `doctor`-style consistency
/// checks and conservation tests.
pub fn recompute_balance(conn: &Connection, account_id: i64) -> Result<i64> {
    let mut total: i64 = 0;
    for rec in list_transactions(conn)? {
        for effect in effects_of(conn, &rec.amount, &rec.kind)? {
            if effect.account_id == account_id {
                total += effect.delta_minor;
            }
        }
    }
    Ok(total)
}

pub fn account_id_by_name(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM accounts WHERE name=?1",
        params![name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("account", name))
}

pub fn category_id_by_name(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM categories WHERE name=?1",
        params![name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("category", name))
}
