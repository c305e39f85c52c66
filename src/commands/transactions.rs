// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use crate::errors::LedgerError;
use crate::ledger;
use crate::models::{TransactionDraft, TransactionKind};
use crate::money::{self, Money};
use crate::rates::RateCache;
use crate::utils::{maybe_print_json, parse_date, parse_datetime, parse_decimal, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let draft = build_draft(conn, sub)?;
            let id = ledger::create_transaction(conn, &draft)?;
            println!(
                "Recorded {} '{}' ({}) as #{}",
                draft.kind.tag(),
                draft.title,
                draft.amount.format()?,
                id
            );
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let draft = build_draft(conn, sub)?;
            ledger::update_transaction(conn, id, &draft)?;
            println!("Updated transaction #{}", id);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            ledger::delete_transaction(conn, id)?;
            println!("Deleted transaction #{}", id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Assemble a variant payload from CLI flags. Account currencies decide the
/// minor-unit scale of the typed amount.
fn build_draft(conn: &Connection, sub: &clap::ArgMatches) -> Result<TransactionDraft> {
    let tag = sub.get_one::<String>("type").unwrap().as_str();
    let title = sub.get_one::<String>("title").unwrap().clone();
    let note = sub.get_one::<String>("note").cloned();
    let amount_major = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let datetime = match sub.get_one::<String>("date") {
        Some(s) => parse_datetime(s)?,
        None => Utc::now().naive_utc(),
    };

    let account_arg = |flag: &'static str| -> Result<(i64, String)> {
        let name = sub
            .get_one::<String>(flag)
            .with_context(|| format!("--{} is required for {}", flag, tag))?;
        let id = ledger::account_id_by_name(conn, name)?;
        let account = ledger::load_account(conn, id)?;
        Ok((id, account.currency))
    };

    let (currency, kind) = match tag {
        "expense" | "income" => {
            let (account_id, ccy) = account_arg("account")?;
            let cat_name = sub
                .get_one::<String>("category")
                .with_context(|| format!("--category is required for {}", tag))?;
            let category_id = ledger::category_id_by_name(conn, cat_name)?;
            let kind = if tag == "expense" {
                TransactionKind::Expense {
                    account_id,
                    category_id,
                }
            } else {
                TransactionKind::Income {
                    account_id,
                    category_id,
                }
            };
            (ccy, kind)
        }
        "transfer" => {
            let (from_account_id, from_ccy) = account_arg("from")?;
            let (to_account_id, to_ccy) = account_arg("to")?;
            let exchange_rate = match sub.get_one::<String>("rate") {
                Some(raw) => parse_decimal(raw)?,
                // No explicit rate: a transfer cannot be created without one,
                // so a cache miss here is a hard error, unlike in reports.
                None => RateCache::new(conn).get(&from_ccy, &to_ccy)?.ok_or(
                    LedgerError::MissingExchangeRate {
                        from: from_ccy.clone(),
                        to: to_ccy.clone(),
                    },
                )?,
            };
            (
                from_ccy,
                TransactionKind::Transfer {
                    from_account_id,
                    to_account_id,
                    exchange_rate,
                },
            )
        }
        "lent" | "borrowed" => {
            let (account_id, ccy) = account_arg("account")?;
            let due_date = sub
                .get_one::<String>("due")
                .map(|s| parse_date(s))
                .transpose()?;
            let kind = if tag == "lent" {
                TransactionKind::Lent {
                    account_id,
                    due_date,
                }
            } else {
                TransactionKind::Borrowed {
                    account_id,
                    due_date,
                }
            };
            (ccy, kind)
        }
        "paid-loan" | "collected-debt" => {
            let (account_id, ccy) = account_arg("account")?;
            let loan_id = *sub
                .get_one::<i64>("loan")
                .with_context(|| format!("--loan is required for {}", tag))?;
            let kind = if tag == "paid-loan" {
                TransactionKind::PaidLoan {
                    account_id,
                    loan_id,
                }
            } else {
                TransactionKind::CollectedDebt {
                    account_id,
                    loan_id,
                }
            };
            (ccy, kind)
        }
        other => anyhow::bail!("Unknown transaction type '{}'", other),
    };

    let minor = money::to_minor(amount_major, &currency)?;
    Ok(TransactionDraft {
        title,
        note,
        datetime,
        amount: Money::new(minor, currency),
        kind,
    })
}

#[derive(Serialize)]
pub struct TransactionListRow {
    pub id: i64,
    pub datetime: String,
    pub kind: String,
    pub title: String,
    pub amount: String,
    pub currency: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionListRow>> {
    let month = sub.get_one::<String>("month");
    let account = sub
        .get_one::<String>("account")
        .map(|n| ledger::account_id_by_name(conn, n))
        .transpose()?;
    let limit = sub.get_one::<usize>("limit").copied();

    let mut out = Vec::new();
    for rec in ledger::list_transactions(conn)? {
        if let Some(m) = month {
            if !rec.datetime.format("%Y-%m").to_string().eq(m) {
                continue;
            }
        }
        if let Some(account_id) = account {
            let cols = rec.kind.columns();
            let touches = cols.account_id == Some(account_id)
                || cols.from_account_id == Some(account_id)
                || cols.to_account_id == Some(account_id);
            if !touches {
                continue;
            }
        }
        out.push(TransactionListRow {
            id: rec.id,
            datetime: rec.datetime.format("%Y-%m-%d %H:%M").to_string(),
            kind: rec.kind.tag().to_string(),
            title: rec.title.clone(),
            amount: rec.amount.format()?,
            currency: rec.amount.currency.clone(),
        });
        if Some(out.len()) == limit {
            break;
        }
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let rows = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        let data = rows
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.datetime.clone(),
                    r.kind.clone(),
                    r.title.clone(),
                    r.amount.clone(),
                    r.currency.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Id", "When", "Type", "Title", "Amount", "CCY"], data)
        );
    }
    Ok(())
}
