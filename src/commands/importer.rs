// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use rusqlite::Connection;
use std::collections::HashMap;

use crate::models::{TransactionDraft, TransactionKind};
use crate::money::{self, Money};
use crate::utils::{parse_date, parse_datetime, parse_decimal};
use crate::{currency, ledger};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => import_transactions(conn, sub),
        _ => Ok(()),
    }
}

/// CSV columns: date, type, title, amount, account, category, from, to, rate,
/// due, loan, note. Unused columns stay empty per row. The whole file is one
/// batch: any bad row rolls everything back.
fn import_transactions(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let mut account_cache: HashMap<String, (i64, String)> = HashMap::new();
    let mut category_cache: HashMap<String, i64> = HashMap::new();
    let mut drafts = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let rec = result?;
        let ctx = || format!("CSV row {}", line + 2);
        let get = |i: usize| rec.get(i).unwrap_or("").trim().to_string();

        let datetime = parse_datetime(&get(0)).with_context(ctx)?;
        let tag = get(1);
        let title = get(2);
        let amount_major = parse_decimal(&get(3)).with_context(ctx)?;
        let note = Some(get(11)).filter(|s| !s.is_empty());

        let (ccy, kind) = match tag.as_str() {
            "expense" | "income" => {
                let (account_id, ccy) =
                    resolve_account(conn, &mut account_cache, &get(4)).with_context(ctx)?;
                let cat_name = get(5);
                let category_id = match category_cache.get(&cat_name) {
                    Some(id) => *id,
                    None => {
                        let id =
                            ledger::category_id_by_name(conn, &cat_name).with_context(ctx)?;
                        category_cache.insert(cat_name, id);
                        id
                    }
                };
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
                let (from_account_id, ccy) =
                    resolve_account(conn, &mut account_cache, &get(6)).with_context(ctx)?;
                let (to_account_id, _) =
                    resolve_account(conn, &mut account_cache, &get(7)).with_context(ctx)?;
                let exchange_rate = parse_decimal(&get(8)).with_context(ctx)?;
                (
                    ccy,
                    TransactionKind::Transfer {
                        from_account_id,
                        to_account_id,
                        exchange_rate,
                    },
                )
            }
            "lent" | "borrowed" => {
                let (account_id, ccy) =
                    resolve_account(conn, &mut account_cache, &get(4)).with_context(ctx)?;
                let due_raw = get(9);
                let due_date = if due_raw.is_empty() {
                    None
                } else {
                    Some(parse_date(&due_raw).with_context(ctx)?)
                };
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
            "paid_loan" | "collected_debt" => {
                let (account_id, ccy) =
                    resolve_account(conn, &mut account_cache, &get(4)).with_context(ctx)?;
                let loan_id: i64 = get(10).parse().with_context(ctx)?;
                let kind = if tag == "paid_loan" {
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
            other => bail!("{}: unknown transaction type '{}'", ctx(), other),
        };

        currency::lookup(&ccy)?;
        drafts.push(TransactionDraft {
            title,
            note,
            datetime,
            amount: Money::new(money::to_minor(amount_major, &ccy)?, ccy),
            kind,
        });
    }

    let ids = ledger::create_batch(conn, &drafts)?;
    println!("Imported {} transactions from {}", ids.len(), path);
    Ok(())
}

fn resolve_account(
    conn: &Connection,
    cache: &mut HashMap<String, (i64, String)>,
    name: &str,
) -> Result<(i64, String)> {
    if let Some(hit) = cache.get(name) {
        return Ok(hit.clone());
    }
    let id = ledger::account_id_by_name(conn, name)?;
    let ccy = ledger::load_account(conn, id)?.currency;
    cache.insert(name.to_string(), (id, ccy.clone()));
    Ok((id, ccy))
}
