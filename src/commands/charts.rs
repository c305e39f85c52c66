// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::TransactionKind;
use crate::money::Money;
use crate::rates::RateCache;
use crate::utils::{maybe_print_json, pretty_table};
use crate::{aggregate, currency, ledger};

#[derive(Serialize)]
struct SliceRow {
    key: String,
    value: String,
    color: String,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("categories", sub)) => categories(conn, sub)?,
        Some(("loans", sub)) => loans(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Expense totals per category, converted into one display currency.
fn categories(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let target = currency::normalize(sub.get_one::<String>("currency").unwrap())?;
    let month = sub.get_one::<String>("month").cloned();

    let category_names: HashMap<i64, String> = {
        let mut stmt = conn.prepare("SELECT id, name FROM categories")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let transactions = ledger::list_transactions(conn)?;
    let rates = RateCache::new(conn);
    let slices = aggregate::build_chart_data(&transactions, &target, &rates, |rec| {
        if let Some(m) = &month {
            if rec.datetime.format("%Y-%m").to_string() != *m {
                return None;
            }
        }
        match &rec.kind {
            TransactionKind::Expense { category_id, .. } => Some(
                category_names
                    .get(category_id)
                    .cloned()
                    .unwrap_or_else(|| format!("category {}", category_id)),
            ),
            _ => None,
        }
    })?;
    print_slices(sub, &target, slices)
}

/// Outstanding money movement split into the lent and borrowed buckets.
fn loans(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let target = currency::normalize(sub.get_one::<String>("currency").unwrap())?;
    let transactions = ledger::list_transactions(conn)?;
    let rates = RateCache::new(conn);
    let slices = aggregate::build_chart_data(&transactions, &target, &rates, |rec| {
        match &rec.kind {
            TransactionKind::Lent { .. } => Some("lent".to_string()),
            TransactionKind::Borrowed { .. } => Some("borrowed".to_string()),
            _ => None,
        }
    })?;
    print_slices(sub, &target, slices)
}

fn print_slices(
    sub: &clap::ArgMatches,
    target: &str,
    slices: Vec<aggregate::ChartSlice>,
) -> Result<()> {
    let mut rows = Vec::new();
    for s in slices {
        rows.push(SliceRow {
            key: s.key,
            value: Money::new(s.value_minor, target).format()?,
            color: s.color,
        });
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        let data = rows
            .iter()
            .map(|r| vec![r.key.clone(), r.value.clone(), r.color.clone()])
            .collect();
        println!("{}", pretty_table(&["Key", "Total", "Color"], data));
    }
    Ok(())
}
