// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::models::{Budget, BudgetPeriod};
use crate::money::{self, Money};
use crate::rates::RateCache;
use crate::utils::{maybe_print_json, parse_decimal, pretty_table};
use crate::{aggregate, currency, ledger};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        Some(("report", sub)) => report(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn split_names(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let ccy = currency::normalize(sub.get_one::<String>("currency").unwrap())?;
    let amount_minor = money::to_minor(parse_decimal(sub.get_one::<String>("amount").unwrap())?, &ccy)?;
    let period = sub.get_one::<String>("period").unwrap();
    let color = sub.get_one::<String>("color").unwrap();

    let account_names = split_names(sub.get_one::<String>("accounts").unwrap());
    let category_names = split_names(sub.get_one::<String>("categories").unwrap());
    if account_names.is_empty() {
        bail!("A budget needs at least one account");
    }
    if category_names.is_empty() {
        bail!("A budget needs at least one category");
    }
    let mut account_ids = Vec::new();
    for n in &account_names {
        account_ids.push(ledger::account_id_by_name(conn, n)?);
    }
    let mut category_ids = Vec::new();
    for n in &category_names {
        category_ids.push(ledger::category_id_by_name(conn, n)?);
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO budgets(name, amount_minor, currency, period, color)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, amount_minor, ccy, period, color],
    )?;
    let budget_id = tx.last_insert_rowid();
    for id in &account_ids {
        tx.execute(
            "INSERT INTO budget_accounts(budget_id, account_id) VALUES (?1, ?2)",
            params![budget_id, id],
        )?;
    }
    for id in &category_ids {
        tx.execute(
            "INSERT INTO budget_categories(budget_id, category_id) VALUES (?1, ?2)",
            params![budget_id, id],
        )?;
    }
    tx.commit()?;
    println!(
        "Budget '{}' set: {} per {}",
        name,
        Money::new(amount_minor, ccy).format()?,
        period
    );
    Ok(())
}

pub fn load_budgets(conn: &Connection, name: Option<&str>) -> Result<Vec<Budget>> {
    let mut sql = String::from(
        "SELECT id, name, amount_minor, currency, period, color FROM budgets",
    );
    if name.is_some() {
        sql.push_str(" WHERE name=?1");
    }
    sql.push_str(" ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let map = |r: &rusqlite::Row<'_>| -> rusqlite::Result<(i64, String, i64, String, String, String)> {
        Ok((
            r.get(0)?,
            r.get(1)?,
            r.get(2)?,
            r.get(3)?,
            r.get(4)?,
            r.get(5)?,
        ))
    };
    let rows: Vec<_> = if let Some(n) = name {
        stmt.query_map(params![n], map)?.collect::<rusqlite::Result<_>>()?
    } else {
        stmt.query_map([], map)?.collect::<rusqlite::Result<_>>()?
    };

    let mut out = Vec::new();
    for (id, name, amount_minor, ccy, period_tag, color) in rows {
        let Some(period) = BudgetPeriod::from_tag(&period_tag) else {
            bail!("Budget '{}' has unknown period '{}'", name, period_tag);
        };
        let mut astmt =
            conn.prepare("SELECT account_id FROM budget_accounts WHERE budget_id=?1")?;
        let accounts = astmt
            .query_map(params![id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        let mut cstmt =
            conn.prepare("SELECT category_id FROM budget_categories WHERE budget_id=?1")?;
        let categories = cstmt
            .query_map(params![id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        out.push(Budget {
            id,
            name,
            amount_minor,
            currency: ccy,
            period,
            color,
            accounts,
            categories,
        });
    }
    Ok(out)
}

fn list(conn: &Connection) -> Result<()> {
    let mut data = Vec::new();
    for b in load_budgets(conn, None)? {
        data.push(vec![
            b.name.clone(),
            Money::new(b.amount_minor, b.currency.clone()).format()?,
            b.period.tag().to_string(),
            b.accounts.len().to_string(),
            b.categories.len().to_string(),
        ]);
    }
    println!(
        "{}",
        pretty_table(&["Name", "Limit", "Period", "Accounts", "Categories"], data)
    );
    Ok(())
}

#[derive(Serialize)]
struct BudgetReportRow {
    name: String,
    period: String,
    limit: String,
    spent: String,
    ratio: f64,
    overspent: bool,
}

fn report(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").map(String::as_str);
    let budgets = load_budgets(conn, name)?;
    if budgets.is_empty() {
        bail!("No matching budgets");
    }
    let transactions = ledger::list_transactions(conn)?;
    let rates = RateCache::new(conn);

    let mut rows = Vec::new();
    for b in &budgets {
        let spent = aggregate::amount_spent(b, &transactions, &rates)?;
        let ratio = if b.amount_minor > 0 {
            spent.minor as f64 / b.amount_minor as f64
        } else {
            0.0
        };
        rows.push(BudgetReportRow {
            name: b.name.clone(),
            period: b.period.tag().to_string(),
            limit: Money::new(b.amount_minor, b.currency.clone()).format()?,
            spent: spent.format()?,
            ratio,
            overspent: ratio >= 1.0,
        });
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        let data = rows
            .iter()
            .map(|r| {
                vec![
                    r.name.clone(),
                    r.period.clone(),
                    r.limit.clone(),
                    r.spent.clone(),
                    format!("{:.0}%", r.ratio * 100.0),
                    if r.overspent { "OVERSPENT".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Budget", "Period", "Limit", "Spent", "Used", ""], data)
        );
    }
    Ok(())
}
