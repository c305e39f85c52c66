// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::models::TransactionKind;
use crate::rates::RateCache;
use crate::utils::pretty_table;
use crate::{aggregate, ledger};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", _)) => list(conn)?,
        Some(("progress", sub)) => progress(conn, *sub.get_one::<i64>("id").unwrap())?,
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let rates = RateCache::new(conn);
    let mut data = Vec::new();
    for rec in ledger::list_transactions(conn)? {
        let due = match &rec.kind {
            TransactionKind::Lent { due_date, .. } | TransactionKind::Borrowed { due_date, .. } => {
                due_date.map(|d| d.to_string()).unwrap_or_default()
            }
            TransactionKind::Expense { .. }
            | TransactionKind::Income { .. }
            | TransactionKind::Transfer { .. }
            | TransactionKind::PaidLoan { .. }
            | TransactionKind::CollectedDebt { .. } => continue,
        };
        let repayments = ledger::loan_children(conn, rec.id)?;
        let paid = aggregate::amount_paid(&rec, &repayments, &rates)?;
        let ratio = if rec.amount.minor > 0 {
            paid.minor as f64 / rec.amount.minor as f64
        } else {
            0.0
        };
        data.push(vec![
            rec.id.to_string(),
            rec.kind.tag().to_string(),
            rec.title.clone(),
            rec.amount.format()?,
            paid.format()?,
            format!("{:.0}%", ratio * 100.0),
            due,
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Id", "Type", "Title", "Amount", "Repaid", "Progress", "Due"],
            data
        )
    );
    Ok(())
}

fn progress(conn: &Connection, id: i64) -> Result<()> {
    let Some(loan) = ledger::get_transaction(conn, id)? else {
        bail!("Loan transaction {} not found", id);
    };
    if !loan.kind.is_loan() {
        bail!("Transaction {} is '{}', not a loan", id, loan.kind.tag());
    }
    let repayments = ledger::loan_children(conn, id)?;
    let rates = RateCache::new(conn);
    let paid = aggregate::amount_paid(&loan, &repayments, &rates)?;
    let ratio = if loan.amount.minor > 0 {
        paid.minor as f64 / loan.amount.minor as f64
    } else {
        0.0
    };
    println!(
        "'{}': {} of {} repaid ({:.0}%){}",
        loan.title,
        paid.format()?,
        loan.amount.format()?,
        ratio * 100.0,
        if ratio >= 1.0 { ", settled" } else { "" }
    );
    for r in &repayments {
        println!(
            "  #{} {} {} {}",
            r.id,
            r.datetime.format("%Y-%m-%d"),
            r.kind.tag(),
            r.amount.format()?
        );
    }
    Ok(())
}
