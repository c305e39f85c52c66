// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::money::{ExchangeRate, Money};
use crate::rates::{FrankfurterSource, RateCache};
use crate::utils::{parse_decimal, pretty_table};
use crate::{currency, money};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("fetch", sub)) => fetch(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        Some(("convert", sub)) => convert(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn account_currencies(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT currency FROM accounts ORDER BY currency")?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

fn fetch(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let bases = match sub.get_one::<String>("base") {
        Some(b) => vec![currency::normalize(b)?],
        None => account_currencies(conn)?,
    };
    if bases.is_empty() {
        println!("No account currencies to refresh; add an account first.");
        return Ok(());
    }
    let source = FrankfurterSource::new()?;
    let cache = RateCache::new(conn);
    for base in &bases {
        // At most one attempt per base per UTC day; failures keep stale rows.
        cache.refresh_if_stale(base, &source)?;
    }
    println!("Refreshed rates for {}.", bases.join(", "));
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT base, quote, rate, as_of FROM fx_rates ORDER BY base, quote")?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (b, q, rate, as_of) = row?;
        data.push(vec![b, q, rate, as_of]);
    }
    println!("{}", pretty_table(&["Base", "Quote", "Rate", "As of"], data));
    Ok(())
}

fn convert(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let from = currency::normalize(sub.get_one::<String>("from").unwrap())?;
    let to = currency::normalize(sub.get_one::<String>("to").unwrap())?;
    let major = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let amount = Money::new(money::to_minor(major, &from)?, from.clone());
    let Some(rate) = RateCache::new(conn).get(&from, &to)? else {
        bail!("No cached rate for {}->{}; run 'fx fetch' first", from, to);
    };
    let result = amount.convert(&ExchangeRate {
        from,
        to: to.clone(),
        rate,
    })?;
    println!("{} -> {}", amount.format()?, result.format()?);
    Ok(())
}
