// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::utils::{maybe_print_json, pretty_table};
use crate::{currency, ledger};

#[derive(Serialize)]
pub struct AccountRow {
    pub name: String,
    pub currency: String,
    pub balance: String,
    pub main: bool,
    pub created_at: String,
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let ccy = currency::normalize(sub.get_one::<String>("currency").unwrap())?;
            let color = sub.get_one::<String>("color").unwrap();
            conn.execute(
                "INSERT INTO accounts(name, color, currency) VALUES (?1, ?2, ?3)",
                params![name, color, ccy],
            )?;
            println!("Added account '{}' ({})", name, ccy);
        }
        Some(("list", sub)) => {
            let rows = list_rows(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                let data = rows
                    .iter()
                    .map(|r| {
                        vec![
                            r.name.clone(),
                            r.currency.clone(),
                            r.balance.clone(),
                            if r.main { "*".into() } else { String::new() },
                            r.created_at.clone(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Name", "Currency", "Balance", "Main", "Created"], data)
                );
            }
        }
        Some(("set-main", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = ledger::account_id_by_name(conn, name)?;
            ledger::set_main_account(conn, id)?;
            println!("Main account set to '{}'", name);
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = ledger::account_id_by_name(conn, name)?;
            ledger::delete_account(conn, id)?;
            println!("Removed account '{}' and its transactions", name);
        }
        _ => {}
    }
    Ok(())
}

fn list_rows(conn: &Connection) -> Result<Vec<AccountRow>> {
    let main_id = ledger::main_account(conn)?;
    let mut stmt = conn.prepare(
        "SELECT id, name, currency, balance_minor, created_at FROM accounts ORDER BY name",
    )?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let balance = ledger::account_balance(conn, id)?;
        out.push(AccountRow {
            name: r.get(1)?,
            currency: r.get(2)?,
            balance: balance.format()?,
            main: main_id == Some(id),
            created_at: r.get(4)?,
        });
    }
    Ok(out)
}
