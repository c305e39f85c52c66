// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, params};

use crate::ledger;
use crate::utils::pretty_table;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let kind = sub.get_one::<String>("kind");
            let color = sub.get_one::<String>("color").unwrap();
            let icon = sub.get_one::<String>("icon").unwrap();
            conn.execute(
                "INSERT INTO categories(name, color, icon_type, icon_value, kind)
                 VALUES (?1, ?2, 'emoji', ?3, ?4)",
                params![name, color, icon, kind],
            )?;
            println!("Added category '{}'", name);
        }
        Some(("list", _)) => {
            let mut stmt = conn
                .prepare("SELECT name, icon_value, kind, color FROM categories ORDER BY name")?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, i, k, c) = row?;
                data.push(vec![n, i, k.unwrap_or_else(|| "both".into()), c]);
            }
            println!("{}", pretty_table(&["Name", "Icon", "Kind", "Color"], data));
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = ledger::category_id_by_name(conn, name)?;
            ledger::delete_category(conn, id)?;
            println!("Removed category '{}' and its transactions", name);
        }
        _ => {}
    }
    Ok(())
}
