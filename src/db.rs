// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("org.pocketledger", "Pocketledger", "pocketledger"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("pocketledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// Create tables if absent. Public so tests can run the same schema against
/// an in-memory connection.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        color TEXT NOT NULL DEFAULT '#4477aa',
        currency TEXT NOT NULL,
        balance_minor INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Single-pointer table for the app's primary account. Readers take the
    -- newest row if more than one ever sneaks in.
    CREATE TABLE IF NOT EXISTS main_account(
        account_id INTEGER NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        color TEXT NOT NULL DEFAULT '#44aa77',
        icon_type TEXT NOT NULL DEFAULT 'emoji',
        icon_value TEXT NOT NULL DEFAULT '🏷️',
        kind TEXT CHECK(kind IN ('expense','income'))
    );

    -- Tagged-union rows: 'type' selects which of the nullable columns apply.
    -- Decimal-valued columns are stored as TEXT.
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL CHECK(type IN
            ('expense','income','transfer','lent','borrowed','paid_loan','collected_debt')),
        title TEXT NOT NULL,
        note TEXT,
        datetime TEXT NOT NULL,
        amount_minor INTEGER NOT NULL,
        currency TEXT NOT NULL,
        account_id INTEGER,
        category_id INTEGER,
        from_account_id INTEGER,
        to_account_id INTEGER,
        exchange_rate TEXT,
        due_date TEXT,
        loan_id INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(account_id) REFERENCES accounts(id),
        FOREIGN KEY(category_id) REFERENCES categories(id),
        FOREIGN KEY(from_account_id) REFERENCES accounts(id),
        FOREIGN KEY(to_account_id) REFERENCES accounts(id),
        FOREIGN KEY(loan_id) REFERENCES transactions(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_datetime ON transactions(datetime);
    CREATE INDEX IF NOT EXISTS idx_transactions_loan ON transactions(loan_id);

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        amount_minor INTEGER NOT NULL,
        currency TEXT NOT NULL,
        period TEXT NOT NULL CHECK(period IN ('weekly','monthly','yearly')),
        color TEXT NOT NULL DEFAULT '#aa7744'
    );
    CREATE TABLE IF NOT EXISTS budget_accounts(
        budget_id INTEGER NOT NULL,
        account_id INTEGER NOT NULL,
        UNIQUE(budget_id, account_id),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE,
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE CASCADE
    );
    CREATE TABLE IF NOT EXISTS budget_categories(
        budget_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        UNIQUE(budget_id, category_id),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE CASCADE
    );

    -- One row per (base, quote); 'as_of' is the provider's quote date.
    CREATE TABLE IF NOT EXISTS fx_rates(
        base TEXT NOT NULL,
        quote TEXT NOT NULL,
        rate TEXT NOT NULL,
        as_of TEXT NOT NULL,
        UNIQUE(base, quote)
    );
    -- Refresh throttle: at most one fetch attempt per base per UTC day,
    -- successful or not.
    CREATE TABLE IF NOT EXISTS fx_refresh_log(
        base TEXT PRIMARY KEY,
        attempted_on TEXT NOT NULL
    );
    "#,
    )?;
    Ok(())
}
