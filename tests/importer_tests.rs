// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;

use rusqlite::{Connection, params};
use tempfile::NamedTempFile;

use pocketledger::commands::importer;
use pocketledger::{cli, db};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO accounts(name, currency, balance_minor) VALUES('Checking','USD',100000)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO accounts(name, currency, balance_minor) VALUES('Savings','EUR',0)",
        [],
    )
    .unwrap();
    conn.execute("INSERT INTO categories(name, kind) VALUES('Food','expense')", [])
        .unwrap();
    conn.execute("INSERT INTO categories(name, kind) VALUES('Salary','income')", [])
        .unwrap();
    conn
}

fn run_import(conn: &mut Connection, csv: &str) -> anyhow::Result<()> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{csv}").unwrap();
    let path = file.path().to_str().unwrap().to_string();
    let matches = cli::build_cli().get_matches_from([
        "pocketledger",
        "import",
        "transactions",
        "--path",
        &path,
    ]);
    let Some(("import", sub)) = matches.subcommand() else {
        panic!("import subcommand not parsed");
    };
    importer::handle(conn, sub)
}

fn balance(conn: &Connection, name: &str) -> i64 {
    conn.query_row(
        "SELECT balance_minor FROM accounts WHERE name=?1",
        params![name],
        |r| r.get(0),
    )
    .unwrap()
}

fn tx_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn imports_mixed_rows_and_applies_balances() {
    let mut conn = setup();
    let csv = "\
date,type,title,amount,account,category,from,to,rate,due,loan,note
2025-08-01,income,salary,1000.00,Checking,Salary,,,,,,august pay
2025-08-02,expense,groceries,42.50,Checking,Food,,,,,,
2025-08-03 09:30,transfer,stash,100.00,,,Checking,Savings,0.9,,,
2025-08-04,borrowed,bank loan,250.00,Checking,,,,,2026-01-01,,
";
    run_import(&mut conn, csv).unwrap();

    assert_eq!(tx_count(&conn), 4);
    // 1000.00 + 1000 - 42.50 - 100 + 250
    assert_eq!(balance(&conn, "Checking"), 210750);
    assert_eq!(balance(&conn, "Savings"), 9000);

    let note: Option<String> = conn
        .query_row(
            "SELECT note FROM transactions WHERE title='salary'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(note.as_deref(), Some("august pay"));
}

#[test]
fn repayment_may_reference_loan_from_same_file() {
    let mut conn = setup();
    let csv = "\
date,type,title,amount,account,category,from,to,rate,due,loan,note
2025-08-01,borrowed,bank loan,500.00,Checking,,,,,,,
2025-08-15,paid_loan,instalment,200.00,Checking,,,,,,1,
";
    run_import(&mut conn, csv).unwrap();
    assert_eq!(tx_count(&conn), 2);
    assert_eq!(balance(&conn, "Checking"), 130000);
}

#[test]
fn bad_row_rolls_back_the_whole_file() {
    let mut conn = setup();
    let csv = "\
date,type,title,amount,account,category,from,to,rate,due,loan,note
2025-08-01,expense,fine,10.00,Checking,Food,,,,,,
2025-08-02,expense,broken,10.00,NoSuchAccount,Food,,,,,,
";
    let err = run_import(&mut conn, csv).unwrap_err();
    assert!(err.to_string().contains("CSV row 3"), "got: {err:#}");
    assert_eq!(tx_count(&conn), 0);
    assert_eq!(balance(&conn, "Checking"), 100000);
}

#[test]
fn unknown_type_names_the_row() {
    let mut conn = setup();
    let csv = "\
date,type,title,amount,account,category,from,to,rate,due,loan,note
2025-08-01,refund,whoops,10.00,Checking,Food,,,,,,
";
    let err = run_import(&mut conn, csv).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("CSV row 2") && msg.contains("refund"), "got: {msg}");
    assert_eq!(tx_count(&conn), 0);
}

#[test]
fn validation_failures_surface_after_parsing() {
    // Parses fine, but the ledger rejects the dangling loan reference.
    let mut conn = setup();
    let csv = "\
date,type,title,amount,account,category,from,to,rate,due,loan,note
2025-08-01,collected_debt,ghost,10.00,Checking,,,,,,999,
";
    let err = run_import(&mut conn, csv).unwrap_err();
    assert!(format!("{err:#}").contains("loan"), "got: {err:#}");
    assert_eq!(tx_count(&conn), 0);
}
