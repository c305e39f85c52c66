// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use pocketledger::db;
use pocketledger::errors::LedgerError;
use pocketledger::ledger;
use pocketledger::models::{TransactionDraft, TransactionKind};
use pocketledger::money::Money;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn account(conn: &Connection, name: &str, ccy: &str, balance_minor: i64) -> i64 {
    conn.execute(
        "INSERT INTO accounts(name, currency, balance_minor) VALUES (?1, ?2, ?3)",
        params![name, ccy, balance_minor],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn category(conn: &Connection, name: &str, kind: Option<&str>) -> i64 {
    conn.execute(
        "INSERT INTO categories(name, kind) VALUES (?1, ?2)",
        params![name, kind],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn when() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 8, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn draft(title: &str, minor: i64, ccy: &str, kind: TransactionKind) -> TransactionDraft {
    TransactionDraft {
        title: title.into(),
        note: None,
        datetime: when(),
        amount: Money::new(minor, ccy),
        kind,
    }
}

fn balance(conn: &Connection, id: i64) -> i64 {
    ledger::account_balance(conn, id).unwrap().minor
}

#[test]
fn expense_update_delete_round_trip() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "USD", 1000);
    let cat = category(&conn, "Food", Some("expense"));

    let id = ledger::create_transaction(
        &mut conn,
        &draft(
            "groceries",
            300,
            "USD",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), 700);

    ledger::update_transaction(
        &mut conn,
        id,
        &draft(
            "groceries",
            500,
            "USD",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), 500);

    ledger::delete_transaction(&mut conn, id).unwrap();
    assert_eq!(balance(&conn, a), 1000);
}

#[test]
fn transfer_converts_to_destination_currency() {
    let mut conn = setup();
    let a = account(&conn, "US", "USD", 20000);
    let b = account(&conn, "EU", "EUR", 0);

    let id = ledger::create_transaction(
        &mut conn,
        &draft(
            "move",
            10000, // 100.00 USD
            "USD",
            TransactionKind::Transfer {
                from_account_id: a,
                to_account_id: b,
                exchange_rate: Decimal::new(9, 1), // 0.9
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), 10000);
    assert_eq!(balance(&conn, b), 9000); // 90.00 EUR

    // Exact reversal restores both sides bit-for-bit.
    ledger::delete_transaction(&mut conn, id).unwrap();
    assert_eq!(balance(&conn, a), 20000);
    assert_eq!(balance(&conn, b), 0);
}

#[test]
fn transfer_reversal_uses_stored_rate_not_fresh_quote() {
    let mut conn = setup();
    let a = account(&conn, "US", "USD", 10000);
    let b = account(&conn, "EU", "EUR", 0);

    let id = ledger::create_transaction(
        &mut conn,
        &draft(
            "move",
            10000,
            "USD",
            TransactionKind::Transfer {
                from_account_id: a,
                to_account_id: b,
                exchange_rate: Decimal::new(9, 1),
            },
        ),
    )
    .unwrap();

    // A newer cached rate for the pair must not influence the correction.
    conn.execute(
        "INSERT INTO fx_rates(base, quote, rate, as_of) VALUES('USD','EUR','0.95','2025-08-11')",
        [],
    )
    .unwrap();

    ledger::update_transaction(
        &mut conn,
        id,
        &draft(
            "move",
            5000,
            "USD",
            TransactionKind::Transfer {
                from_account_id: a,
                to_account_id: b,
                exchange_rate: Decimal::new(9, 1),
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), 5000);
    assert_eq!(balance(&conn, b), 4500);
}

#[test]
fn update_moves_effect_between_accounts() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 1000);
    let b = account(&conn, "B", "USD", 1000);
    let cat = category(&conn, "Misc", None);

    let id = ledger::create_transaction(
        &mut conn,
        &draft(
            "x",
            400,
            "USD",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), 600);

    ledger::update_transaction(
        &mut conn,
        id,
        &draft(
            "x",
            400,
            "USD",
            TransactionKind::Expense {
                account_id: b,
                category_id: cat,
            },
        ),
    )
    .unwrap();
    // No residue of the original payload on the first account.
    assert_eq!(balance(&conn, a), 1000);
    assert_eq!(balance(&conn, b), 600);
}

#[test]
fn final_balances_match_replayed_log() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);
    let b = account(&conn, "B", "USD", 0);
    let cat = category(&conn, "Misc", None);

    let e = ledger::create_transaction(
        &mut conn,
        &draft(
            "spend",
            250,
            "USD",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap();
    ledger::create_transaction(
        &mut conn,
        &draft(
            "salary",
            900,
            "USD",
            TransactionKind::Income {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap();
    ledger::create_transaction(
        &mut conn,
        &draft(
            "shift",
            100,
            "USD",
            TransactionKind::Transfer {
                from_account_id: a,
                to_account_id: b,
                exchange_rate: Decimal::ONE,
            },
        ),
    )
    .unwrap();
    ledger::update_transaction(
        &mut conn,
        e,
        &draft(
            "spend",
            350,
            "USD",
            TransactionKind::Expense {
                account_id: b,
                category_id: cat,
            },
        ),
    )
    .unwrap();

    for id in [a, b] {
        assert_eq!(balance(&conn, id), ledger::recompute_balance(&conn, id).unwrap());
    }
}

#[test]
fn currency_guard_blocks_mismatched_amount() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 1000);
    let cat = category(&conn, "Misc", None);

    let err = ledger::create_transaction(
        &mut conn,
        &draft(
            "bad",
            100,
            "EUR",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "amount", .. }));
    assert_eq!(balance(&conn, a), 1000);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn income_only_category_rejected_for_expense() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);
    let cat = category(&conn, "Salary", Some("income"));

    let err = ledger::create_transaction(
        &mut conn,
        &draft(
            "bad",
            100,
            "USD",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "category", .. }));
}

#[test]
fn self_transfer_rejected() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);
    let err = ledger::create_transaction(
        &mut conn,
        &draft(
            "loop",
            100,
            "USD",
            TransactionKind::Transfer {
                from_account_id: a,
                to_account_id: a,
                exchange_rate: Decimal::ONE,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "to_account", .. }));
}

#[test]
fn repayment_must_reference_counterpart_kind() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);

    let lent = ledger::create_transaction(
        &mut conn,
        &draft(
            "to a friend",
            500,
            "USD",
            TransactionKind::Lent {
                account_id: a,
                due_date: None,
            },
        ),
    )
    .unwrap();

    // paid_loan must point at a borrowed transaction, not a lent one.
    let err = ledger::create_transaction(
        &mut conn,
        &draft(
            "payback",
            100,
            "USD",
            TransactionKind::PaidLoan {
                account_id: a,
                loan_id: lent,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "loan", .. }));
    assert_eq!(balance(&conn, a), -500);

    // collected_debt against the same lent transaction is the valid pairing.
    ledger::create_transaction(
        &mut conn,
        &draft(
            "payback",
            100,
            "USD",
            TransactionKind::CollectedDebt {
                account_id: a,
                loan_id: lent,
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), -400);
}

#[test]
fn repayment_to_missing_loan_rejected() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);
    let err = ledger::create_transaction(
        &mut conn,
        &draft(
            "payback",
            100,
            "USD",
            TransactionKind::PaidLoan {
                account_id: a,
                loan_id: 999,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "loan", .. }));
}

#[test]
fn deleting_loan_reverses_and_removes_repayments() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);

    let borrowed = ledger::create_transaction(
        &mut conn,
        &draft(
            "bank loan",
            5000,
            "USD",
            TransactionKind::Borrowed {
                account_id: a,
                due_date: None,
            },
        ),
    )
    .unwrap();
    ledger::create_transaction(
        &mut conn,
        &draft(
            "instalment",
            2000,
            "USD",
            TransactionKind::PaidLoan {
                account_id: a,
                loan_id: borrowed,
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), 3000);

    ledger::delete_transaction(&mut conn, borrowed).unwrap();
    assert_eq!(balance(&conn, a), 0);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn retyping_loan_with_repayments_rejected() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);
    let borrowed = ledger::create_transaction(
        &mut conn,
        &draft(
            "loan",
            5000,
            "USD",
            TransactionKind::Borrowed {
                account_id: a,
                due_date: None,
            },
        ),
    )
    .unwrap();
    ledger::create_transaction(
        &mut conn,
        &draft(
            "instalment",
            1000,
            "USD",
            TransactionKind::PaidLoan {
                account_id: a,
                loan_id: borrowed,
            },
        ),
    )
    .unwrap();

    let err = ledger::update_transaction(
        &mut conn,
        borrowed,
        &draft(
            "loan",
            5000,
            "USD",
            TransactionKind::Lent {
                account_id: a,
                due_date: None,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "type", .. }));
}

#[test]
fn delete_is_idempotent_update_is_not() {
    let mut conn = setup();
    account(&conn, "A", "USD", 0);

    ledger::delete_transaction(&mut conn, 42).unwrap();

    let cat = category(&conn, "Misc", None);
    let err = ledger::update_transaction(
        &mut conn,
        42,
        &draft(
            "ghost",
            100,
            "USD",
            TransactionKind::Expense {
                account_id: 1,
                category_id: cat,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "transaction", .. }));
}

#[test]
fn create_rolls_back_fully_when_balance_write_fails() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 1000);
    let cat = category(&conn, "Misc", None);

    // Force the balance-update half of the atomic unit to fail after the
    // row insert has succeeded.
    conn.execute_batch(
        "CREATE TRIGGER boom BEFORE UPDATE ON accounts BEGIN
             SELECT RAISE(ABORT, 'disk on fire');
         END;",
    )
    .unwrap();

    let err = ledger::create_transaction(
        &mut conn,
        &draft(
            "doomed",
            300,
            "USD",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));

    conn.execute_batch("DROP TRIGGER boom;").unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(balance(&conn, a), 1000);
}

#[test]
fn batch_is_all_or_nothing() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 1000);
    let cat = category(&conn, "Misc", None);

    let good = draft(
        "ok",
        100,
        "USD",
        TransactionKind::Expense {
            account_id: a,
            category_id: cat,
        },
    );
    let bad = draft(
        "bad",
        100,
        "EUR",
        TransactionKind::Expense {
            account_id: a,
            category_id: cat,
        },
    );

    let err = ledger::create_batch(&mut conn, &[good.clone(), bad]).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { .. }));
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(balance(&conn, a), 1000);

    let ids = ledger::create_batch(&mut conn, &[good]).unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(balance(&conn, a), 900);
}

#[test]
fn batch_repayment_may_reference_loan_from_same_batch() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 0);

    let loan = draft(
        "loan",
        1000,
        "USD",
        TransactionKind::Borrowed {
            account_id: a,
            due_date: None,
        },
    );
    // create_batch assigns ids sequentially inside the unit; the first row of
    // a fresh table gets id 1.
    let repayment = draft(
        "instalment",
        400,
        "USD",
        TransactionKind::PaidLoan {
            account_id: a,
            loan_id: 1,
        },
    );
    ledger::create_batch(&mut conn, &[loan, repayment]).unwrap();
    assert_eq!(balance(&conn, a), 600);
}

#[test]
fn deleting_account_reverses_transfers_through_engine() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 10000);
    let b = account(&conn, "B", "EUR", 0);

    ledger::create_transaction(
        &mut conn,
        &draft(
            "move",
            10000,
            "USD",
            TransactionKind::Transfer {
                from_account_id: a,
                to_account_id: b,
                exchange_rate: Decimal::new(9, 1),
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, b), 9000);

    ledger::delete_account(&mut conn, a).unwrap();
    // The surviving account's side of the transfer is rolled back exactly.
    assert_eq!(balance(&conn, b), 0);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
    assert!(matches!(
        ledger::load_account(&conn, a),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn deleting_category_reverses_member_transactions() {
    let mut conn = setup();
    let a = account(&conn, "A", "USD", 1000);
    let cat = category(&conn, "Food", Some("expense"));
    ledger::create_transaction(
        &mut conn,
        &draft(
            "lunch",
            300,
            "USD",
            TransactionKind::Expense {
                account_id: a,
                category_id: cat,
            },
        ),
    )
    .unwrap();
    assert_eq!(balance(&conn, a), 700);

    ledger::delete_category(&mut conn, cat).unwrap();
    assert_eq!(balance(&conn, a), 1000);
}

#[test]
fn main_account_pointer_latest_wins() {
    let conn = setup();
    let a = account(&conn, "A", "USD", 0);
    let b = account(&conn, "B", "USD", 0);

    assert_eq!(ledger::main_account(&conn).unwrap(), None);
    ledger::set_main_account(&conn, a).unwrap();
    assert_eq!(ledger::main_account(&conn).unwrap(), Some(a));
    ledger::set_main_account(&conn, b).unwrap();
    assert_eq!(ledger::main_account(&conn).unwrap(), Some(b));

    // Even with two rows present the newest pointer is authoritative.
    conn.execute(
        "INSERT INTO main_account(account_id, updated_at) VALUES(?1, datetime('now', '+1 hour'))",
        params![a],
    )
    .unwrap();
    assert_eq!(ledger::main_account(&conn).unwrap(), Some(a));
}
