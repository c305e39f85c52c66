// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::cell::Cell;
use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use pocketledger::db;
use pocketledger::rates::{RateCache, RateLookup, RateSource, RateTable};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

struct CountingSource {
    calls: Cell<u32>,
    fail: bool,
}

impl CountingSource {
    fn new(fail: bool) -> Self {
        CountingSource {
            calls: Cell::new(0),
            fail,
        }
    }
}

impl RateSource for CountingSource {
    fn fetch(&self, _base: &str) -> anyhow::Result<RateTable> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            anyhow::bail!("provider unreachable");
        }
        let mut rates = HashMap::new();
        rates.insert("EUR".to_string(), Decimal::new(9, 1));
        rates.insert("JPY".to_string(), Decimal::new(147, 0));
        Ok(RateTable {
            as_of: Utc::now().date_naive(),
            rates,
        })
    }
}

#[test]
fn refresh_fetches_once_per_day_per_base() {
    let conn = setup();
    let cache = RateCache::new(&conn);
    let source = CountingSource::new(false);

    cache.refresh_if_stale("USD", &source).unwrap();
    cache.refresh_if_stale("USD", &source).unwrap();
    cache.refresh_if_stale("USD", &source).unwrap();
    assert_eq!(source.calls.get(), 1);

    // A different base gets its own attempt.
    cache.refresh_if_stale("EUR", &source).unwrap();
    assert_eq!(source.calls.get(), 2);

    assert_eq!(cache.get("USD", "EUR").unwrap(), Some(Decimal::new(9, 1)));
    assert_eq!(cache.get("USD", "JPY").unwrap(), Some(Decimal::new(147, 0)));
}

#[test]
fn failed_fetch_keeps_stale_rows_and_still_counts_as_attempt() {
    let conn = setup();
    conn.execute(
        "INSERT INTO fx_rates(base, quote, rate, as_of) VALUES('USD','EUR','0.85','2025-08-01')",
        [],
    )
    .unwrap();

    let cache = RateCache::new(&conn);
    let source = CountingSource::new(true);
    cache.refresh_if_stale("USD", &source).unwrap();
    assert_eq!(source.calls.get(), 1);
    // Yesterday's quote survives the failure.
    assert_eq!(cache.get("USD", "EUR").unwrap(), Some(Decimal::new(85, 2)));

    // The throttle also covers failed attempts.
    cache.refresh_if_stale("USD", &source).unwrap();
    assert_eq!(source.calls.get(), 1);
}

#[test]
fn reciprocal_fallback_when_only_inverse_pair_is_cached() {
    let conn = setup();
    conn.execute(
        "INSERT INTO fx_rates(base, quote, rate, as_of) VALUES('USD','EUR','0.8','2025-08-01')",
        [],
    )
    .unwrap();
    let cache = RateCache::new(&conn);
    assert_eq!(cache.get("EUR", "USD").unwrap(), Some(Decimal::new(125, 2)));
}

#[test]
fn identity_and_missing_pairs() {
    let conn = setup();
    let cache = RateCache::new(&conn);
    assert_eq!(cache.get("USD", "USD").unwrap(), Some(Decimal::ONE));
    assert_eq!(cache.get("USD", "GBP").unwrap(), None);
    // The lookup trait maps the same outcomes without errors.
    assert_eq!(cache.rate("USD", "GBP"), None);
    assert_eq!(cache.rate("USD", "USD"), Some(Decimal::ONE));
}

#[test]
fn store_upserts_existing_pair() {
    let conn = setup();
    let cache = RateCache::new(&conn);
    let mut rates = HashMap::new();
    rates.insert("EUR".to_string(), Decimal::new(9, 1));
    cache
        .store(
            "USD",
            &RateTable {
                as_of: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                rates: rates.clone(),
            },
        )
        .unwrap();

    rates.insert("EUR".to_string(), Decimal::new(92, 2));
    cache
        .store(
            "USD",
            &RateTable {
                as_of: NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
                rates,
            },
        )
        .unwrap();

    assert_eq!(cache.get("USD", "EUR").unwrap(), Some(Decimal::new(92, 2)));
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM fx_rates", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
