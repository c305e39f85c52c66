// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::errors::Result;

const UA: &str = concat!(
    "pocketledger/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/pocketledger/pocketledger)"
);

/// One provider response: all quotes for a base currency as of a date.
#[derive(Debug, Clone, Deserialize)]
pub struct RateTable {
    #[serde(rename = "date")]
    pub as_of: NaiveDate,
    pub rates: HashMap<String, Decimal>,
}

/// The exchange-rate collaborator. Implemented over HTTP in production and
/// stubbed in tests.
pub trait RateSource {
    fn fetch(&self, base: &str) -> anyhow::Result<RateTable>;
}

pub struct FrankfurterSource {
    client: reqwest::blocking::Client,
}

impl FrankfurterSource {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent(UA)
            .build()?;
        Ok(FrankfurterSource { client })
    }
}

impl RateSource for FrankfurterSource {
    fn fetch(&self, base: &str) -> anyhow::Result<RateTable> {
        let url = format!("https://api.frankfurter.dev/latest?from={base}");
        let resp = self.client.get(url).send()?.error_for_status()?;
        Ok(resp.json::<RateTable>()?)
    }
}

/// Read side of the cache: absence of a rate is a normal outcome that callers
/// must treat as "skip this item", never as a failure.
pub trait RateLookup {
    fn rate(&self, from: &str, to: &str) -> Option<Decimal>;
}

/// Persisted best-effort cache over the `fx_rates` table. Rows survive
/// restarts, so yesterday's quotes serve until the first refresh of the day.
pub struct RateCache<'c> {
    conn: &'c Connection,
}

impl<'c> RateCache<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        RateCache { conn }
    }

    /// Direct lookup, falling back to the reciprocal of the inverse pair.
    pub fn get(&self, from: &str, to: &str) -> Result<Option<Decimal>> {
        if from == to {
            return Ok(Some(Decimal::ONE));
        }
        if let Some(rate) = self.stored(from, to)? {
            return Ok(Some(rate));
        }
        if let Some(inverse) = self.stored(to, from)? {
            if !inverse.is_zero() {
                return Ok(Some(Decimal::ONE / inverse));
            }
        }
        Ok(None)
    }

    /// Fetch fresh quotes for `base`, at most once per UTC calendar day.
    /// A failed fetch keeps the previous rows and is not an error.
    pub fn refresh_if_stale(&self, base: &str, source: &dyn RateSource) -> Result<()> {
        let today = Utc::now().date_naive().to_string();
        let attempted: Option<String> = self
            .conn
            .query_row(
                "SELECT attempted_on FROM fx_refresh_log WHERE base=?1",
                params![base],
                |r| r.get(0),
            )
            .optional()?;
        if attempted.as_deref() == Some(today.as_str()) {
            return Ok(());
        }
        self.conn.execute(
            "INSERT INTO fx_refresh_log(base, attempted_on) VALUES(?1, ?2)
             ON CONFLICT(base) DO UPDATE SET attempted_on=excluded.attempted_on",
            params![base, today],
        )?;
        if let Ok(table) = source.fetch(base) {
            self.store(base, &table)?;
        }
        Ok(())
    }

    pub fn store(&self, base: &str, table: &RateTable) -> Result<()> {
        for (quote, rate) in &table.rates {
            self.conn.execute(
                "INSERT INTO fx_rates(base, quote, rate, as_of) VALUES(?1, ?2, ?3, ?4)
                 ON CONFLICT(base, quote) DO UPDATE SET rate=excluded.rate, as_of=excluded.as_of",
                params![base, quote, rate.to_string(), table.as_of.to_string()],
            )?;
        }
        Ok(())
    }

    fn stored(&self, base: &str, quote: &str) -> Result<Option<Decimal>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT rate FROM fx_rates WHERE base=?1 AND quote=?2",
                params![base, quote],
                |r| r.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|s| s.parse::<Decimal>().ok()))
    }
}

impl RateLookup for RateCache<'_> {
    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        self.get(from, to).ok().flatten()
    }
}

/// In-memory lookup for tests and one-off conversions.
#[derive(Debug, Default)]
pub struct StaticRates {
    pairs: HashMap<(String, String), Decimal>,
}

impl StaticRates {
    pub fn new() -> Self {
        StaticRates::default()
    }

    pub fn insert(&mut self, from: &str, to: &str, rate: Decimal) {
        self.pairs.insert((from.to_string(), to.to_string()), rate);
    }
}

impl RateLookup for StaticRates {
    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.pairs
            .get(&(from.to_string(), to.to_string()))
            .copied()
    }
}
