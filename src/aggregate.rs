// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-side aggregation over committed transactions. These functions never
//! mutate the ledger; an unavailable exchange rate drops the item from the
//! sum instead of failing the whole report.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::errors::Result;
use crate::models::{Budget, BudgetPeriod, TransactionKind, TransactionRecord};
use crate::money::{ExchangeRate, Money};
use crate::rates::RateLookup;

/// `[start, end)` of the period instance containing `today`. Weeks start on
/// Sunday; months and years are calendar-aligned.
pub fn period_window(period: BudgetPeriod, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        BudgetPeriod::Weekly => {
            let back = today.weekday().num_days_from_sunday() as i64;
            let start = today - Duration::days(back);
            (start, start + Duration::days(7))
        }
        BudgetPeriod::Monthly => {
            let start = today.with_day(1).unwrap_or(today);
            let end = if today.month() == 12 {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
            };
            (start, end.unwrap_or(start))
        }
        BudgetPeriod::Yearly => {
            let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            let end = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(start);
            (start, end)
        }
    }
}

/// Convert into `target`, or `None` when no rate is cached for the pair.
fn converted(amount: &Money, target: &str, rates: &dyn RateLookup) -> Result<Option<Money>> {
    if amount.currency == target {
        return Ok(Some(amount.clone()));
    }
    match rates.rate(&amount.currency, target) {
        Some(rate) => {
            let quote = ExchangeRate {
                from: amount.currency.clone(),
                to: target.to_string(),
                rate,
            };
            amount.convert(&quote).map(Some)
        }
        None => Ok(None),
    }
}

/// Spend against a budget's current period instance: expenses on the budget's
/// accounts and categories, converted to the budget currency. Unconvertible
/// items are skipped, so the total can under-report when rates are missing;
/// that lossy policy is deliberate. Callers derive the overspend ratio from
/// the returned total.
pub fn amount_spent_at(
    budget: &Budget,
    candidates: &[TransactionRecord],
    rates: &dyn RateLookup,
    now: NaiveDateTime,
) -> Result<Money> {
    let (start, end) = period_window(budget.period, now.date());
    let mut total = Money::zero(&budget.currency);
    for rec in candidates {
        let TransactionKind::Expense {
            account_id,
            category_id,
        } = &rec.kind
        else {
            continue;
        };
        if !budget.accounts.contains(account_id) || !budget.categories.contains(category_id) {
            continue;
        }
        let date = rec.datetime.date();
        if date < start || date >= end {
            continue;
        }
        if let Some(part) = converted(&rec.amount, &budget.currency, rates)? {
            total = total.add(&part)?;
        }
    }
    Ok(total)
}

/// Budgets always report the period containing the wall clock "now".
pub fn amount_spent(
    budget: &Budget,
    candidates: &[TransactionRecord],
    rates: &dyn RateLookup,
) -> Result<Money> {
    amount_spent_at(budget, candidates, rates, Utc::now().naive_utc())
}

/// Sum of repayments linked to a loan, in the loan's currency, with the same
/// skip-on-missing-rate policy. Ratio >= 1 against the loan amount means
/// fully repaid (or overpaid).
pub fn amount_paid(
    loan: &TransactionRecord,
    repayments: &[TransactionRecord],
    rates: &dyn RateLookup,
) -> Result<Money> {
    let mut total = Money::zero(&loan.amount.currency);
    for rec in repayments {
        if rec.kind.loan_id() != Some(loan.id) {
            continue;
        }
        if let Some(part) = converted(&rec.amount, &loan.amount.currency, rates)? {
            total = total.add(&part)?;
        }
    }
    Ok(total)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSlice {
    pub key: String,
    pub value_minor: i64,
    pub color: String,
}

/// Bucket transactions by an arbitrary classifier and sum in `target`
/// currency. Colors are assigned by bucket position in this result set, so
/// the same key can land on a different color across calls with different
/// inputs; kept as-is pending a stable-color decision.
pub fn build_chart_data<F>(
    transactions: &[TransactionRecord],
    target_currency: &str,
    rates: &dyn RateLookup,
    key_fn: F,
) -> Result<Vec<ChartSlice>>
where
    F: Fn(&TransactionRecord) -> Option<String>,
{
    let mut buckets: Vec<(String, i64)> = Vec::new();
    for rec in transactions {
        let Some(key) = key_fn(rec) else {
            continue;
        };
        let Some(part) = converted(&rec.amount, target_currency, rates)? else {
            continue;
        };
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, total)) => *total += part.minor,
            None => buckets.push((key, part.minor)),
        }
    }
    let colors = palette(buckets.len());
    Ok(buckets
        .into_iter()
        .zip(colors)
        .map(|((key, value_minor), color)| ChartSlice {
            key,
            value_minor,
            color,
        })
        .collect())
}

/// `n` visually distinct hex colors, hues spread evenly around the wheel.
pub fn palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let hue = (i as f64) * 360.0 / (n.max(1) as f64);
            hsl_to_hex(hue, 0.62, 0.52)
        })
        .collect()
}

fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        to_byte(r1),
        to_byte(g1),
        to_byte(b1)
    )
}
