// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::errors::{LedgerError, Result};

/// Static per-currency metadata. Minor-unit scale comes from here and is
/// never inferred from amounts.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub symbol: &'static str,
    pub minor_units: u32,
}

static CURRENCIES: &[CurrencyInfo] = &[
    CurrencyInfo { code: "USD", symbol: "$", minor_units: 2 },
    CurrencyInfo { code: "EUR", symbol: "€", minor_units: 2 },
    CurrencyInfo { code: "GBP", symbol: "£", minor_units: 2 },
    CurrencyInfo { code: "JPY", symbol: "¥", minor_units: 0 },
    CurrencyInfo { code: "CHF", symbol: "CHF ", minor_units: 2 },
    CurrencyInfo { code: "CAD", symbol: "CA$", minor_units: 2 },
    CurrencyInfo { code: "AUD", symbol: "A$", minor_units: 2 },
    CurrencyInfo { code: "NZD", symbol: "NZ$", minor_units: 2 },
    CurrencyInfo { code: "SEK", symbol: "kr ", minor_units: 2 },
    CurrencyInfo { code: "NOK", symbol: "kr ", minor_units: 2 },
    CurrencyInfo { code: "DKK", symbol: "kr ", minor_units: 2 },
    CurrencyInfo { code: "PLN", symbol: "zł ", minor_units: 2 },
    CurrencyInfo { code: "CZK", symbol: "Kč ", minor_units: 2 },
    CurrencyInfo { code: "HUF", symbol: "Ft ", minor_units: 2 },
    CurrencyInfo { code: "RON", symbol: "lei ", minor_units: 2 },
    CurrencyInfo { code: "BGN", symbol: "лв ", minor_units: 2 },
    CurrencyInfo { code: "TRY", symbol: "₺", minor_units: 2 },
    CurrencyInfo { code: "RUB", symbol: "₽", minor_units: 2 },
    CurrencyInfo { code: "UAH", symbol: "₴", minor_units: 2 },
    CurrencyInfo { code: "INR", symbol: "₹", minor_units: 2 },
    CurrencyInfo { code: "CNY", symbol: "CN¥", minor_units: 2 },
    CurrencyInfo { code: "HKD", symbol: "HK$", minor_units: 2 },
    CurrencyInfo { code: "TWD", symbol: "NT$", minor_units: 2 },
    CurrencyInfo { code: "KRW", symbol: "₩", minor_units: 0 },
    CurrencyInfo { code: "SGD", symbol: "S$", minor_units: 2 },
    CurrencyInfo { code: "MYR", symbol: "RM ", minor_units: 2 },
    CurrencyInfo { code: "THB", symbol: "฿", minor_units: 2 },
    CurrencyInfo { code: "IDR", symbol: "Rp ", minor_units: 2 },
    CurrencyInfo { code: "PHP", symbol: "₱", minor_units: 2 },
    CurrencyInfo { code: "VND", symbol: "₫", minor_units: 0 },
    CurrencyInfo { code: "ILS", symbol: "₪", minor_units: 2 },
    CurrencyInfo { code: "AED", symbol: "AED ", minor_units: 2 },
    CurrencyInfo { code: "SAR", symbol: "SAR ", minor_units: 2 },
    CurrencyInfo { code: "KWD", symbol: "KD ", minor_units: 3 },
    CurrencyInfo { code: "BHD", symbol: "BD ", minor_units: 3 },
    CurrencyInfo { code: "EGP", symbol: "E£", minor_units: 2 },
    CurrencyInfo { code: "ZAR", symbol: "R ", minor_units: 2 },
    CurrencyInfo { code: "NGN", symbol: "₦", minor_units: 2 },
    CurrencyInfo { code: "KES", symbol: "KSh ", minor_units: 2 },
    CurrencyInfo { code: "BRL", symbol: "R$", minor_units: 2 },
    CurrencyInfo { code: "MXN", symbol: "MX$", minor_units: 2 },
    CurrencyInfo { code: "ARS", symbol: "AR$", minor_units: 2 },
    CurrencyInfo { code: "CLP", symbol: "CLP ", minor_units: 0 },
    CurrencyInfo { code: "COP", symbol: "COL$", minor_units: 2 },
    CurrencyInfo { code: "PEN", symbol: "S/ ", minor_units: 2 },
    CurrencyInfo { code: "PKR", symbol: "Rs ", minor_units: 2 },
    CurrencyInfo { code: "BDT", symbol: "৳", minor_units: 2 },
    CurrencyInfo { code: "LKR", symbol: "Rs ", minor_units: 2 },
    CurrencyInfo { code: "ISK", symbol: "kr ", minor_units: 0 },
];

static BY_CODE: Lazy<HashMap<&'static str, &'static CurrencyInfo>> =
    Lazy::new(|| CURRENCIES.iter().map(|c| (c.code, c)).collect());

pub fn find(code: &str) -> Option<&'static CurrencyInfo> {
    BY_CODE.get(code).copied()
}

pub fn lookup(code: &str) -> Result<&'static CurrencyInfo> {
    find(code).ok_or_else(|| LedgerError::UnknownCurrency(code.to_string()))
}

/// Uppercase and verify a user-supplied currency code.
pub fn normalize(code: &str) -> Result<String> {
    let up = code.trim().to_uppercase();
    lookup(&up)?;
    Ok(up)
}
