// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Typed failures surfaced by the ledger core. CLI handlers map these onto
/// `anyhow` at the boundary; nothing in the core panics on them.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed on '{field}': {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("unknown currency code '{0}'")]
    UnknownCurrency(String),

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("no exchange rate available for {from}->{to}")]
    MissingExchangeRate { from: String, to: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
