// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod aggregate;
pub mod cli;
pub mod commands;
pub mod currency;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod money;
pub mod rates;
pub mod utils;
