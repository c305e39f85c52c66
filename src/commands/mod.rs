// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod charts;
pub mod fx;
pub mod importer;
pub mod loans;
pub mod transactions;
