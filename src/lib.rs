//! Purpose: Shared library crate used by the `fundpool` CLI and tests.
//! Exports: `api` (public surface), `core` (ledger, value types, errors), `store`, `journal`.
//! Role: Custodial fund-pooling ledger with a persistent, lock-serialized store.
//! Invariants: `total_active` always equals the sum of active pool balances.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod journal;
pub mod ledger_paths;
pub mod store;
