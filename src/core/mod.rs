// Core modules implementing the pool ledger, its value types, and error modeling.
pub mod address;
pub mod amount;
pub mod error;
pub mod format;
pub mod ledger;
pub mod pool;
pub mod settlement;
pub mod validate;
