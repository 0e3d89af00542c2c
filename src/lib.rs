//! Momentum volume bot: alternating single-pool swaps on Sui.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod keys;
pub mod ledger;
pub mod pool;
pub mod engine;
