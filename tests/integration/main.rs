//! Integration tests: the controller driven end to end against an
//! in-memory ledger.

mod controller_scenarios;
mod mock_ledger;
