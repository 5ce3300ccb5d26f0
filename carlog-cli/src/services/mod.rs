// Business logic services layer
//
// Reconciliation, bulk save and manual entry over a record store. Shared by
// every CLI command so import, save and add behave the same everywhere.

pub mod bulk;
pub mod concurrency;
pub mod entry;
pub mod reconcile;
pub mod store;
