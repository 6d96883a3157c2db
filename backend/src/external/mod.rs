//! External API integrations

pub mod stock_ledger;

pub use stock_ledger::{InventoryPlacement, PlacementReceipt, StockLedgerClient};
