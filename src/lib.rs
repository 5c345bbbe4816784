pub mod api;
pub mod blockchain;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod service;
pub mod state;
pub mod sync;
pub mod transfer;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use api::error::ApiError;
pub use api::response::ApiResponse;
pub use api::route::create_router;
pub use blockchain::{BatchFetcher, BlockchairClient, ChainProvider};
pub use db::{LedgerStore, SqliteLedger, StoreError};
pub use models::{AddressRecord, AddressState, Direction, TransactionRecord, WalletTransaction};
pub use service::{ServiceError, WalletService};
pub use sync::{GapPolicy, SyncEngine, SyncError, SyncOutcome};
pub use transfer::{detect_transfers, TransferParams};
pub use validation::{validate_bitcoin_address, ValidationError};
