pub mod client;
pub mod fetcher;
pub mod models;
pub mod polling;

// Re-exports for convenience
pub use client::{BlockchairClient, ChainProvider, ClientError};
pub use fetcher::{BatchFetcher, FetchError};
pub use polling::start_polling;
