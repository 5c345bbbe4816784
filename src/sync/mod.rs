pub mod engine;
pub mod error;

pub use engine::{new_transaction_ids, GapPolicy, SyncEngine, SyncOutcome};
pub use error::{SyncError, SyncStage};
