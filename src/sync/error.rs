use crate::blockchain::client::ClientError;
use crate::db::StoreError;
use std::fmt;
use thiserror::Error;

/// Where in a reconcile pass a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Load,
    Snapshot,
    Fetch,
    Write,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Load => "load",
            Self::Snapshot => "snapshot",
            Self::Fetch => "fetch",
            Self::Write => "write",
        };
        f.write_str(stage)
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Rate limit exceeded for {address} during {stage}")]
    RateLimitExceeded { address: String, stage: SyncStage },

    #[error("Upstream error for {address} during {stage}: {source}")]
    Upstream {
        address: String,
        stage: SyncStage,
        #[source]
        source: ClientError,
    },

    #[error("Malformed upstream data for {address} during {stage}: {reason}")]
    MalformedData {
        address: String,
        stage: SyncStage,
        reason: String,
    },

    #[error("Store error for {address} during {stage}: {source}")]
    Store {
        address: String,
        stage: SyncStage,
        #[source]
        source: StoreError,
    },

    #[error("Stored cursor {cursor} for {address} is not in the upstream page")]
    GapDetected { address: String, cursor: String },

    #[error("Sync for {address} cancelled")]
    Cancelled { address: String },
}

impl SyncError {
    /// Classify a provider failure seen at `stage`.
    pub(crate) fn from_client(address: &str, stage: SyncStage, source: ClientError) -> Self {
        let address = address.to_string();
        match source {
            ClientError::Throttled(_) => Self::RateLimitExceeded { address, stage },
            ClientError::Malformed(reason) => Self::MalformedData {
                address,
                stage,
                reason,
            },
            source => Self::Upstream {
                address,
                stage,
                source,
            },
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Self::RateLimitExceeded { address, .. }
            | Self::Upstream { address, .. }
            | Self::MalformedData { address, .. }
            | Self::Store { address, .. }
            | Self::GapDetected { address, .. }
            | Self::Cancelled { address } => address,
        }
    }

    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            Self::RateLimitExceeded { stage, .. }
            | Self::Upstream { stage, .. }
            | Self::MalformedData { stage, .. }
            | Self::Store { stage, .. } => Some(*stage),
            Self::GapDetected { .. } | Self::Cancelled { .. } => None,
        }
    }
}
