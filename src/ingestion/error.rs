use thiserror::Error;

use crate::db::StoreError;
use crate::pricing::PriceError;
use crate::solana::RpcError;

/// Failures that end a batch or a whole sync run.
///
/// Per-transaction decode failures never show up here: the fetcher skips
/// and counts them.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(#[from] RpcError),

    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: RpcError,
    },

    #[error("price unresolvable: {0}")]
    PriceUnresolvable(#[from] PriceError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
