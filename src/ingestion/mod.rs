pub mod batching;
pub mod enricher;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod pager;

pub use error::SyncError;
pub use fetcher::{DecodedBatch, RetryPolicy, TransactionFetcher};
pub use orchestrator::{SyncConfig, SyncOrchestrator, SyncPhase, SyncSummary};
pub use pager::SignaturePager;
