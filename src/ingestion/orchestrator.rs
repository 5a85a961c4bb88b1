//! Two-phase reconciliation of the program's history into the store.
//!
//! A run first re-processes signatures that were stored but never decoded
//! (gaps left by an earlier crash or a deferred batch), then discovers
//! signatures newer than anything stored, persists them, and decodes them.
//! Discovery is persisted before decoding so a crash at any point leaves
//! gaps that the next run picks up; every write is an idempotent upsert.

use metrics::{counter, histogram};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::batching::chunk;
use super::enricher::{enrich_batch, EventRecord};
use super::{RetryPolicy, SignaturePager, SyncError, TransactionFetcher};
use crate::db::EventStore;
use crate::models::SignatureRecord;
use crate::pricing::PriceSource;
use crate::solana::{Commitment, EventDecoder, LedgerRpc};

const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Signatures requested per discovery page.
    pub page_size: usize,
    /// Transactions fetched, priced and stored together.
    pub batch_size: NonZeroUsize,
    /// Pause between discovery pages (provider rate limit).
    pub page_delay: Duration,
    pub retry: RetryPolicy,
    pub commitment: Commitment,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            page_delay: DEFAULT_PAGE_DELAY,
            retry: RetryPolicy::default(),
            commitment: Commitment::Confirmed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncPhase {
    Idle,
    DiscoveringGaps,
    ProcessingGaps,
    DiscoveringNew,
    StoringNew,
    ProcessingNew,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Idle => "IDLE",
            SyncPhase::DiscoveringGaps => "DISCOVERING_GAPS",
            SyncPhase::ProcessingGaps => "PROCESSING_GAPS",
            SyncPhase::DiscoveringNew => "DISCOVERING_NEW",
            SyncPhase::StoringNew => "STORING_NEW",
            SyncPhase::ProcessingNew => "PROCESSING_NEW",
            SyncPhase::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Stored-but-undecoded signatures picked up at the start of the run.
    pub gaps_processed: usize,
    /// Signatures discovered on the ledger during this run.
    pub new_found: usize,
    pub total_processed: usize,
    pub events_stored: usize,
    pub decode_defects: usize,
    pub not_found: usize,
    /// Signatures left undecoded for the next run after a price failure.
    pub deferred: usize,
    pub halted: bool,
    /// High-water mark the gap scan started from.
    pub high_water_mark: i64,
}

/// Coordinates discovery, decoding, pricing and persistence. Holds its
/// collaborators explicitly so each can be swapped out.
pub struct SyncOrchestrator {
    rpc: Arc<dyn LedgerRpc>,
    decoder: Arc<dyn EventDecoder>,
    prices: Arc<dyn PriceSource>,
    store: Arc<dyn EventStore>,
    config: SyncConfig,
    running: AtomicBool,
}

/// Clears the running flag when a run ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncOrchestrator {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        decoder: Arc<dyn EventDecoder>,
        prices: Arc<dyn PriceSource>,
        store: Arc<dyn EventStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            rpc,
            decoder,
            prices,
            store,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Whether a run is in progress right now.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one full reconciliation. Fatal errors are returned to the caller
    /// untouched; everything already upserted stays valid.
    pub async fn run_sync(&self) -> Result<SyncSummary, SyncError> {
        self.running.store(true, Ordering::SeqCst);
        let _running = RunningGuard(&self.running);

        let start = Instant::now();
        counter!("sync_runs_total").increment(1);
        tracing::info!("Starting sync...");

        let mut phase = SyncPhase::Idle;
        let result = self.run_phases(&mut phase).await;
        histogram!("sync_duration_seconds").record(start.elapsed().as_secs_f64());

        match result {
            Ok(summary) => {
                tracing::info!(
                    gaps_processed = summary.gaps_processed,
                    new_found = summary.new_found,
                    total_processed = summary.total_processed,
                    events_stored = summary.events_stored,
                    decode_defects = summary.decode_defects,
                    deferred = summary.deferred,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Sync completed"
                );
                Ok(summary)
            }
            Err(e) => {
                counter!("sync_failures_total").increment(1);
                tracing::error!(phase = %phase, error = %e, "Sync failed");
                enter(&mut phase, SyncPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run_phases(&self, phase: &mut SyncPhase) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::default();

        // 1. Gaps: stored signatures newer than the high-water mark with no event row.
        enter(phase, SyncPhase::DiscoveringGaps);
        let high_water_mark = self.store.high_water_mark().await?;
        let mut gaps = self.store.identifiers_since(high_water_mark).await?;
        gaps.sort_by_key(|s| s.block_time);
        summary.high_water_mark = high_water_mark;
        summary.gaps_processed = gaps.len();
        tracing::info!(
            high_water_mark,
            gaps = gaps.len(),
            "Found unprocessed signatures"
        );

        // 2.
        enter(phase, SyncPhase::ProcessingGaps);
        self.process_signatures(&gaps, &mut summary).await?;

        // 3. New: everything on the ledger above the newest stored signature.
        enter(phase, SyncPhase::DiscoveringNew);
        let latest = self.store.latest_identifier().await?;
        let pager = SignaturePager::new(
            self.rpc.as_ref(),
            self.config.page_size,
            self.config.page_delay,
        );
        let new_signatures = pager.discover_since(latest.as_ref()).await?;
        summary.new_found = new_signatures.len();
        counter!("signatures_discovered_total").increment(new_signatures.len() as u64);
        tracing::info!(count = new_signatures.len(), "Found new signatures");

        // 4. Persist discovery before decoding anything.
        enter(phase, SyncPhase::StoringNew);
        for record in &new_signatures {
            self.store.upsert_identifier(record).await?;
        }
        if !new_signatures.is_empty() {
            tracing::info!(count = new_signatures.len(), "Stored new signatures");
        }

        // 5.
        enter(phase, SyncPhase::ProcessingNew);
        if summary.halted {
            summary.deferred += new_signatures.len();
            tracing::warn!(
                count = new_signatures.len(),
                "Decoding halted earlier in this run, new signatures left for the next run"
            );
        } else {
            self.process_signatures(&new_signatures, &mut summary).await?;
        }

        summary.total_processed = summary.gaps_processed + summary.new_found;
        enter(phase, SyncPhase::Idle);
        Ok(summary)
    }

    /// Fetch, decode, price and store `records` one batch at a time. Each
    /// batch is fully stored before the next fetch starts.
    ///
    /// A price failure stops decoding for the rest of the run: storing later
    /// batches would move the high-water mark past the unpriced one.
    async fn process_signatures(
        &self,
        records: &[SignatureRecord],
        summary: &mut SyncSummary,
    ) -> Result<(), SyncError> {
        if records.is_empty() || summary.halted {
            return Ok(());
        }

        let signatures: Vec<String> = records.iter().map(|r| r.signature.clone()).collect();
        let batches = chunk(&signatures, self.config.batch_size);
        let fetcher = TransactionFetcher::new(
            self.rpc.as_ref(),
            self.decoder.as_ref(),
            self.config.retry,
            self.config.commitment,
        );

        for (index, batch) in batches.iter().enumerate() {
            let decoded = fetcher.fetch_and_decode(batch).await?;
            summary.decode_defects += decoded.defects;
            summary.not_found += decoded.not_found;

            let event_records = match enrich_batch(self.prices.as_ref(), &decoded.events).await {
                Ok(r) => r,
                Err(e) => {
                    let error = SyncError::from(e);
                    let deferred: usize = batches[index..].iter().map(Vec::len).sum();
                    counter!("price_failures_total").increment(1);
                    tracing::warn!(
                        error = %error,
                        batch = index + 1,
                        batches = batches.len(),
                        deferred,
                        "Batch not stored, deferring remaining signatures to the next run"
                    );
                    summary.deferred += deferred;
                    summary.halted = true;
                    return Ok(());
                }
            };

            if !event_records.is_empty() {
                tracing::info!(
                    count = event_records.len(),
                    batch = index + 1,
                    batches = batches.len(),
                    "Storing events"
                );
            }

            for record in &event_records {
                match record {
                    EventRecord::SettledGame(game) => self.store.upsert_settled_game(game).await?,
                    EventRecord::PoolChange(change) => {
                        self.store.upsert_pool_change(change).await?
                    }
                }
            }

            summary.events_stored += event_records.len();
            counter!("events_stored_total").increment(event_records.len() as u64);
        }

        Ok(())
    }
}

fn enter(phase: &mut SyncPhase, next: SyncPhase) {
    tracing::info!(from = %phase, to = %next, "Sync phase");
    *phase = next;
}
