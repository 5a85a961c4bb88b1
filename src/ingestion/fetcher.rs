use metrics::counter;
use std::time::Duration;
use tokio::time::sleep;

use super::SyncError;
use crate::models::DomainEvent;
use crate::solana::{Commitment, EventDecoder, LedgerRpc};

/// Linear backoff for whole-batch retries: after the n-th failed attempt
/// wait `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    /// Total attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: Some(8),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        self.base_delay.saturating_mul(failed_attempts)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Decoded events of one batch plus what was dropped along the way.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub events: Vec<DomainEvent>,
    /// Signatures the node no longer returns (pruned).
    pub not_found: usize,
    /// Transactions that failed to decode and were skipped.
    pub defects: usize,
}

pub struct TransactionFetcher<'a> {
    rpc: &'a dyn LedgerRpc,
    decoder: &'a dyn EventDecoder,
    retry: RetryPolicy,
    commitment: Commitment,
}

impl<'a> TransactionFetcher<'a> {
    pub fn new(
        rpc: &'a dyn LedgerRpc,
        decoder: &'a dyn EventDecoder,
        retry: RetryPolicy,
        commitment: Commitment,
    ) -> Self {
        Self {
            rpc,
            decoder,
            retry,
            commitment,
        }
    }

    /// Fetch one batch of transactions and decode their events, in batch
    /// order. Request failures retry the whole batch; decode failures only
    /// skip the offending transaction.
    pub async fn fetch_and_decode(&self, signatures: &[String]) -> Result<DecodedBatch, SyncError> {
        let mut attempts: u32 = 0;

        let transactions = loop {
            attempts += 1;
            match self.rpc.get_transactions(signatures, self.commitment).await {
                Ok(txs) => break txs,
                Err(e) => {
                    if self.retry.exhausted(attempts) {
                        tracing::error!(
                            error = %e,
                            attempts,
                            batch_len = signatures.len(),
                            "Transaction batch failed, giving up"
                        );
                        return Err(SyncError::RetriesExhausted { attempts, source: e });
                    }

                    let delay = self.retry.delay_after(attempts);
                    counter!("batch_retries_total").increment(1);
                    tracing::warn!(
                        error = %e,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transaction batch failed, retrying..."
                    );
                    sleep(delay).await;
                }
            }
        };

        let mut batch = DecodedBatch::default();

        for (signature, tx) in signatures.iter().zip(transactions) {
            let Some(tx) = tx else {
                batch.not_found += 1;
                counter!("transactions_not_found_total").increment(1);
                tracing::debug!(signature = %signature, "Transaction not found, dropping");
                continue;
            };

            match self.decoder.decode(&tx) {
                Ok(events) => batch.events.extend(events),
                Err(e) => {
                    batch.defects += 1;
                    counter!("decode_defects_total").increment(1);
                    tracing::warn!(
                        signature = %signature,
                        error = %e,
                        "Failed to decode transaction, skipping"
                    );
                }
            }
        }

        Ok(batch)
    }
}
