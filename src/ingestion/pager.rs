use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;

use crate::models::SignatureRecord;
use crate::solana::{LedgerRpc, RpcError};

/// Walks the program's signature index backwards from the ledger head.
pub struct SignaturePager<'a> {
    rpc: &'a dyn LedgerRpc,
    page_size: usize,
    page_delay: Duration,
}

impl<'a> SignaturePager<'a> {
    pub fn new(rpc: &'a dyn LedgerRpc, page_size: usize, page_delay: Duration) -> Self {
        Self {
            rpc,
            page_size,
            page_delay,
        }
    }

    /// Every signature newer than `until` (or the whole history when
    /// `None`), ascending by block time, without duplicates.
    ///
    /// Stops on an empty page or when a page no longer moves the oldest
    /// known signature. Request failures are returned as-is.
    pub async fn discover_since(
        &self,
        until: Option<&SignatureRecord>,
    ) -> Result<Vec<SignatureRecord>, RpcError> {
        let until_signature = until.map(|u| u.signature.as_str());

        let mut accumulated: Vec<SignatureRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut before: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .rpc
                .list_signatures(before.as_deref(), until_signature, self.page_size)
                .await?;
            pages += 1;

            if page.is_empty() {
                break;
            }

            tracing::debug!(
                page = pages,
                page_len = page.len(),
                accumulated = accumulated.len(),
                before = ?before,
                "Fetched signature page"
            );

            // Pages are newest-first and older than everything accumulated so
            // far: flip them and put them in front, then let a stable sort fix
            // any out-of-order block times.
            let mut merged: Vec<SignatureRecord> = page
                .into_iter()
                .rev()
                .filter(|s| Some(s.signature.as_str()) != until_signature)
                .filter(|s| seen.insert(s.signature.clone()))
                .collect();
            merged.append(&mut accumulated);
            merged.sort_by_key(|s| s.block_time);
            accumulated = merged;

            let oldest = accumulated.first().map(|s| s.signature.clone());
            if oldest.is_none() || oldest == before {
                break;
            }
            before = oldest;

            sleep(self.page_delay).await;
        }

        tracing::info!(
            pages,
            found = accumulated.len(),
            until = ?until_signature,
            "Signature discovery finished"
        );

        Ok(accumulated)
    }
}
