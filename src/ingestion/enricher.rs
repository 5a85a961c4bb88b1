use std::collections::BTreeSet;

use crate::models::{DomainEvent, PoolChange, SettledGame};
use crate::pricing::{PriceError, PriceSource};

/// A decoded event turned into the row that gets stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRecord {
    SettledGame(SettledGame),
    PoolChange(PoolChange),
}

impl EventRecord {
    pub fn signature(&self) -> &str {
        match self {
            EventRecord::SettledGame(g) => &g.signature,
            EventRecord::PoolChange(p) => &p.signature,
        }
    }
}

/// Price every event of a batch with one lookup for the distinct tokens it
/// references, and derive game outcomes. Any unpriced token fails the batch.
pub async fn enrich_batch(
    prices: &dyn PriceSource,
    events: &[DomainEvent],
) -> Result<Vec<EventRecord>, PriceError> {
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let tokens: Vec<String> = events
        .iter()
        .map(|e| e.token_mint().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let quotes = prices.get_prices(&tokens).await?;

    events
        .iter()
        .map(|event| {
            let price = quotes
                .get(event.token_mint())
                .ok_or_else(|| PriceError::Missing(event.token_mint().to_string()))?;

            Ok(match event {
                DomainEvent::GameSettled(e) => {
                    EventRecord::SettledGame(SettledGame::from_event(e, price.usd_per_unit))
                }
                DomainEvent::PoolChange(e) => {
                    EventRecord::PoolChange(PoolChange::from_event(e, price.usd_per_unit))
                }
            })
        })
        .collect()
}
