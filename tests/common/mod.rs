use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use whisky_indexer::db::{EventStore, StoreCounts, StoreError};
use whisky_indexer::ingestion::{RetryPolicy, SyncConfig, SyncOrchestrator};
use whisky_indexer::models::{
    DomainEvent, GameSettledEvent, PoolAction, PoolChange, PoolChangeEvent, SettledGame,
    SignatureRecord,
};
use whisky_indexer::pricing::{PriceError, PriceSource, TokenPrice};
use whisky_indexer::solana::{
    Commitment, DecodeError, EventDecoder, LedgerRpc, RawTransaction, RpcError,
};

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// In-memory ledger. `history` is newest first, like the real index.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeLedger {
    history: Mutex<Vec<SignatureRecord>>,
    transactions: Mutex<HashMap<String, RawTransaction>>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    fail_next_gets: AtomicU32,
    fail_lists: AtomicBool,
    ignore_cursor: AtomicBool,
    pub requested_batches: Mutex<Vec<Vec<String>>>,
}

#[allow(dead_code)]
impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction at the ledger head. `logs` feed [`FakeDecoder`].
    pub fn push(&self, signature: &str, block_time: i64, logs: &[&str]) {
        self.push_entry(signature, block_time);
        self.transactions.lock().unwrap().insert(
            signature.to_string(),
            RawTransaction {
                signature: signature.to_string(),
                block_time: Some(block_time),
                failed: false,
                log_messages: logs.iter().map(|l| l.to_string()).collect(),
            },
        );
    }

    /// Append a signature whose transaction the node no longer serves.
    pub fn push_pruned(&self, signature: &str, block_time: i64) {
        self.push_entry(signature, block_time);
    }

    fn push_entry(&self, signature: &str, block_time: i64) {
        self.history
            .lock()
            .unwrap()
            .insert(0, SignatureRecord::new(signature, block_time));
    }

    pub fn fail_next_gets(&self, n: u32) {
        self.fail_next_gets.store(n, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Serve the first page for every request, whatever the cursor.
    pub fn ignore_cursor(&self, ignore: bool) {
        self.ignore_cursor.store(ignore, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn list_signatures(
        &self,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, RpcError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(RpcError::Unexpected("signature index unavailable".into()));
        }

        let history = self.history.lock().unwrap();
        let start = match before {
            Some(_) if self.ignore_cursor.load(Ordering::SeqCst) => 0,
            Some(b) => history
                .iter()
                .position(|s| s.signature == b)
                .map(|i| i + 1)
                .unwrap_or(history.len()),
            None => 0,
        };

        Ok(history[start..]
            .iter()
            .take_while(|s| Some(s.signature.as_str()) != until)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_transactions(
        &self,
        signatures: &[String],
        _commitment: Commitment,
    ) -> Result<Vec<Option<RawTransaction>>, RpcError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_batches
            .lock()
            .unwrap()
            .push(signatures.to_vec());

        let remaining = self.fail_next_gets.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next_gets.store(remaining - 1, Ordering::SeqCst);
            return Err(RpcError::Unexpected("connection reset".into()));
        }

        let transactions = self.transactions.lock().unwrap();
        Ok(signatures
            .iter()
            .map(|s| transactions.get(s).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Reads events from plain log lines:
/// `game:<token>`, `deposit:<token>`, `withdraw:<token>`, `defect`.
#[derive(Default)]
pub struct FakeDecoder;

impl EventDecoder for FakeDecoder {
    fn decode(&self, tx: &RawTransaction) -> Result<Vec<DomainEvent>, DecodeError> {
        let block_time = tx.block_time.unwrap_or_default();
        let mut events = Vec::new();

        for line in &tx.log_messages {
            if line == "defect" {
                return Err(DecodeError::Malformed {
                    event: "GameSettled",
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "payload ends early",
                    ),
                });
            }
            let Some((kind, token)) = line.split_once(':') else {
                continue;
            };
            match kind {
                "game" => events.push(DomainEvent::GameSettled(game_event(
                    &tx.signature,
                    block_time,
                    token,
                ))),
                "deposit" | "withdraw" => {
                    let action = if kind == "deposit" {
                        PoolAction::Deposit
                    } else {
                        PoolAction::Withdraw
                    };
                    events.push(DomainEvent::PoolChange(PoolChangeEvent {
                        signature: tx.signature.clone(),
                        block_time,
                        user: "user".into(),
                        pool: format!("pool-{token}"),
                        token_mint: token.to_string(),
                        action,
                        amount: 1_000,
                        lp_supply: 10_000,
                        post_liquidity: 50_000,
                    }));
                }
                _ => {}
            }
        }

        Ok(events)
    }
}

#[allow(dead_code)]
pub fn game_event(signature: &str, block_time: i64, token: &str) -> GameSettledEvent {
    GameSettledEvent {
        signature: signature.to_string(),
        block_time,
        user: "user".into(),
        pool: format!("pool-{token}"),
        token_mint: token.to_string(),
        creator: "creator".into(),
        creator_fee: 10,
        whisky_fee: 20,
        pool_fee: 30,
        jackpot_fee: 5,
        wager: 1_000_000,
        payout: 1_900_000,
        multiplier_bps: 19_000,
        jackpot_payout_to_user: 0,
        pool_liquidity: 80_000_000,
        rng_seed: format!("rng-{signature}"),
        client_seed: "client".into(),
        nonce: block_time as u64,
        bet: vec![2, 0],
        next_rng_seed_hashed: "next".into(),
        metadata: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

#[derive(Default)]
#[allow(dead_code)]
pub struct FakePrices {
    prices: Mutex<HashMap<String, Decimal>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

#[allow(dead_code)]
impl FakePrices {
    pub fn with(tokens: &[(&str, Decimal)]) -> Self {
        let prices = FakePrices::default();
        for (token, price) in tokens {
            prices.set(token, *price);
        }
        prices
    }

    pub fn set(&self, token: &str, price: Decimal) {
        self.prices.lock().unwrap().insert(token.to_string(), price);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn get_prices(
        &self,
        token_ids: &[String],
    ) -> Result<HashMap<String, TokenPrice>, PriceError> {
        self.calls.lock().unwrap().push(token_ids.to_vec());
        let prices = self.prices.lock().unwrap();

        token_ids
            .iter()
            .map(|id| {
                prices
                    .get(id)
                    .map(|p| (id.clone(), TokenPrice { usd_per_unit: *p }))
                    .ok_or_else(|| PriceError::Missing(id.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub signatures: BTreeMap<String, i64>,
    pub games: BTreeMap<String, SettledGame>,
    pub pool_changes: BTreeMap<String, PoolChange>,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryStore {
    state: Mutex<StoreSnapshot>,
    fail_event_writes: AtomicBool,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().unwrap().clone()
    }

    pub fn seed_signature(&self, signature: &str, block_time: i64) {
        self.state
            .lock()
            .unwrap()
            .signatures
            .insert(signature.to_string(), block_time);
    }

    pub fn fail_event_writes(&self, fail: bool) {
        self.fail_event_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_event_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn high_water_mark(&self) -> Result<i64, StoreError> {
        let state = self.state.lock().unwrap();
        let game = state.games.values().map(|g| g.block_time).max().unwrap_or(0);
        let pool = state.pool_changes.values().map(|p| p.block_time).max().unwrap_or(0);
        Ok(game.max(pool))
    }

    async fn identifiers_since(&self, block_time: i64) -> Result<Vec<SignatureRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut gaps: Vec<SignatureRecord> = state
            .signatures
            .iter()
            .filter(|(sig, ts)| {
                **ts >= block_time
                    && !state.games.contains_key(*sig)
                    && !state.pool_changes.contains_key(*sig)
            })
            .map(|(sig, ts)| SignatureRecord::new(sig.clone(), *ts))
            .collect();
        gaps.sort_by(|a, b| (a.block_time, &a.signature).cmp(&(b.block_time, &b.signature)));
        Ok(gaps)
    }

    async fn latest_identifier(&self) -> Result<Option<SignatureRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .signatures
            .iter()
            .max_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)))
            .map(|(sig, ts)| SignatureRecord::new(sig.clone(), *ts)))
    }

    async fn upsert_identifier(&self, record: &SignatureRecord) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .signatures
            .insert(record.signature.clone(), record.block_time);
        Ok(())
    }

    async fn upsert_settled_game(&self, game: &SettledGame) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        assert!(
            state.signatures.contains_key(&game.signature),
            "event stored before its signature"
        );
        let mut game = game.clone();
        if let Some(existing) = state.games.get(&game.signature) {
            game.usd_per_unit = existing.usd_per_unit;
        }
        state.games.insert(game.signature.clone(), game);
        Ok(())
    }

    async fn upsert_pool_change(&self, change: &PoolChange) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        assert!(
            state.signatures.contains_key(&change.signature),
            "event stored before its signature"
        );
        let mut change = change.clone();
        if let Some(existing) = state.pool_changes.get(&change.signature) {
            change.usd_per_unit = existing.usd_per_unit;
        }
        state.pool_changes.insert(change.signature.clone(), change);
        Ok(())
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(StoreCounts {
            signatures: state.signatures.len() as i64,
            settled_games: state.games.len() as i64,
            pool_changes: state.pool_changes.len() as i64,
        })
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

#[allow(dead_code)]
pub fn test_sync_config(page_size: usize, batch_size: usize) -> SyncConfig {
    SyncConfig {
        page_size,
        batch_size: NonZeroUsize::new(batch_size).expect("batch size > 0"),
        page_delay: Duration::from_millis(100),
        retry: RetryPolicy {
            base_delay: Duration::from_secs(1),
            max_attempts: Some(5),
        },
        commitment: Commitment::Confirmed,
    }
}

#[allow(dead_code)]
pub fn orchestrator(
    ledger: &Arc<FakeLedger>,
    prices: &Arc<FakePrices>,
    store: &Arc<MemoryStore>,
    config: SyncConfig,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        ledger.clone(),
        Arc::new(FakeDecoder),
        prices.clone(),
        store.clone(),
        config,
    )
}

#[allow(dead_code)]
pub fn usd(s: &str) -> Decimal {
    s.parse().expect("valid decimal")
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Connect to the test database, run migrations and clear all tables.
/// `None` when `TEST_DATABASE_URL` is not set.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<sqlx::PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Clean tables for test isolation
    sqlx::query("DELETE FROM settled_games").execute(&pool).await.ok();
    sqlx::query("DELETE FROM pool_changes").execute(&pool).await.ok();
    sqlx::query("DELETE FROM signatures").execute(&pool).await.ok();

    Some(pool)
}
