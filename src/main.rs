use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use whisky_indexer::api::router::create_router;
use whisky_indexer::config::AppConfig;
use whisky_indexer::db::{self, PgEventStore};
use whisky_indexer::ingestion::SyncOrchestrator;
use whisky_indexer::metrics::init_metrics;
use whisky_indexer::pricing::HeliusPriceClient;
use whisky_indexer::solana::{AnchorEventDecoder, SolanaRpcClient};
use whisky_indexer::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let db = db::init_pool(&config.database_url).await?;
    db::run_migrations(&db).await?;
    tracing::info!("Database connected");

    let metrics_handle = init_metrics()?;

    // --- Sync pipeline: ledger RPC → decoder → prices → Postgres ---
    let http = reqwest::Client::new();
    let rpc = Arc::new(SolanaRpcClient::new(
        http.clone(),
        config.solana_rpc_endpoint.clone(),
        config.program_id.clone(),
    ));
    let prices = Arc::new(
        HeliusPriceClient::new(http, config.helius_api_key.clone())
            .with_base_url(config.helius_api_url.clone()),
    );
    let store = Arc::new(PgEventStore::new(db.clone()));

    let orchestrator = Arc::new(SyncOrchestrator::new(
        rpc,
        Arc::new(AnchorEventDecoder::new()),
        prices,
        store,
        config.sync_config(),
    ));
    let sync_lock = Arc::new(Mutex::new(()));

    if config.sync_interval_secs > 0 {
        let orchestrator = orchestrator.clone();
        let sync_lock = sync_lock.clone();
        let interval = Duration::from_secs(config.sync_interval_secs);
        tracing::info!(
            interval_secs = config.sync_interval_secs,
            program = %config.program_id,
            "Sync scheduler spawned"
        );
        tokio::spawn(async move {
            run_scheduler(orchestrator, sync_lock, interval).await;
        });
    } else {
        tracing::info!("Sync scheduler disabled (SYNC_INTERVAL_SECS=0), manual trigger only");
    }

    let state = AppState {
        db,
        config,
        metrics_handle,
        orchestrator,
        sync_lock,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

/// Run a sync on every tick. A failed run is logged and retried on the
/// next tick; runs never overlap with a manual trigger.
async fn run_scheduler(orchestrator: Arc<SyncOrchestrator>, sync_lock: Arc<Mutex<()>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let _guard = sync_lock.lock().await;
        if let Err(e) = orchestrator.run_sync().await {
            tracing::error!(error = %e, "Scheduled sync failed, will retry next tick");
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}
