use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use token_price_history::api::AlchemyClient;
use token_price_history::cache::{connect_redis, RedisCache};
use token_price_history::config::Config;
use token_price_history::db::{self, MySqlRecordStore};
use token_price_history::http::{self, AppState};
use token_price_history::queue::RedisJobQueue;
use token_price_history::services::{
    BackfillRunner, BackfillWorker, PriceHistoryService, PriceLookupService, ScheduleService,
};

#[derive(Parser)]
#[command(name = "token-price-history", version, about = "Token price lookups and daily history backfill")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the price lookup, range history and scheduling endpoints
    Serve,
    /// Consume backfill jobs until interrupted
    Worker,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("token_price_history=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap()))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if config.alchemy_api_key.is_none() {
        warn!("ALCHEMY_API_KEY not set, upstream lookups will be refused");
    }

    let shutdown = shutdown_signal();

    let result = match cli.command {
        Command::Serve => run_server(config, shutdown).await,
        Command::Worker => run_worker(config, shutdown).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Flip a watch channel on Ctrl-C or SIGTERM
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("🛑 Shutdown requested, draining...");
        let _ = tx.send(true);
    });
    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("Could not install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn alchemy_client(config: &Config) -> Result<Arc<AlchemyClient>, String> {
    AlchemyClient::new(config.alchemy_api_key.clone(), config.http_timeout)
        .map(Arc::new)
        .map_err(|e| format!("Failed to build Alchemy client: {}", e))
}

async fn run_server(config: Config, shutdown: watch::Receiver<bool>) -> Result<(), String> {
    info!("🚀 Starting price API...");

    let redis = connect_redis(&config.redis_url)
        .await
        .map_err(|e| format!("Failed to connect to Redis: {}", e))?;
    let source = alchemy_client(&config)?;
    let cache = Arc::new(RedisCache::new(redis.clone()));
    let queue = Arc::new(RedisJobQueue::new(redis, config.max_attempts));

    let state = AppState {
        lookup: Arc::new(PriceLookupService::new(source.clone(), cache.clone())),
        history: Arc::new(PriceHistoryService::new(source, cache)),
        scheduler: Arc::new(ScheduleService::new(queue)),
    };

    http::serve(config.bind_addr, state, shutdown)
        .await
        .map_err(|e| format!("HTTP server error: {}", e))
}

async fn run_worker(config: Config, shutdown: watch::Receiver<bool>) -> Result<(), String> {
    info!("🚀 Starting backfill worker...");

    let database_url = config.require_database_url().map_err(|e| e.to_string())?;

    info!("Initializing database...");
    let pool = db::init_db(database_url)
        .await
        .map_err(|e| format!("Failed to initialize database: {}", e))?;
    info!("Database initialized successfully");

    let redis = connect_redis(&config.redis_url)
        .await
        .map_err(|e| format!("Failed to connect to Redis: {}", e))?;
    let queue = Arc::new(RedisJobQueue::new(redis, config.max_attempts));
    match queue.recover_stalled().await {
        Ok(0) => {}
        Ok(n) => info!("♻️ Recovered {} stalled job(s)", n),
        Err(e) => warn!("Could not recover stalled jobs: {}", e),
    }

    let records = Arc::new(MySqlRecordStore::new(pool));
    let worker = BackfillWorker::new(alchemy_client(&config)?, records.clone(), config.day_delay);

    BackfillRunner::new(worker, queue).run(shutdown).await;

    records.close().await;
    info!("👋 Worker stopped");
    Ok(())
}
