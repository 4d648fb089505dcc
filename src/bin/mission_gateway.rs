use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;

use driftgate::admission::{AdmissionController, PurchaseHandler, RefundSweeper, SweeperConfig};
use driftgate::api::{create_app, AppState};
use driftgate::configure::load_config;
use driftgate::db::{LedgerDb, MissionDb};
use driftgate::dispatch::MemoryJobQueue;
use driftgate::logging::setup_logging;
use driftgate::metrics::AdmissionMetrics;
use driftgate::models::default_packages;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mission admission gateway", long_about = None)]
struct Args {
    /// Listen address override (e.g. 0.0.0.0:8080)
    #[arg(long)]
    listen: Option<String>,

    /// Data directory override
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // 1. Configuration, with CLI overrides on top
    let mut config = load_config().context("Failed to load configuration")?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let _log_guard = setup_logging("mission_gateway", &config.log_dir);

    // 2. Open the store and the two keyspaces over it
    let db = sled::open(&config.data_dir)
        .with_context(|| format!("Failed to open store at {}", config.data_dir))?;
    let ledger = Arc::new(LedgerDb::open(
        &db,
        config.default_grant,
        config.lock_timeout_ms,
    )?);
    ledger.seed_packages(&default_packages())?;
    let missions = Arc::new(MissionDb::open(&db)?);

    // 3. Dispatch queue and metrics
    let queue = Arc::new(MemoryJobQueue::new(config.queue_capacity));
    let metrics = AdmissionMetrics::new();

    // 4. Admission pipeline
    let controller = AdmissionController::new(
        ledger.clone(),
        missions.clone(),
        queue.clone(),
        metrics.clone(),
    );
    let purchases = PurchaseHandler::new(ledger.clone(), metrics.clone());

    // 5. Background refund sweeper
    let sweeper = Arc::new(RefundSweeper::new(
        missions.clone(),
        controller.compensator(),
        metrics.clone(),
        SweeperConfig {
            scan_interval_ms: config.sweep_interval_ms,
            batch_limit: config.sweep_batch_limit,
        },
    ));
    let _sweeper_handle = sweeper.spawn();

    // 6. HTTP surface
    let state = Arc::new(AppState {
        controller,
        purchases,
        ledger,
        metrics,
        admin_token: config.admin_token.clone(),
    });
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    println!("--------------------------------------------------");
    println!("Mission Gateway Started");
    println!("  Listening on:      {}", config.listen_addr);
    println!("  Data dir:          {}", config.data_dir);
    println!("  Default grant:     {} credits", config.default_grant);
    println!("  Queue capacity:    {}", config.queue_capacity);
    println!(
        "  Admin endpoints:   {}",
        if config.admin_token.is_empty() {
            "disabled"
        } else {
            "enabled"
        }
    );
    println!("--------------------------------------------------");
    println!("Endpoints:");
    println!("  POST /api/v1/missions             - Submit a mission (charges credits)");
    println!("  GET  /api/v1/missions             - List own missions");
    println!("  GET  /api/v1/missions/:id         - Mission detail");
    println!("  GET  /api/v1/missions/:id/status  - Poll mission status");
    println!("  POST /api/v1/missions/:id/status  - Worker status callback");
    println!("  GET  /api/v1/credits/balance      - Credit balance");
    println!("  GET  /api/v1/credits/transactions - Ledger history");
    println!("  GET  /api/v1/credits/packages     - Purchasable packages");
    println!("  POST /api/v1/credits/purchase     - Buy a credit package");
    println!("  POST /api/v1/credits/grant        - Grant credits (admin)");
    println!("  GET  /api/v1/admin/metrics        - Admission metrics (admin)");
    println!("  GET  /health                      - Health check");
    println!("--------------------------------------------------");

    tracing::info!("mission_gateway listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .await
        .context("Server exited with error")?;
    Ok(())
}
