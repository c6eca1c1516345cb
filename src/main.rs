//! Service entry point: loads configuration, wires the adapters into the
//! handlers, starts the background loops, and waits for shutdown.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tutorlink::adapters::gateway::HttpGatewayClient;
use tutorlink::adapters::notify::LoggingNotifier;
use tutorlink::adapters::postgres::{
    PostgresBalanceLedger, PostgresContractRepository, PostgresOfferRepository,
    PostgresSessionRepository, PostgresTransactionRepository,
};
use tutorlink::application::handlers::payment::ConfirmPaymentHandler;
use tutorlink::application::handlers::session::SessionProvisioner;
use tutorlink::application::locks::ContractLocks;
use tutorlink::application::loops::{ReconciliationLoop, Scheduler, SessionCompletionLoop};
use tutorlink::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .json()
        .init();
    info!(environment = ?config.server.environment, "Starting tutorlink");

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let offers = Arc::new(PostgresOfferRepository::new(pool.clone()));
    let contracts = Arc::new(PostgresContractRepository::new(pool.clone()));
    let transactions = Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let sessions = Arc::new(PostgresSessionRepository::new(pool.clone()));
    let ledger = Arc::new(PostgresBalanceLedger::new(pool.clone()));
    let notifier = Arc::new(LoggingNotifier::new());
    let gateway = Arc::new(HttpGatewayClient::new(config.gateway.clone())?);
    let locks = Arc::new(ContractLocks::new());

    let provisioner = Arc::new(SessionProvisioner::new(sessions.clone(), offers.clone()));
    let confirm = Arc::new(ConfirmPaymentHandler::new(
        contracts.clone(),
        transactions.clone(),
        ledger,
        notifier.clone(),
        provisioner,
        locks,
    ));

    let reconciliation = Arc::new(ReconciliationLoop::new(
        transactions,
        gateway,
        confirm,
        config.scheduler.reconcile_interval(),
        config.scheduler.batch_size,
    ));
    let session_completion = Arc::new(SessionCompletionLoop::new(
        sessions,
        offers,
        notifier,
        config.scheduler.session_sweep_interval(),
        config.scheduler.batch_size,
    ));
    let scheduler = Scheduler::start(reconciliation, session_completion);

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    scheduler.shutdown().await;

    Ok(())
}
