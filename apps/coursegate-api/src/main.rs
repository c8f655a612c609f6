//! coursegate API server.
//!
//! Receives checkout-platform webhooks, reconciles purchases for signed-in
//! users and exposes delivery logs to operators.

mod app;
mod config;
mod health;
mod logging;
mod openapi;
mod state;

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use coursegate_api_purchases::{PurchasesState, SessionKeys};
use coursegate_db::{run_migrations, DbError, DbPool, PoolSettings};
use coursegate_purchases::{
    ClientError, Collaborators, EmailSender, HttpEmailSender, HttpIdentityProvider,
    HttpTransactionClient, IdentityError, NotificationError, PgPurchaseStore, PurchaseContext,
    PurchaseSettings,
};

use crate::config::Config;
use crate::state::AppState;

#[derive(Debug, Error)]
enum StartupError {
    #[error("database: {0}")]
    Database(#[from] DbError),

    #[error("identity provider client: {0}")]
    Identity(#[from] IdentityError),

    #[error("transaction client: {0}")]
    Transactions(#[from] ClientError),

    #[error("email client: {0}")]
    Email(#[from] NotificationError),

    #[error("bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.app_env,
        "Starting coursegate API"
    );

    if config.uses_insecure_session_secret() {
        warn!("SESSION_SECRET is not set; using the development default");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Server stopped with an error");
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

async fn run(config: Config) -> Result<(), StartupError> {
    let pool = DbPool::connect_with(
        &config.database_url,
        &PoolSettings {
            max_connections: config.db_max_connections,
            acquire_timeout: config.db_acquire_timeout,
        },
    )
    .await?;
    run_migrations(&pool).await?;

    let timeout = config.external_call_timeout;
    let email_sender = match &config.email {
        Some(email) => {
            let sender = HttpEmailSender::new(&email.api_url, &email.api_key, &email.from, timeout)?;
            Some(Arc::new(sender) as Arc<dyn EmailSender>)
        }
        None => {
            info!("Email settings absent, welcome emails disabled");
            None
        }
    };
    let collaborators = Collaborators {
        identity_provider: Arc::new(HttpIdentityProvider::new(
            &config.auth_api_url,
            &config.auth_service_key,
            timeout,
        )?),
        transaction_client: Arc::new(HttpTransactionClient::new(timeout)?),
        email_sender,
    };

    let context = PurchaseContext::new(
        Arc::new(PgPurchaseStore::new(pool.inner().clone())),
        collaborators,
        PurchaseSettings {
            external_call_timeout: timeout,
            login_sweep_timeout: config.login_sweep_timeout,
            reconciliation_page_cap: config.reconciliation_page_cap,
            login_url: config.login_url.clone(),
        },
    );
    let purchases = PurchasesState::new(
        context,
        SessionKeys::from_secret(config.session_secret.as_bytes()),
    );

    let router = app::build_router(AppState::new(pool, purchases), &config);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    info!(address = %address, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
