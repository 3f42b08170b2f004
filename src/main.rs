//! Loan Service server
//!
//! Opens the configured store and serves the loan account protocol over
//! HTTP/JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --port 10000 --database loan_service.db
//! cargo run -- --store memory --log-format json
//! cargo run -- --tls --cert-file cert.pem --key-file key.pem
//! ```
//!
//! # Exit Codes
//!
//! - 0: Clean shutdown (Ctrl-C)
//! - 1: Startup failure (bad configuration, store cannot be opened, port
//!   cannot be bound, TLS material unreadable)

use anyhow::{Context, Result};
use loan_service::logging::{self, DEFAULT_LOG_FILTER};
use loan_service::server::{self, ServerConfig};
use loan_service::service::LoanService;
use loan_service::{cli, store};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    let args = cli::parse_args();

    if let Err(e) = logging::init_logging(DEFAULT_LOG_FILTER, args.log_format) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = args
        .to_server_config()
        .map_err(anyhow::Error::from)
        .and_then(|config| run(&config))
    {
        tracing::error!(error = %format!("{e:#}"), "startup failed");
        process::exit(1);
    }
}

/// Build the runtime, open the store and serve until Ctrl-C
fn run(config: &ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async {
        let store = store::create_store(config.store, &config.database, config.retry.clone())
            .with_context(|| format!("failed to open {:?} store", config.store))?;
        tracing::info!(
            port = config.port,
            tls = config.tls.is_some(),
            store = ?config.store,
            workers = config.workers,
            "starting loan-service"
        );

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("shutdown requested");
                    signal_token.cancel();
                }
                Err(err) => tracing::warn!(error = %err, "cannot listen for Ctrl-C"),
            }
        });

        server::serve(config, LoanService::new(store), shutdown).await
    })
}
