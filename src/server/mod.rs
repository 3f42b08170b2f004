//! Request dispatcher and listener
//!
//! Serves the [`LoanService`] over HTTP/JSON, on plain TCP or on TLS when
//! certificate material is configured. Shutdown is driven by a
//! `CancellationToken`: cancelling it stops accepting connections and cancels
//! every in-flight call.

use crate::cli::StoreType;
use crate::service::LoanService;
use crate::store::RetryPolicy;
use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod routes;

pub use routes::{create_router, AppState};

/// Time given to open connections to finish after shutdown on TLS
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Certificate material for TLS
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Validated startup configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Port to listen on, all interfaces
    pub port: u16,
    /// TLS material; plain TCP when absent
    pub tls: Option<TlsConfig>,
    /// Storage backend
    pub store: StoreType,
    /// Database file for the sqlite store
    pub database: PathBuf,
    /// Deadline for each request
    pub request_timeout: Duration,
    /// Retry budget for a busy database
    pub retry: RetryPolicy,
    /// Runtime worker threads
    pub workers: usize,
}

impl ServerConfig {
    /// Socket address the listener binds
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Serve `service` until `shutdown` is cancelled
///
/// # Errors
///
/// Fails if the TLS material cannot be loaded, the listener cannot be bound,
/// or the server stops with an I/O error. All of these are fatal to startup.
pub async fn serve(
    config: &ServerConfig,
    service: LoanService,
    shutdown: CancellationToken,
) -> Result<()> {
    let state = AppState::new(service, config.request_timeout, shutdown.clone());
    let app = create_router(state);
    let addr = config.listen_addr();

    match &config.tls {
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind listener on {addr}"))?;
            info!(%addr, "listening on plain TCP");

            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .context("server stopped with an error")?;
        }
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert_file, &tls.key_file)
                .await
                .with_context(|| {
                    format!(
                        "failed to load TLS material from {} and {}",
                        tls.cert_file.display(),
                        tls.key_file.display()
                    )
                })?;

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown.cancelled().await;
                shutdown_handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
            });
            info!(%addr, "listening on TLS");

            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .with_context(|| format!("TLS server on {addr} stopped with an error"))?;
        }
    }

    info!("server stopped");
    Ok(())
}
