use crate::logging::LogFormat;
use crate::server::{ServerConfig, TlsConfig};
use crate::store::RetryPolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default request deadline in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Serve the loan account service
#[derive(Parser, Debug)]
#[command(name = "loan-service")]
#[command(about = "Serve loan accounts: register, login, request, check and pay loans", long_about = None)]
pub struct CliArgs {
    /// Port to listen on
    #[arg(long, env = "LOAN_SERVICE_PORT", default_value_t = 10000)]
    pub port: u16,

    /// Serve over TLS instead of plain TCP
    #[arg(long, env = "LOAN_SERVICE_TLS")]
    pub tls: bool,

    /// PEM certificate chain (required with --tls)
    #[arg(long = "cert-file", value_name = "PATH", env = "LOAN_SERVICE_CERT_FILE")]
    pub cert_file: Option<PathBuf>,

    /// PEM private key (required with --tls)
    #[arg(long = "key-file", value_name = "PATH", env = "LOAN_SERVICE_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Storage backend
    #[arg(
        long = "store",
        value_name = "STORE",
        default_value = "sqlite",
        help = "Storage backend: 'sqlite' for a durable database file or 'memory' for a throwaway store"
    )]
    pub store: StoreType,

    /// SQLite database file (sqlite store only)
    #[arg(
        long,
        value_name = "PATH",
        env = "LOAN_SERVICE_DATABASE",
        default_value = "loan_service.db"
    )]
    pub database: PathBuf,

    /// Deadline for a single request
    #[arg(
        long = "request-timeout-ms",
        value_name = "MILLIS",
        help = "Deadline for a single request in milliseconds (default: 5000)"
    )]
    pub request_timeout_ms: Option<u64>,

    /// Attempts for a storage operation that finds the database busy
    #[arg(long = "store-retries", value_name = "COUNT", default_value_t = 3)]
    pub store_retries: u32,

    /// Runtime worker threads
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Available storage backends
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreType {
    Memory,
    Sqlite,
}

/// Startup configuration that cannot be served
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// TLS was requested without both certificate and key
    #[error("--tls requires both --cert-file and --key-file")]
    TlsMaterialMissing,
}

impl CliArgs {
    /// Create a ServerConfig from CLI arguments
    ///
    /// Zero values for the request timeout or worker count fall back to the
    /// defaults with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TlsMaterialMissing` if `--tls` is set without
    /// both certificate and key files.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let tls = if self.tls {
            match (&self.cert_file, &self.key_file) {
                (Some(cert_file), Some(key_file)) => Some(TlsConfig {
                    cert_file: cert_file.clone(),
                    key_file: key_file.clone(),
                }),
                _ => return Err(ConfigError::TlsMaterialMissing),
            }
        } else {
            None
        };

        let request_timeout_ms = match self.request_timeout_ms {
            Some(0) => {
                warn!(
                    default = DEFAULT_REQUEST_TIMEOUT_MS,
                    "invalid request timeout (0), using default"
                );
                DEFAULT_REQUEST_TIMEOUT_MS
            }
            Some(ms) => ms,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        let workers = match self.workers {
            Some(0) => {
                let default = num_cpus::get();
                warn!(default, "invalid worker count (0), using default");
                default
            }
            Some(count) => count,
            None => num_cpus::get(),
        };

        let default_retry = RetryPolicy::default();

        Ok(ServerConfig {
            port: self.port,
            tls,
            store: self.store,
            database: self.database.clone(),
            request_timeout: Duration::from_millis(request_timeout_ms),
            retry: RetryPolicy::new(
                self.store_retries,
                default_retry.base_delay,
                default_retry.max_delay,
            ),
            workers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let parsed = CliArgs::try_parse_from(["program"]).unwrap();
        let config = parsed.to_server_config().unwrap();

        assert_eq!(config.port, 10000);
        assert_eq!(config.store, StoreType::Sqlite);
        assert_eq!(config.database, PathBuf::from("loan_service.db"));
        assert_eq!(config.request_timeout, Duration::from_millis(5_000));
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(config.tls.is_none());
        assert_eq!(parsed.log_format, LogFormat::Pretty);
    }

    #[rstest]
    #[case::memory(&["program", "--store", "memory"], StoreType::Memory)]
    #[case::sqlite(&["program", "--store", "sqlite"], StoreType::Sqlite)]
    fn test_store_parsing(#[case] args: &[&str], #[case] expected: StoreType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.store, expected);
    }

    #[rstest]
    #[case::port(&["program", "--port", "8080"], 8080, 5_000, num_cpus::get())]
    #[case::timeout(&["program", "--request-timeout-ms", "250"], 10000, 250, num_cpus::get())]
    #[case::workers(&["program", "--workers", "2"], 10000, 5_000, 2)]
    #[case::zero_timeout_falls_back(&["program", "--request-timeout-ms", "0"], 10000, 5_000, num_cpus::get())]
    #[case::zero_workers_fall_back(&["program", "--workers", "0"], 10000, 5_000, num_cpus::get())]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] port: u16,
        #[case] timeout_ms: u64,
        #[case] workers: usize,
    ) {
        let config = CliArgs::try_parse_from(args)
            .unwrap()
            .to_server_config()
            .unwrap();

        assert_eq!(config.port, port);
        assert_eq!(config.request_timeout, Duration::from_millis(timeout_ms));
        assert_eq!(config.workers, workers);
    }

    #[test]
    fn test_tls_with_material() {
        let config = CliArgs::try_parse_from([
            "program",
            "--tls",
            "--cert-file",
            "cert.pem",
            "--key-file",
            "key.pem",
        ])
        .unwrap()
        .to_server_config()
        .unwrap();

        let tls = config.tls.unwrap();
        assert_eq!(tls.cert_file, PathBuf::from("cert.pem"));
        assert_eq!(tls.key_file, PathBuf::from("key.pem"));
    }

    #[rstest]
    #[case::no_files(&["program", "--tls"])]
    #[case::cert_only(&["program", "--tls", "--cert-file", "cert.pem"])]
    #[case::key_only(&["program", "--tls", "--key-file", "key.pem"])]
    fn test_tls_without_material(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args).unwrap().to_server_config();
        assert_eq!(result.unwrap_err(), ConfigError::TlsMaterialMissing);
    }

    #[test]
    fn test_cert_files_ignored_without_tls() {
        let config = CliArgs::try_parse_from(["program", "--cert-file", "cert.pem"])
            .unwrap()
            .to_server_config()
            .unwrap();

        assert!(config.tls.is_none());
    }

    #[rstest]
    #[case::invalid_store(&["program", "--store", "postgres"])]
    #[case::invalid_port(&["program", "--port", "70000"])]
    #[case::invalid_log_format(&["program", "--log-format", "xml"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
