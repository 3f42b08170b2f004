// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{CliArgs, ConfigError, StoreType, DEFAULT_REQUEST_TIMEOUT_MS};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// Values not given on the command line are read from `LOAN_SERVICE_*`
/// environment variables where the argument declares one. If parsing fails
/// (invalid arguments or `--help`), clap prints the message and exits the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
