//! CLI argument definitions for tradewire.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rates` | Latest exchange rates for a base currency |
//! | `pincode` | India Post lookup for a six-digit PIN |
//! | `cache-key` | Print the cache key a request would use |
//! | `config` | Print the effective configuration |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--env-file` | none | Extra dotenv file to read |
//! | `--timeout-ms` | `10000` | Per-attempt timeout in ms |
//! | `--max-retries` | `3` | Retries after the first attempt |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--verbose` | `false` | Debug logging for the request core |
//!
//! # Examples
//!
//! ```bash
//! tradewire rates USD --symbols INR,EUR --pretty
//! tradewire pincode 110001
//! tradewire cache-key --method get --url https://api.test/foo
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tradewire_core::HttpMethod;

/// Trade-intelligence provider client.
#[derive(Debug, Parser)]
#[command(
    name = "tradewire",
    author,
    version,
    about = "Cached, retrying access to public trade-intelligence providers"
)]
pub struct Cli {
    /// Dotenv file with TRADEWIRE_* settings; process variables win.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures.
    #[arg(long, global = true, default_value_t = 3)]
    pub max_retries: u32,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log request core activity at debug level.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Latest exchange rates for a base currency.
    Rates(RatesArgs),
    /// Look up post offices for an Indian PIN code.
    Pincode(PincodeArgs),
    /// Print the cache key derived for a request.
    CacheKey(CacheKeyArgs),
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[derive(Debug, Args)]
pub struct RatesArgs {
    /// Three-letter ISO currency code.
    pub base: String,

    /// Only report these currencies.
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Bypass the response cache.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
}

#[derive(Debug, Args)]
pub struct PincodeArgs {
    /// Six-digit PIN code.
    pub pincode: String,
}

#[derive(Debug, Args)]
pub struct CacheKeyArgs {
    #[arg(long, value_enum, default_value_t = MethodArg::Get)]
    pub method: MethodArg,

    #[arg(long)]
    pub url: String,

    /// JSON request body.
    #[arg(long)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<MethodArg> for HttpMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Get => Self::Get,
            MethodArg::Post => Self::Post,
            MethodArg::Put => Self::Put,
            MethodArg::Patch => Self::Patch,
            MethodArg::Delete => Self::Delete,
        }
    }
}
