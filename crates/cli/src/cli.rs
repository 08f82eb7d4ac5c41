use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use symvault_vault::KvVersion;

#[derive(Parser, Debug)]
#[command(name = "symvault")]
#[command(about = "Resolve vault:// symlinks inside secrets")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-format",
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(long, global = true, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "VAULT_ADDR", help = "Vault server address")]
    pub vault_addr: Option<String>,

    #[arg(
        long,
        global = true,
        env = "VAULT_TOKEN",
        hide_env_values = true,
        help = "Vault token (HTTP mode); without one the vault CLI is used"
    )]
    pub vault_token: Option<String>,

    #[arg(long, global = true, help = "KV secrets engine mount point")]
    pub mount: Option<String>,

    #[arg(long, global = true, help = "KV secrets engine version (v1 or v2)")]
    pub kv_version: Option<KvVersion>,

    #[arg(
        long,
        global = true,
        help = "Fail when a field needs more than this many reads"
    )]
    pub max_depth: Option<usize>,

    #[arg(long, global = true, help = "Cancel resolution after this many seconds")]
    pub timeout: Option<u64>,

    #[arg(
        long,
        global = true,
        help = "Read secrets from a JSON fixtures file instead of Vault"
    )]
    pub fixtures: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Resolve every reference in a JSON object")]
    Resolve {
        #[arg(
            long,
            short = 'i',
            help = "JSON file to resolve (reads stdin when omitted)"
        )]
        input: Option<PathBuf>,
    },
    #[command(about = "Read a secret and resolve the references it contains")]
    Get {
        #[arg(help = "Secret path")]
        path: String,
        #[arg(long, help = "Secret version (latest when omitted)")]
        version: Option<u64>,
    },
    #[command(about = "Decode a vault:// reference without reading anything")]
    Parse {
        #[arg(help = "Reference to decode")]
        reference: String,
    },
}
