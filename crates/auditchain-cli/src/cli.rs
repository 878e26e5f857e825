use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "auditchain",
    about = "Append to and verify a hash-chained audit ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with ledger settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger file, overriding the configured path
    #[arg(short, long, global = true)]
    pub ledger: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open the ledger, creating the genesis entry if needed
    Init(InitArgs),
    /// Append an entry
    Append(AppendArgs),
    /// Show entries, oldest first
    Log(LogArgs),
    /// Show a single entry
    Show(ShowArgs),
    /// Show the most recent entry
    Head(HeadArgs),
    /// Verify chain integrity
    Verify(VerifyArgs),
    /// Show the audit index
    Audit(AuditArgs),
}

#[derive(Args)]
pub struct InitArgs {}

#[derive(Args)]
pub struct AppendArgs {
    /// Raw JSON payload
    #[arg(conflicts_with_all = ["action", "fields"])]
    pub payload: Option<String>,
    /// Value of the `action` key
    #[arg(short, long)]
    pub action: Option<String>,
    /// Additional `key=value` pairs
    #[arg(short = 'f', long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

#[derive(Args)]
pub struct LogArgs {
    /// Show only the last N entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// 1-based entry index
    pub index: u64,
}

#[derive(Args)]
pub struct HeadArgs {}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub action: Option<String>,
    #[arg(long)]
    pub actor: Option<String>,
}
