use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `private-receiver` - authenticated webhook sink for ticket logs.
#[derive(Parser, Debug)]
#[command(name = "private-receiver")]
#[command(version)]
#[command(about = "Receive signed ticket-log webhooks and archive them.", long_about = None)]
pub struct Cli {
    /// TOML config file; environment variables override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the webhook receiver
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Print the signature headers a sender must attach to a body
    Sign {
        /// HMAC secret (defaults to the configured secret)
        #[arg(long)]
        secret: Option<String>,

        /// Timestamp in epoch milliseconds to bind into the signature
        #[arg(long, conflicts_with = "now")]
        timestamp: Option<i64>,

        /// Bind the current time into the signature
        #[arg(long)]
        now: bool,

        /// Body file (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Sign a JSON body with the current timestamp and POST it
    Send {
        /// Delivery URL (defaults to the local receiver)
        #[arg(long)]
        url: Option<String>,

        /// HMAC secret (defaults to the configured secret)
        #[arg(long)]
        secret: Option<String>,

        /// Bearer token (defaults to the configured token)
        #[arg(long)]
        token: Option<String>,

        /// Body file (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Inspect the replay store
    Replay {
        #[command(subcommand)]
        replay_command: ReplayCommands,
    },

    /// Show the effective configuration (secrets redacted)
    Status,
}

/// Replay store subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ReplayCommands {
    /// List live signatures, latest expiry first
    List {
        /// Maximum number of entries to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}
