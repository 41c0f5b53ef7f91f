#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

use anyhow::Result;
use clap::Parser;
use private_receiver::ReceiverConfig;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod app;
mod cli;

use cli::commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ReceiverConfig::load(cli.config.as_deref())?;

    // Initialize logging
    let level = if config.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install tracing subscriber: {error}");
    }

    app::dispatch::dispatch(cli, config).await
}
