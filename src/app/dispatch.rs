use crate::cli::commands::{Cli, Commands, ReplayCommands};
use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, TimeZone, Utc};
use private_receiver::ReceiverConfig;
use private_receiver::replay::{now_ms, open_replay_store};
use private_receiver::security::{compute_signature, normalize_secret};
use private_receiver::transport::gateway::HOOK_PATH;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::app::status::render_status;

const SIGNATURE_PREFIX_LEN: usize = 12;

/// Read a delivery body from `file`, or stdin when no file is given.
async fn read_body(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read body file {}", path.display())),
        None => {
            let mut body = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut body)
                .await
                .context("Failed to read body from stdin")?;
            Ok(body)
        }
    }
}

/// CLI value first, then the configured one; both go through the same
/// whitespace/quote normalization.
fn pick_secret(cli_value: Option<&str>, configured: Option<&str>) -> Option<String> {
    cli_value.and_then(normalize_secret).or_else(|| configured.map(ToOwned::to_owned))
}

fn signature_lines(secret: &str, timestamp: Option<i64>, body: &[u8]) -> Vec<String> {
    let ts = timestamp.map(|ts| ts.to_string());
    let signature = compute_signature(secret, ts.as_deref(), body);
    let mut lines = vec![format!("x-signature: sha256={signature}")];
    if let Some(ts) = ts {
        lines.push(format!("x-timestamp: {ts}"));
    }
    lines
}

fn default_hook_url(config: &ReceiverConfig) -> String {
    format!("http://127.0.0.1:{}{HOOK_PATH}", config.port)
}

async fn run_send(
    config: &ReceiverConfig,
    url: Option<String>,
    secret: Option<String>,
    token: Option<String>,
    file: Option<&Path>,
) -> Result<()> {
    let body = read_body(file).await?;
    serde_json::from_slice::<serde_json::Value>(&body).context("Body is not valid JSON")?;

    let url = url.unwrap_or_else(|| default_hook_url(config));
    let mut request = reqwest::Client::new()
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json");

    if let Some(token) = pick_secret(token.as_deref(), config.token.as_deref()) {
        request = request.bearer_auth(token);
    }
    if let Some(secret) = pick_secret(secret.as_deref(), config.hmac_secret.as_deref()) {
        let ts = now_ms().to_string();
        let signature = compute_signature(&secret, Some(&ts), &body);
        request = request
            .header("x-signature", format!("sha256={signature}"))
            .header("x-timestamp", ts);
    }

    let response = request
        .body(body)
        .send()
        .await
        .with_context(|| format!("Failed to POST to {url}"))?;
    let status = response.status();
    let text = response.text().await.context("Failed to read response")?;
    println!("{status}");
    println!("{text}");
    if !status.is_success() {
        bail!("receiver rejected delivery with {status}");
    }
    Ok(())
}

async fn run_replay_list(config: &ReceiverConfig, limit: usize) -> Result<()> {
    let now = now_ms();
    let store = open_replay_store(config, now).await?;
    let entries = store.cache().live_entries(now, limit);

    println!(
        "{} live signature(s) in {} store (showing {})",
        store.len(),
        store.backend(),
        entries.len()
    );
    for entry in entries {
        let prefix: String = entry.signature.chars().take(SIGNATURE_PREFIX_LEN).collect();
        let expires = Utc
            .timestamp_millis_opt(entry.expires_at_ms)
            .single()
            .map_or_else(
                || entry.expires_at_ms.to_string(),
                |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        println!("  {prefix:<width$}  expires {expires}", width = SIGNATURE_PREFIX_LEN);
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, mut config: ReceiverConfig) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if config.port == 0 {
                info!("Starting private receiver on {} (random port)", config.host);
            } else {
                info!("Starting private receiver on {}:{}", config.host, config.port);
            }
            private_receiver::transport::gateway::run_receiver(Arc::new(config)).await
        }

        Commands::Sign {
            secret,
            timestamp,
            now,
            file,
        } => {
            let Some(secret) = pick_secret(secret.as_deref(), config.hmac_secret.as_deref())
            else {
                bail!("No HMAC secret: pass --secret or set PRIVATE_LOG_HMAC_SECRET");
            };
            let timestamp = if now { Some(now_ms()) } else { timestamp };
            let body = read_body(file.as_deref()).await?;
            for line in signature_lines(&secret, timestamp, &body) {
                println!("{line}");
            }
            Ok(())
        }

        Commands::Send {
            url,
            secret,
            token,
            file,
        } => run_send(&config, url, secret, token, file.as_deref()).await,

        Commands::Replay { replay_command } => match replay_command {
            ReplayCommands::List { limit } => run_replay_list(&config, limit).await,
        },

        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }
    }
}
