use anyhow::{Context, Result};
use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;
const NAME_ATTEMPTS: usize = 4;

/// On-disk record of one accepted delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchivedPayload<'a> {
    received_at: String,
    headers: serde_json::Map<String, serde_json::Value>,
    data: &'a serde_json::Value,
}

/// Writes accepted payloads to `<dir>/<epoch-ms>-<random6>.json`.
#[derive(Debug, Clone)]
pub struct PayloadArchive {
    dir: PathBuf,
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

/// Header map as a JSON object; repeated headers are joined with `", "`.
fn headers_json(headers: &HeaderMap) -> serde_json::Map<String, serde_json::Value> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), serde_json::Value::String(joined))
        })
        .collect()
}

impl PayloadArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn store(
        &self,
        headers: &HeaderMap,
        data: &serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create archive dir {}", self.dir.display()))?;

        let record = ArchivedPayload {
            received_at: received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            headers: headers_json(headers),
            data,
        };
        let contents = serde_json::to_vec_pretty(&record).context("serialize archived payload")?;

        let stamp = received_at.timestamp_millis();
        for _ in 0..NAME_ATTEMPTS {
            let path = self.dir.join(format!("{stamp}-{}.json", random_suffix()));
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(error) => {
                    return Err(error)
                        .with_context(|| format!("create archive file {}", path.display()));
                }
            };
            file.write_all(&contents)
                .await
                .with_context(|| format!("write archive file {}", path.display()))?;
            file.flush()
                .await
                .with_context(|| format!("flush archive file {}", path.display()))?;
            return Ok(path);
        }

        anyhow::bail!(
            "could not pick a unique archive name in {} after {NAME_ATTEMPTS} attempts",
            self.dir.display()
        )
    }
}
