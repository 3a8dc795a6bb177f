//! File-system backed history of batch jobs, keyed `<user>/<kind>/<searchId>.json`.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::BatchJob;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_KIND: &str = "batch";

/// One listed history blob. Degraded entries carry only what the file system knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub key: String,
    pub search_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    pub timestamp: DateTime<Utc>,
    pub degraded: bool,
}

pub trait HistoryStore: Send + Sync {
    /// Persists `job` and returns its key.
    fn save<'a>(
        &'a self,
        user: &'a str,
        kind: &'a str,
        job: &'a BatchJob,
    ) -> BoxFuture<'a, Result<String>>;

    /// Lists the stored jobs for `user`/`kind`, newest first.
    fn list<'a>(&'a self, user: &'a str, kind: &'a str)
        -> BoxFuture<'a, Result<Vec<HistoryEntry>>>;
}

pub struct FsHistoryStore {
    root: PathBuf,
}

fn check_segment(name: &str, value: &str) -> Result<()> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(|c: char| c == '/' || c == '\\');
    if bad {
        return Err(AppError::InvalidInput(format!(
            "{} '{}' is not a valid history path segment",
            name, value
        )));
    }
    Ok(())
}

fn timestamp_from_search_id(search_id: &str) -> Option<DateTime<Utc>> {
    let millis = search_id.parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

impl FsHistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.history_dir)
    }

    fn prefix(&self, user: &str, kind: &str) -> Result<PathBuf> {
        check_segment("user", user)?;
        check_segment("kind", kind)?;
        Ok(self.root.join(user).join(kind))
    }

    async fn write_job(&self, user: &str, kind: &str, job: &BatchJob) -> Result<String> {
        check_segment("searchId", &job.search_id)?;
        let dir = self.prefix(user, kind)?;
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.json", job.search_id);
        let final_path = dir.join(&file_name);
        let tmp_path = dir.join(format!(".{}.tmp", file_name));
        let body = serde_json::to_vec_pretty(job)?;
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        let key = format!("{}/{}/{}", user, kind, file_name);
        tracing::info!(target: "history", "Saved {} ({} records).", key, job.record_count);
        Ok(key)
    }

    async fn read_entry(path: &Path, key: String) -> HistoryEntry {
        let search_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(time) => DateTime::<Utc>::from(time),
            Err(_) => Utc::now(),
        };

        let parsed = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice::<BatchJob>(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(job) => {
                let search_id = if job.search_id.is_empty() {
                    search_id
                } else {
                    job.search_id
                };
                HistoryEntry {
                    timestamp: timestamp_from_search_id(&search_id).unwrap_or(modified),
                    key,
                    search_id,
                    file_name: Some(job.file_name),
                    record_count: Some(job.records.len()),
                    success_count: Some(
                        job.records.iter().filter(|r| r.found_email.is_some()).count(),
                    ),
                    degraded: false,
                }
            }
            Err(reason) => {
                let degradation = AppError::PersistenceDegradation {
                    key: key.clone(),
                    reason,
                };
                tracing::warn!(target: "history", "{}", degradation);
                HistoryEntry {
                    key,
                    search_id,
                    file_name: None,
                    record_count: None,
                    success_count: None,
                    timestamp: modified,
                    degraded: true,
                }
            }
        }
    }

    async fn list_entries(&self, user: &str, kind: &str) -> Result<Vec<HistoryEntry>> {
        let dir = self.prefix(user, kind)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: "history", "No history at {}", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(dir_entry) = read_dir.next_entry().await? {
            let path = dir_entry.path();
            let is_blob = path.extension().is_some_and(|ext| ext == "json")
                && !dir_entry.file_name().to_string_lossy().starts_with('.');
            if !is_blob {
                continue;
            }
            let key = format!("{}/{}/{}", user, kind, dir_entry.file_name().to_string_lossy());
            entries.push(Self::read_entry(&path, key).await);
        }

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.key.cmp(&a.key)));
        tracing::debug!(target: "history", "Listed {} entries for {}/{}", entries.len(), user, kind);
        Ok(entries)
    }
}

impl HistoryStore for FsHistoryStore {
    fn save<'a>(
        &'a self,
        user: &'a str,
        kind: &'a str,
        job: &'a BatchJob,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.write_job(user, kind, job))
    }

    fn list<'a>(
        &'a self,
        user: &'a str,
        kind: &'a str,
    ) -> BoxFuture<'a, Result<Vec<HistoryEntry>>> {
        Box::pin(self.list_entries(user, kind))
    }
}
