//! Mapping store
//!
//! Persists the card code -> playback target table as a JSON object whose
//! values are either a single path string or an array of path strings:
//!
//! ```json
//! {
//!   "1122334455": "/music/song.mp3",
//!   "9988776655": ["/music/a.mp3", "/music/b.mp3"]
//! }
//! ```
//!
//! The table is re-read from disk on every lookup, so editing the file by
//! hand takes effect without restarting the jukebox.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// What a card code resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaybackTarget {
    /// One track
    Single(String),
    /// An ordered multi-track sequence
    Sequence(Vec<String>),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mapping store not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read mapping store: {0}")]
    Io(#[from] io::Error),
    #[error("mapping store is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// File-backed card code -> playback target table
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a card code against the persisted table.
    ///
    /// A missing or unreadable store is treated as "no mapping" (logged,
    /// never fatal - losing the store file must not crash the control loop).
    /// An empty stored sequence also counts as no mapping.
    pub async fn lookup(&self, code: &str) -> Option<PlaybackTarget> {
        let mut table = match self.read_table().await {
            Ok(table) => table,
            Err(e) => {
                warn!("Mapping store lookup failed, treating card as unmapped: {e}");
                return None;
            }
        };

        match table.remove(code) {
            Some(PlaybackTarget::Sequence(paths)) if paths.is_empty() => {
                debug!("Card {} maps to an empty sequence, ignoring", code);
                None
            }
            target => target,
        }
    }

    /// Bind a card code to a single track, persisting immediately.
    ///
    /// Last write wins: any previous mapping for the code, sequence or not,
    /// is replaced wholesale. A missing store file starts an empty table; an
    /// unreadable one is an error (overwriting it would destroy mappings).
    pub async fn upsert(&self, code: &str, track_path: &str) -> Result<()> {
        let mut table = match self.read_table().await {
            Ok(table) => table,
            Err(StoreError::NotFound(_)) => HashMap::new(),
            Err(e) => {
                return Err(e).context("refusing to overwrite unreadable mapping store");
            }
        };

        table.insert(
            code.to_string(),
            PlaybackTarget::Single(track_path.to_string()),
        );

        let json = serde_json::to_string_pretty(&table)
            .context("failed to serialize mapping table")?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to write mapping store {}", self.path.display()))?;

        Ok(())
    }

    async fn read_table(&self) -> Result<HashMap<String, PlaybackTarget>, StoreError> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> MappingStore {
        MappingStore::new(dir.path().join("jukebox.json"))
    }

    #[tokio::test]
    async fn upsert_then_lookup_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.upsert("12345", "/music/a.mp3").await.unwrap();

        assert_eq!(
            store.lookup("12345").await,
            Some(PlaybackTarget::Single("/music/a.mp3".to_string()))
        );
    }

    #[tokio::test]
    async fn upsert_replaces_a_stored_sequence() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(
            store.path(),
            r#"{"777": ["/music/a.mp3", "/music/b.mp3"]}"#,
        )
        .unwrap();

        store.upsert("777", "/music/solo.mp3").await.unwrap();

        assert_eq!(
            store.lookup("777").await,
            Some(PlaybackTarget::Single("/music/solo.mp3".to_string()))
        );
    }

    #[tokio::test]
    async fn sequence_values_deserialize_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), r#"{"42": ["/a.mp3", "/b.mp3", "/c.mp3"]}"#).unwrap();

        assert_eq!(
            store.lookup("42").await,
            Some(PlaybackTarget::Sequence(vec![
                "/a.mp3".to_string(),
                "/b.mp3".to_string(),
                "/c.mp3".to_string(),
            ]))
        );
    }

    #[tokio::test]
    async fn missing_store_looks_up_as_unmapped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.lookup("12345").await, None);
    }

    #[tokio::test]
    async fn corrupt_store_looks_up_as_unmapped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), "not json {{{").unwrap();

        assert_eq!(store.lookup("12345").await, None);
    }

    #[tokio::test]
    async fn empty_sequence_counts_as_no_mapping() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), r#"{"555": []}"#).unwrap();

        assert_eq!(store.lookup("555").await, None);
    }

    #[tokio::test]
    async fn unknown_code_is_unmapped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.upsert("111", "/music/a.mp3").await.unwrap();

        assert_eq!(store.lookup("222").await, None);
    }

    #[tokio::test]
    async fn upsert_refuses_to_clobber_corrupt_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), "not json {{{").unwrap();

        assert!(store.upsert("111", "/music/a.mp3").await.is_err());
        // The broken file is left untouched for manual repair
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "not json {{{");
    }

    #[tokio::test]
    async fn upsert_preserves_other_entries() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.upsert("111", "/music/a.mp3").await.unwrap();
        store.upsert("222", "/music/b.mp3").await.unwrap();

        assert_eq!(
            store.lookup("111").await,
            Some(PlaybackTarget::Single("/music/a.mp3".to_string()))
        );
        assert_eq!(
            store.lookup("222").await,
            Some(PlaybackTarget::Single("/music/b.mp3".to_string()))
        );
    }
}
