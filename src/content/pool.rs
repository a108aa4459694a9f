//! Rotating pool — random draws without repeats until exhausted.
//!
//! Entries come from a plain text file, one per line. Drawn entries are
//! remembered in a sibling used-file so rotation survives restarts; when
//! every entry has been served the history is cleared and the full pool
//! becomes eligible again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ContentError;

/// A no-repeat-until-exhausted pool of text entries.
pub struct RotatingPool {
    name: String,
    entries: Vec<String>,
    used: Mutex<HashSet<String>>,
    used_path: Option<PathBuf>,
}

impl RotatingPool {
    /// Build a pool from in-memory entries, with no used-file persistence.
    pub fn from_entries(name: impl Into<String>, entries: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entries,
            used: Mutex::new(HashSet::new()),
            used_path: None,
        }
    }

    /// Load a pool from `path`, with served-entry history in `used_path`.
    ///
    /// A missing or empty pool file falls back to `fallback` entries, the
    /// way the bot ships tiny built-in pools. A missing used-file just
    /// means nothing has been served yet.
    pub async fn load(
        name: impl Into<String>,
        path: &Path,
        used_path: &Path,
        fallback: &[&str],
    ) -> Result<Self, ContentError> {
        let name = name.into();

        let mut entries = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect::<Vec<_>>(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if entries.is_empty() {
            warn!(pool = %name, path = %path.display(), "Pool file missing or empty, using built-in entries");
            entries = fallback.iter().map(|s| s.to_string()).collect();
        }

        let used = match tokio::fs::read_to_string(used_path).await {
            Ok(raw) => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(pool = %name, entries = entries.len(), "Pool loaded");

        Ok(Self {
            name,
            entries,
            used: Mutex::new(used),
            used_path: Some(used_path.to_path_buf()),
        })
    }

    /// Number of entries in the pool (served or not).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw a random entry that has not been served this rotation.
    ///
    /// When the rotation is exhausted, the history resets (used-file
    /// truncated) and every entry becomes eligible again.
    pub async fn draw(&self) -> Result<String, ContentError> {
        if self.entries.is_empty() {
            return Err(ContentError::EmptyPool {
                name: self.name.clone(),
            });
        }

        let mut used = self.used.lock().await;

        let mut available: Vec<&String> =
            self.entries.iter().filter(|e| !used.contains(*e)).collect();

        if available.is_empty() {
            debug!(pool = %self.name, "Pool exhausted, resetting rotation");
            used.clear();
            if let Some(path) = &self.used_path {
                if let Err(e) = tokio::fs::write(path, b"").await {
                    warn!(pool = %self.name, error = %e, "Failed to truncate used-file");
                }
            }
            available = self.entries.iter().collect();
        }

        let picked = match available.choose(&mut rand::thread_rng()) {
            Some(entry) => (*entry).clone(),
            None => {
                return Err(ContentError::EmptyPool {
                    name: self.name.clone(),
                });
            }
        };

        used.insert(picked.clone());
        if let Some(path) = &self.used_path {
            if let Err(e) = append_line(path, &picked).await {
                warn!(pool = %self.name, error = %e, "Failed to record served entry");
            }
        }

        Ok(picked)
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(entries: &[&str]) -> RotatingPool {
        RotatingPool::from_entries("test", entries.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn empty_pool_errors() {
        let p = pool(&[]);
        assert!(matches!(
            p.draw().await,
            Err(ContentError::EmptyPool { .. })
        ));
    }

    #[tokio::test]
    async fn no_repeats_until_exhausted() {
        let p = pool(&["a", "b", "c"]);
        let mut seen = HashSet::new();
        for _ in 0..3 {
            assert!(seen.insert(p.draw().await.unwrap()));
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn exhausted_pool_resets() {
        let p = pool(&["a", "b"]);
        p.draw().await.unwrap();
        p.draw().await.unwrap();
        // Third draw starts a fresh rotation instead of failing.
        let third = p.draw().await.unwrap();
        assert!(third == "a" || third == "b");
    }

    #[tokio::test]
    async fn load_falls_back_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let p = RotatingPool::load(
            "fallback",
            &dir.path().join("missing.txt"),
            &dir.path().join("used_missing.txt"),
            &["built-in"],
        )
        .await
        .unwrap();
        assert_eq!(p.draw().await.unwrap(), "built-in");
    }

    #[tokio::test]
    async fn load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        tokio::fs::write(&path, "one\n\n  \ntwo\n").await.unwrap();

        let p = RotatingPool::load("blank", &path, &dir.path().join("used.txt"), &[])
            .await
            .unwrap();
        assert_eq!(p.len(), 2);
    }

    #[tokio::test]
    async fn used_file_persists_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        let used_path = dir.path().join("used.txt");
        tokio::fs::write(&path, "a\nb\n").await.unwrap();

        let p = RotatingPool::load("persist", &path, &used_path, &[])
            .await
            .unwrap();
        let first = p.draw().await.unwrap();

        // A fresh load sees the history and serves the other entry.
        let p2 = RotatingPool::load("persist", &path, &used_path, &[])
            .await
            .unwrap();
        let second = p2.draw().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn reset_truncates_used_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        let used_path = dir.path().join("used.txt");
        tokio::fs::write(&path, "only\n").await.unwrap();

        let p = RotatingPool::load("truncate", &path, &used_path, &[])
            .await
            .unwrap();
        p.draw().await.unwrap();
        assert!(!tokio::fs::read_to_string(&used_path)
            .await
            .unwrap()
            .is_empty());

        // Exhausted: the next draw clears the history file.
        p.draw().await.unwrap();
        let contents = tokio::fs::read_to_string(&used_path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
