//! File-backed prompt provider for the Truth-or-Dare game.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::content::{ContentProvider, PromptKind, RotatingPool};
use crate::error::ContentError;

const TRUTH_FALLBACK: &[&str] = &[
    "What's the most embarrassing thing you've done in front of a stranger?",
    "What's a secret talent nobody in this chat knows about?",
    "Who in this group would you trade lives with for a week?",
];

const DARE_FALLBACK: &[&str] = &[
    "Send the last photo in your camera roll to the group.",
    "Write your next three messages without using the letter E.",
    "Set your profile picture to whatever the group picks for an hour.",
];

/// Truth and dare pools loaded from a content directory.
///
/// Layout matches the original file scheme: `truth.txt` / `dare.txt` with
/// served-entry history in `used_truth.txt` / `used_dare.txt` beside them.
pub struct FilePoolProvider {
    truth: RotatingPool,
    dare: RotatingPool,
}

impl FilePoolProvider {
    pub async fn load(dir: &Path) -> Result<Self, ContentError> {
        let truth = RotatingPool::load(
            "truth",
            &dir.join("truth.txt"),
            &dir.join("used_truth.txt"),
            TRUTH_FALLBACK,
        )
        .await?;
        let dare = RotatingPool::load(
            "dare",
            &dir.join("dare.txt"),
            &dir.join("used_dare.txt"),
            DARE_FALLBACK,
        )
        .await?;

        info!(
            truths = truth.len(),
            dares = dare.len(),
            "Prompt pools loaded"
        );

        Ok(Self { truth, dare })
    }
}

#[async_trait]
impl ContentProvider for FilePoolProvider {
    async fn next(&self, kind: PromptKind) -> Result<String, ContentError> {
        match kind {
            PromptKind::Truth => self.truth.draw().await,
            PromptKind::Dare => self.dare.draw().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("truth.txt"), "t1\nt2\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("dare.txt"), "d1\n")
            .await
            .unwrap();

        let provider = FilePoolProvider::load(dir.path()).await.unwrap();
        let t = provider.next(PromptKind::Truth).await.unwrap();
        assert!(t.starts_with('t'));
        assert_eq!(provider.next(PromptKind::Dare).await.unwrap(), "d1");
    }

    #[tokio::test]
    async fn empty_directory_uses_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilePoolProvider::load(dir.path()).await.unwrap();
        assert!(!provider.next(PromptKind::Truth).await.unwrap().is_empty());
        assert!(!provider.next(PromptKind::Dare).await.unwrap().is_empty());
    }
}
