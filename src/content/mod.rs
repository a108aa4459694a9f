//! Prompt content: file-backed pools with no-repeat rotation.

pub mod pool;
pub mod provider;

pub use pool::RotatingPool;
pub use provider::FilePoolProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// The two prompt flavors a player can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Truth,
    Dare,
}

impl PromptKind {
    /// The other flavor, for the mid-round switch.
    pub fn opposite(self) -> Self {
        match self {
            Self::Truth => Self::Dare,
            Self::Dare => Self::Truth,
        }
    }

    /// Capitalized label for rendered messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Truth => "Truth",
            Self::Dare => "Dare",
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Truth => "truth",
            Self::Dare => "dare",
        };
        write!(f, "{s}")
    }
}

/// Supplies prompt text of a requested kind, drawn without replacement
/// until the pool is exhausted, then the pool resets.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn next(&self, kind: PromptKind) -> Result<String, ContentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_flips() {
        assert_eq!(PromptKind::Truth.opposite(), PromptKind::Dare);
        assert_eq!(PromptKind::Dare.opposite(), PromptKind::Truth);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(PromptKind::Truth.to_string(), "truth");
        assert_eq!(PromptKind::Dare.label(), "Dare");
    }
}
