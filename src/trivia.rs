//! Trivia keyword games — the lightweight prompts outside the session
//! engine: icebreakers, riddles, would-you-rather, crime stories, facts.
//!
//! Each pool rotates without repeats. Riddles and crimes park their
//! answer per conversation until someone asks for the reveal.

use std::collections::HashMap;
use std::path::Path;

use tokio::sync::RwLock;
use tracing::warn;

use crate::channels::ChatId;
use crate::content::RotatingPool;
use crate::error::ContentError;

pub const GAMES_HELP: &str = "🎮 Games in this bot:\n\n\
• truth or dare — multiplayer party game\n\
• icebreaker — a question to get people talking\n\
• riddle — general knowledge (say \"answer\" to reveal)\n\
• either — would-you-rather dilemmas\n\
• who — who in the group...?\n\
• crime — a mystery story (say \"solve\" for the solution)\n\
• fact — a random fact\n\n\
Say \"games\" any time to see this list.";

const ICEBREAKER_FALLBACK: &[&str] = &[
    "What's a hobby you could talk about for an hour?",
    "What's the best meal you've had this year?",
];

const RIDDLE_FALLBACK: &[&str] = &[
    "What is the capital of France?|Paris",
    "Which planet is known as the red planet?|Mars",
];

const EITHER_FALLBACK: &[&str] = &[
    "Would you rather be rich and unknown, or famous and broke?",
    "Would you rather never use a phone again, or never watch a screen again?",
];

const WHO_FALLBACK: &[&str] = &[
    "Who in this group is most likely to be late to their own wedding?",
    "Who in this group gives the best advice?",
];

const CRIME_FALLBACK: &[&str] = &[
    "A man was found in a locked room with no windows.|He died of a heart attack.",
];

const FACT_FALLBACK: &[&str] = &[
    "Honey never spoils.",
    "Octopuses have three hearts.",
];

/// Per-conversation reveal state for the two-step games.
#[derive(Default)]
struct PendingReveals {
    riddle: Option<(String, String)>,
    crime_solution: Option<String>,
}

/// The trivia pools plus per-conversation reveal bookkeeping.
pub struct Trivia {
    icebreakers: RotatingPool,
    riddles: RotatingPool,
    either: RotatingPool,
    who: RotatingPool,
    crimes: RotatingPool,
    facts: RotatingPool,
    pending: RwLock<HashMap<ChatId, PendingReveals>>,
}

impl Trivia {
    /// Load every pool from the content directory, with built-in
    /// fallbacks for anything missing.
    pub async fn load(dir: &Path) -> Result<Self, ContentError> {
        let pool = |name: &'static str, fallback: &'static [&'static str]| {
            let file = dir.join(format!("{name}.txt"));
            let used = dir.join(format!("used_{name}.txt"));
            async move { RotatingPool::load(name, &file, &used, fallback).await }
        };

        Ok(Self {
            icebreakers: pool("icebreakers", ICEBREAKER_FALLBACK).await?,
            riddles: pool("riddles", RIDDLE_FALLBACK).await?,
            either: pool("either", EITHER_FALLBACK).await?,
            who: pool("who", WHO_FALLBACK).await?,
            crimes: pool("crimes", CRIME_FALLBACK).await?,
            facts: pool("facts", FACT_FALLBACK).await?,
            pending: RwLock::new(HashMap::new()),
        })
    }

    /// Handle a normalized keyword. Returns the reply text when it
    /// matched one of the trivia games.
    pub async fn handle(&self, chat: &ChatId, keyword: &str) -> Option<String> {
        match keyword {
            "games" | "help" | "start" | "/start" | "/help" => Some(GAMES_HELP.to_string()),
            "icebreaker" => self.draw(&self.icebreakers).await,
            "either" => self.draw(&self.either).await,
            "who" => self.draw(&self.who).await,
            "fact" => self
                .draw(&self.facts)
                .await
                .map(|f| format!("🧠 Fact:\n{f}")),
            "riddle" => {
                let line = self.draw(&self.riddles).await?;
                match line.split_once('|') {
                    Some((q, a)) => {
                        let q = q.trim().to_string();
                        self.pending.write().await.entry(chat.clone()).or_default().riddle =
                            Some((q.clone(), a.trim().to_string()));
                        Some(format!("🧩 {q}"))
                    }
                    None => Some(line),
                }
            }
            "answer" => {
                let pending = self.pending.read().await;
                match pending.get(chat).and_then(|p| p.riddle.as_ref()) {
                    Some((q, a)) => Some(format!("🧩 {q}\n\nAnswer: {a}")),
                    None => Some("No riddle is waiting for an answer.".to_string()),
                }
            }
            "crime" => {
                let line = self.draw(&self.crimes).await?;
                match line.split_once('|') {
                    Some((story, solution)) => {
                        self.pending
                            .write()
                            .await
                            .entry(chat.clone())
                            .or_default()
                            .crime_solution = Some(solution.trim().to_string());
                        Some(format!("🕵️ {}", story.trim()))
                    }
                    None => Some(line),
                }
            }
            "solve" => {
                let pending = self.pending.read().await;
                match pending.get(chat).and_then(|p| p.crime_solution.as_ref()) {
                    Some(solution) => Some(format!("🔍 Solution:\n{solution}")),
                    None => Some("There's no crime to solve right now.".to_string()),
                }
            }
            _ => None,
        }
    }

    async fn draw(&self, pool: &RotatingPool) -> Option<String> {
        match pool.draw().await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Trivia draw failed");
                Some("That pool is empty right now.".to_string())
            }
        }
    }
}

impl std::fmt::Debug for Trivia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trivia")
            .field("icebreakers", &self.icebreakers.len())
            .field("riddles", &self.riddles.len())
            .finish_non_exhaustive()
    }
}
