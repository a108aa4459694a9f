//! Session state for one Truth-or-Dare game.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::channels::{MessageHandle, UserId, UserRef};
use crate::content::PromptKind;

/// Coarse lifecycle stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Join window is open.
    Collecting,
    /// Roster is posted, waiting for someone to press Begin.
    WaitingToStart,
    /// Rounds are being played.
    Running,
    /// Terminal. The start phrase may create a fresh session.
    Ended,
}

impl Phase {
    /// A session in an active phase blocks creation of a new one.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Collecting => "collecting",
            Self::WaitingToStart => "waiting_to_start",
            Self::Running => "running",
            Self::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

/// A player who joined the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: UserId,
    pub display_name: String,
    pub handle: Option<String>,
}

impl From<&UserRef> for Player {
    fn from(user: &UserRef) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            handle: user.handle.clone(),
        }
    }
}

/// Sub-state for the player currently on stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub player: UserId,
    /// The flavor in effect, unset until the first pick of the round.
    pub choice: Option<PromptKind>,
    /// Flips to true on the one allowed switch, reset each round.
    pub switched: bool,
}

impl Round {
    pub fn new(player: UserId) -> Self {
        Self {
            player,
            choice: None,
            switched: false,
        }
    }
}

/// Full mutable state of one game, scoped to a conversation.
///
/// Exactly one non-`Ended` session may exist per conversation; the store
/// enforces that, and serializes every mutation behind a per-conversation
/// lock.
#[derive(Debug)]
pub struct Session {
    /// Identity for log fields and for guarding stale timer fires.
    pub id: Uuid,
    pub phase: Phase,
    /// Who opened the session. Informational only.
    pub starter: UserId,
    pub participants: HashMap<UserId, Player>,
    /// The turn rotation pool, frozen when the game enters `Running`.
    /// Later joiners spectate; refills draw from this set, not from
    /// `participants`.
    pub rotation_pool: Vec<UserId>,
    /// Players not yet drawn in the current rotation cycle.
    pub remaining: Vec<UserId>,
    pub round: Option<Round>,
    /// Handle of the join-invitation message.
    pub join_prompt: Option<MessageHandle>,
}

impl Session {
    /// Open a session in the join-collecting phase.
    pub fn new(starter: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Phase::Collecting,
            starter,
            participants: HashMap::new(),
            rotation_pool: Vec::new(),
            remaining: Vec::new(),
            round: None,
            join_prompt: None,
        }
    }

    /// Identity of the player currently on stage, if a round is active.
    pub fn current_player(&self) -> Option<&UserId> {
        self.round.as_ref().map(|r| &r.player)
    }

    /// Display name for a participant, falling back to the raw id for
    /// identities that left no roster entry.
    pub fn display_name(&self, id: &UserId) -> String {
        self.participants
            .get(id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| id.clone())
    }

    /// Roster as bullet lines, sorted for stable output.
    pub fn roster(&self) -> String {
        let mut names: Vec<&str> = self
            .participants
            .values()
            .map(|p| p.display_name.as_str())
            .collect();
        names.sort_unstable();
        names
            .iter()
            .map(|n| format!("• {n}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
