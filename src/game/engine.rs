//! Game engine — phase lifecycle and the round state machine.
//!
//! Every operation here is a pure state transition: it runs under the
//! conversation's session lock, mutates the session, and returns the
//! [`Effect`]s to perform. The driver executes effects after the lock is
//! dropped, so a slow gateway call can at worst reorder two outbound
//! messages; it can never double-apply a transition.

use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use crate::channels::{Action, Control, UserId, UserRef};
use crate::content::PromptKind;
use crate::error::GameError;
use crate::game::rotation;
use crate::game::session::{Phase, Player, Round, Session};

/// Deferred outside-world work decided by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Post the join invitation. The driver remembers the resulting
    /// message handle on the session.
    Invite {
        session_id: Uuid,
        text: String,
        controls: Vec<Control>,
    },
    /// Render a message into the conversation.
    Reply { text: String, controls: Vec<Control> },
    /// Ephemeral acknowledgment to the acting user.
    Ack { text: String },
    /// Fetch a prompt of `kind` from the content provider and render it
    /// for the player on stage.
    ServePrompt {
        kind: PromptKind,
        player_name: String,
        offer_switch: bool,
    },
    /// Arm the one-shot join-window timer for this session.
    ScheduleJoinWindow { session_id: Uuid },
    /// The session is over; remove it from the store.
    SessionOver,
}

impl Effect {
    pub(crate) fn reply(text: impl Into<String>) -> Self {
        Self::Reply {
            text: text.into(),
            controls: Vec::new(),
        }
    }

    pub(crate) fn ack(text: impl Into<String>) -> Self {
        Self::Ack { text: text.into() }
    }
}

/// Effects for a freshly created session: the join invitation plus the
/// join-window timer.
pub fn open_effects(session_id: Uuid, starter_name: &str, join_window: Duration) -> Vec<Effect> {
    vec![
        Effect::Invite {
            session_id,
            text: format!(
                "🎭 {starter_name} started a game of Truth or Dare!\n\
                 Tap Join — signups close in {}s.",
                join_window.as_secs()
            ),
            controls: vec![Control::new("🙋 Join", Action::Join)],
        },
        Effect::ScheduleJoinWindow { session_id },
    ]
}

/// A user asked to join. Idempotent: re-joining acknowledges without
/// adding a second entry.
pub fn join(session: &mut Session, user: &UserRef) -> Result<Vec<Effect>, GameError> {
    match session.phase {
        Phase::Collecting | Phase::WaitingToStart => {
            if session.participants.contains_key(&user.id) {
                return Ok(vec![Effect::ack("You're already on the list.")]);
            }
            session
                .participants
                .insert(user.id.clone(), Player::from(user));
            Ok(vec![Effect::ack("You're in! 🎉")])
        }
        Phase::Running => {
            if session.participants.contains_key(&user.id) {
                return Ok(vec![Effect::ack("You're already in the game.")]);
            }
            // The rotation pool froze at game start; mid-game joiners
            // spectate until someone opens a new game.
            session
                .participants
                .insert(user.id.clone(), Player::from(user));
            Ok(vec![Effect::ack(
                "This round's lineup is locked — you're watching this one.",
            )])
        }
        Phase::Ended => Err(GameError::NoActiveSession),
    }
}

/// Someone pressed Begin on the roster message.
pub fn begin<R: Rng>(session: &mut Session, rng: &mut R) -> Result<Vec<Effect>, GameError> {
    match session.phase {
        Phase::WaitingToStart => {
            if session.participants.is_empty() {
                // Closes the session instead of erroring upward.
                session.phase = Phase::Ended;
                return Ok(vec![
                    Effect::reply("😕 Nobody joined, so there's no game to start."),
                    Effect::SessionOver,
                ]);
            }

            session.phase = Phase::Running;
            // The turn rotation is drawn from whoever is on the roster
            // right now; this set does not change for the session's life.
            session.rotation_pool = session.participants.keys().cloned().collect();
            session.remaining = session.rotation_pool.clone();

            let mut effects = vec![Effect::reply(format!(
                "🎬 Game on — {} playing!",
                session.participants.len()
            ))];
            effects.extend(rotation::start_new_turn(session, rng));
            Ok(effects)
        }
        Phase::Collecting => Ok(vec![Effect::ack("Hold on, signups are still open.")]),
        // A second Begin raced the first and lost; nothing to do.
        Phase::Running => Ok(Vec::new()),
        Phase::Ended => Err(GameError::NoActiveSession),
    }
}

/// The player on stage picked Truth or Dare.
pub fn choose(
    session: &mut Session,
    user_id: &UserId,
    kind: PromptKind,
) -> Result<Vec<Effect>, GameError> {
    {
        let round = round_mut(session, user_id)?;
        if round.choice.is_some() {
            // A stale Truth/Dare button after the pick already landed.
            return Ok(vec![Effect::ack(
                "You already picked — switch or pass the turn.",
            )]);
        }
        round.choice = Some(kind);
        round.switched = false;
    }

    Ok(vec![Effect::ServePrompt {
        kind,
        player_name: session.display_name(user_id),
        offer_switch: true,
    }])
}

/// The player on stage switched to the other flavor. Allowed once per
/// round.
pub fn switch(
    session: &mut Session,
    user_id: &UserId,
    kind: PromptKind,
) -> Result<Vec<Effect>, GameError> {
    {
        let round = round_mut(session, user_id)?;
        if round.choice.is_none() {
            return Ok(vec![Effect::ack("Pick truth or dare first.")]);
        }
        if round.switched {
            return Err(GameError::AlreadySwitched);
        }
        round.choice = Some(kind);
        round.switched = true;
    }

    Ok(vec![Effect::ServePrompt {
        kind,
        player_name: session.display_name(user_id),
        offer_switch: false,
    }])
}

/// The player on stage handed the turn over. Discards the round and
/// draws the next player.
pub fn advance<R: Rng>(
    session: &mut Session,
    user_id: &UserId,
    rng: &mut R,
) -> Result<Vec<Effect>, GameError> {
    round_mut(session, user_id)?;
    session.round = None;
    Ok(rotation::start_new_turn(session, rng))
}

/// The join-window timer fired.
///
/// The timer cannot be cancelled; this phase-and-identity re-check is the
/// cancellation mechanism. A fire against a later session or a phase that
/// already moved on is a no-op.
pub fn join_window_expired(session: &mut Session, timer_session: Uuid) -> Vec<Effect> {
    if session.id != timer_session || session.phase != Phase::Collecting {
        return Vec::new();
    }

    if session.participants.is_empty() {
        session.phase = Phase::Ended;
        return vec![
            Effect::reply("😴 Nobody joined — game's off. Say \"truth or dare\" to try again."),
            Effect::SessionOver,
        ];
    }

    session.phase = Phase::WaitingToStart;
    vec![Effect::Reply {
        text: format!(
            "⏰ Signups are closed! Playing:\n{}\n\nHit Begin when everyone's ready.",
            session.roster()
        ),
        controls: vec![Control::new("▶️ Begin", Action::Begin)],
    }]
}

/// Guard shared by the round events: the game must be running, a round
/// must be open, and the actor must be the player on stage. Rejections
/// leave the session untouched.
fn round_mut<'s>(session: &'s mut Session, user_id: &UserId) -> Result<&'s mut Round, GameError> {
    if session.phase != Phase::Running {
        return Err(GameError::NoActiveSession);
    }
    match session.round.as_mut() {
        Some(round) if round.player == *user_id => Ok(round),
        Some(_) => Err(GameError::NotYourTurn),
        None => Err(GameError::NoActiveSession),
    }
}
