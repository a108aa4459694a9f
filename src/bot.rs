//! Bot driver — routes inbound events to the game engine and trivia
//! pools, and executes the engine's effects.
//!
//! Each inbound event is handled on its own task; the session store's
//! per-conversation lock is what serializes racing actions. Effects run
//! after the lock is released, so gateway latency never extends the
//! critical section.

use std::sync::Arc;

use futures::StreamExt;
use rand::thread_rng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channels::{Action, ChatId, Control, EventPayload, Gateway, UserEvent};
use crate::config::BotConfig;
use crate::content::{ContentProvider, PromptKind};
use crate::error::GameError;
use crate::game::{Effect, SessionStore, engine};
use crate::stats::Stats;
use crate::trivia::Trivia;

pub struct Bot {
    gateway: Arc<dyn Gateway>,
    store: SessionStore,
    provider: Arc<dyn ContentProvider>,
    trivia: Trivia,
    stats: Arc<Stats>,
    config: BotConfig,
}

impl Bot {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        provider: Arc<dyn ContentProvider>,
        trivia: Trivia,
        stats: Arc<Stats>,
        config: BotConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            store: SessionStore::new(),
            provider,
            trivia,
            stats,
            config,
        })
    }

    /// Run the event loop until the gateway stream closes.
    pub async fn run(self: Arc<Self>) -> crate::error::Result<()> {
        let mut events = self.gateway.start().await?;
        info!(channel = self.gateway.name(), "Bot running");

        while let Some(event) = events.next().await {
            tokio::spawn(handle_event(Arc::clone(&self), event));
        }

        self.gateway.shutdown().await?;
        Ok(())
    }
}

async fn handle_event(bot: Arc<Bot>, event: UserEvent) {
    bot.stats.record(&event).await;
    match event.payload.clone() {
        EventPayload::Text(text) => handle_text(&bot, &event, &text).await,
        EventPayload::Action { action, .. } => handle_action(&bot, &event, action).await,
    }
}

async fn handle_text(bot: &Arc<Bot>, event: &UserEvent, text: &str) {
    let keyword = normalize(text);

    if is_start_phrase(&keyword) {
        open_session(bot, event).await;
        return;
    }

    if let Some(reply) = bot.trivia.handle(&event.chat, &keyword).await {
        if let Err(e) = bot.gateway.send(&event.chat, &reply, &[]).await {
            error!(chat = %event.chat, error = %e, "Failed to deliver trivia reply");
        }
    }
}

/// The game-start phrase: create a session and post the join invitation.
async fn open_session(bot: &Arc<Bot>, event: &UserEvent) {
    match bot.store.create(&event.chat, &event.user.id).await {
        Ok(session_id) => {
            info!(
                chat = %event.chat,
                session_id = %session_id,
                starter = %event.user.id,
                "Game opened"
            );
            let effects =
                engine::open_effects(session_id, &event.user.display_name, bot.config.join_window);
            dispatch(bot, &event.chat, Some(event), effects).await;
        }
        Err(err) => reject(bot, event, err).await,
    }
}

async fn handle_action(bot: &Arc<Bot>, event: &UserEvent, action: Action) {
    let user = event.user.clone();
    let result = bot
        .store
        .with_session(&event.chat, |session| match action {
            Action::Join => engine::join(session, &user),
            Action::Begin => engine::begin(session, &mut thread_rng()),
            Action::Choose(kind) => engine::choose(session, &user.id, kind),
            Action::Switch(kind) => engine::switch(session, &user.id, kind),
            Action::Advance => engine::advance(session, &user.id, &mut thread_rng()),
        })
        .await;

    match result {
        Ok(effects) => {
            let acked = dispatch(bot, &event.chat, Some(event), effects).await;
            if !acked {
                // Clear the pending button press even when the
                // transition had nothing to say.
                let _ = bot.gateway.ack(event, "").await;
            }
        }
        Err(err) => reject(bot, event, err).await,
    }
}

/// Turn a game error into the ephemeral rejection toast.
async fn reject(bot: &Bot, event: &UserEvent, err: GameError) {
    debug!(chat = %event.chat, user = %event.user.id, error = %err, "Action rejected");
    if let Err(e) = bot.gateway.ack(event, &err.to_string()).await {
        warn!(chat = %event.chat, error = %e, "Failed to deliver rejection");
    }
}

/// Execute engine effects, in order. Returns whether an ack went out.
///
/// Transitions are already committed by the time effects run; a delivery
/// failure here is logged and swallowed, never rolled back into session
/// state.
async fn dispatch(
    bot: &Arc<Bot>,
    chat: &ChatId,
    source: Option<&UserEvent>,
    effects: Vec<Effect>,
) -> bool {
    let mut acked = false;
    for effect in effects {
        match effect {
            Effect::Invite {
                session_id,
                text,
                controls,
            } => match bot.gateway.send(chat, &text, &controls).await {
                Ok(handle) => {
                    let _ = bot
                        .store
                        .with_session(chat, |s| {
                            if s.id == session_id {
                                s.join_prompt = Some(handle.clone());
                            }
                            Ok(())
                        })
                        .await;
                }
                Err(e) => {
                    error!(chat = %chat, error = %e, "Failed to deliver join invitation")
                }
            },
            Effect::Reply { text, controls } => {
                if let Err(e) = bot.gateway.send(chat, &text, &controls).await {
                    error!(chat = %chat, error = %e, "Failed to deliver game message");
                }
            }
            Effect::Ack { text } => {
                acked = true;
                if let Some(event) = source {
                    if let Err(e) = bot.gateway.ack(event, &text).await {
                        warn!(chat = %chat, error = %e, "Failed to deliver ack");
                    }
                }
            }
            Effect::ServePrompt {
                kind,
                player_name,
                offer_switch,
            } => serve_prompt(bot, chat, kind, &player_name, offer_switch).await,
            Effect::ScheduleJoinWindow { session_id } => {
                spawn_join_timer(bot, chat.clone(), session_id);
            }
            Effect::SessionOver => {
                bot.store.clear(chat).await;
            }
        }
    }
    acked
}

async fn serve_prompt(
    bot: &Bot,
    chat: &ChatId,
    kind: PromptKind,
    player_name: &str,
    offer_switch: bool,
) {
    let text = match bot.provider.next(kind).await {
        Ok(prompt) => format!(
            "{} {} for {player_name}:\n{prompt}",
            kind_emoji(kind),
            kind.label()
        ),
        Err(e) => {
            error!(chat = %chat, kind = %kind, error = %e, "Content provider failed");
            format!("⚠️ The {kind} pool came up empty. {player_name}, improvise!")
        }
    };

    let mut controls = Vec::new();
    if offer_switch {
        let other = kind.opposite();
        controls.push(Control::new(
            format!("🔁 Switch to {}", other.label()),
            Action::Switch(other),
        ));
    }
    controls.push(Control::new("➡️ Next player", Action::Advance));

    if let Err(e) = bot.gateway.send(chat, &text, &controls).await {
        error!(chat = %chat, error = %e, "Failed to deliver prompt");
    }
}

/// Arm the one-shot join-window timer. There is no cancellation handle:
/// the engine's phase-and-identity re-check makes a stale fire harmless.
fn spawn_join_timer(bot: &Arc<Bot>, chat: ChatId, session_id: Uuid) {
    let bot = Arc::clone(bot);
    tokio::spawn(async move {
        tokio::time::sleep(bot.config.join_window).await;

        let result = bot
            .store
            .with_session(&chat, |s| Ok(engine::join_window_expired(s, session_id)))
            .await;

        match result {
            Ok(effects) => {
                dispatch(&bot, &chat, None, effects).await;
            }
            Err(GameError::NoActiveSession) => {
                debug!(chat = %chat, session_id = %session_id, "Join timer fired after session ended");
            }
            Err(e) => warn!(chat = %chat, error = %e, "Join timer failed"),
        }
    });
}

fn kind_emoji(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Truth => "💬",
        PromptKind::Dare => "🔥",
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn is_start_phrase(keyword: &str) -> bool {
    matches!(keyword, "truth or dare" | "/truthordare" | "tod" | "/tod")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Truth OR Dare \n"), "truth or dare");
    }

    #[test]
    fn start_phrase_variants() {
        assert!(is_start_phrase("truth or dare"));
        assert!(is_start_phrase("/tod"));
        assert!(!is_start_phrase("truth"));
        assert!(!is_start_phrase("dare"));
    }

    #[test]
    fn prompt_emojis() {
        assert_eq!(kind_emoji(PromptKind::Truth), "💬");
        assert_eq!(kind_emoji(PromptKind::Dare), "🔥");
    }
}
