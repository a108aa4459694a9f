//! Turn scheduler — no-repeat-until-exhausted player rotation.

use rand::Rng;

use crate::channels::{Action, Control};
use crate::content::PromptKind;
use crate::game::engine::Effect;
use crate::game::session::{Phase, Round, Session};

/// Start the next turn: draw a player from the rotation, open their round,
/// and render the Truth/Dare choice.
///
/// The rotation refills from the pool frozen at `Running` entry, only when
/// it has been fully drained. Every pool member gets exactly one turn per
/// cycle before anyone repeats.
pub fn start_new_turn<R: Rng>(session: &mut Session, rng: &mut R) -> Vec<Effect> {
    if session.phase != Phase::Running {
        return Vec::new();
    }

    if session.participants.is_empty() {
        session.phase = Phase::Ended;
        session.round = None;
        return vec![
            Effect::reply("Everyone's gone, so that's the game. 👋"),
            Effect::SessionOver,
        ];
    }

    if session.remaining.is_empty() {
        // Reshuffle boundary: a new cycle over the frozen pool.
        session.remaining = session.rotation_pool.clone();
    }

    if session.remaining.is_empty() {
        // A running session whose pool was never seeded has nobody to draw.
        session.phase = Phase::Ended;
        session.round = None;
        return vec![
            Effect::reply("No players in the lineup, closing the game."),
            Effect::SessionOver,
        ];
    }

    let idx = rng.gen_range(0..session.remaining.len());
    let player = session.remaining.swap_remove(idx);
    session.round = Some(Round::new(player.clone()));

    let name = session.display_name(&player);
    vec![Effect::Reply {
        text: format!("🎲 {name} — Truth or Dare?"),
        controls: vec![
            Control::new("💬 Truth", Action::Choose(PromptKind::Truth)),
            Control::new("🔥 Dare", Action::Choose(PromptKind::Dare)),
        ],
    }]
}
