use serde::{Deserialize, Serialize};

pub use engine::*;
pub use error::*;
pub use placement::*;
pub use score::*;
pub use session::*;
pub use shuffle::*;
pub use slot::*;
pub use types::*;
pub use view::*;

mod engine;
mod error;
mod placement;
mod score;
mod session;
mod shuffle;
mod slot;
mod types;
mod view;

/// Difficulty profile applied to a round when it starts. Immutable for
/// the round's duration; `card_spacing` only feeds the slot layout the
/// presentation draws.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    /// Animation budget for a single shuffle move, in milliseconds.
    pub shuffle_speed: Millis,
    /// Base number of shuffle moves per round.
    pub move_count: u8,
    /// Distance between neighboring card slots.
    pub card_spacing: f32,
    /// Cap on the extra moves added as rounds progress.
    pub extra_move_cap: u8,
}

impl Difficulty {
    pub const EASY: Difficulty = Difficulty::new_unchecked(600, 4, 90.0, 4);
    pub const NORMAL: Difficulty = Difficulty::new_unchecked(450, 6, 90.0, 8);
    pub const HARD: Difficulty = Difficulty::new_unchecked(300, 8, 110.0, 10);

    const fn new_unchecked(
        shuffle_speed: Millis,
        move_count: u8,
        card_spacing: f32,
        extra_move_cap: u8,
    ) -> Self {
        Self {
            shuffle_speed,
            move_count,
            card_spacing,
            extra_move_cap,
        }
    }

    pub fn new(
        shuffle_speed: Millis,
        move_count: u8,
        card_spacing: f32,
        extra_move_cap: u8,
    ) -> Self {
        Self::new_unchecked(
            shuffle_speed.clamp(50, 5_000),
            move_count.clamp(1, 32),
            card_spacing,
            extra_move_cap,
        )
    }

    /// Looks up a named profile from the difficulty selector.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "easy" => Ok(Self::EASY),
            "normal" => Ok(Self::NORMAL),
            "hard" => Ok(Self::HARD),
            _ => Err(GameError::UnknownDifficulty),
        }
    }

    /// Later rounds shuffle more, up to the profile cap.
    pub fn moves_for_round(&self, round: u8) -> u8 {
        self.move_count + (round * 2).min(self.extra_move_cap)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Round timing budgets in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pacing {
    /// Marker preview at round start.
    pub preview: Millis,
    /// Pause between concealing the cards and the first shuffle move.
    pub settle: Millis,
    /// Pause before the table is fully revealed once the round is
    /// decided.
    pub resolve: Millis,
    /// Pause before the next round starts on its own.
    pub advance: Millis,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            preview: 2_000,
            settle: 600,
            resolve: 1_500,
            advance: 2_000,
        }
    }
}
