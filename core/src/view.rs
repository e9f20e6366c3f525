use core::fmt;
use serde::{Deserialize, Serialize};

use crate::*;

/// Requests the core issues to the presentation layer.
///
/// The host maps each command onto its own widgets and animations.
/// `Timer` and `Animate` are the two suspension points: the host reports
/// completion back through [`Game::timer_fired`] and
/// [`Game::move_animated`] together with the carried epoch, and the
/// session drops any report whose epoch a reset has invalidated in the
/// meantime.
///
/// [`Game::timer_fired`]: crate::Game::timer_fired
/// [`Game::move_animated`]: crate::Game::move_animated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ViewCmd {
    /// Turn a card face up, showing `face`.
    Show { slot: SlotIx, face: SlotFace },
    /// Turn a card face down.
    Conceal { slot: SlotIx },
    /// Animate one shuffle move within the given duration budget.
    Animate {
        mv: ShuffleMove,
        duration: Millis,
        epoch: Epoch,
    },
    /// Call back once the delay has elapsed.
    Timer { delay: Millis, epoch: Epoch },
    Status(StatusLine),
    Score(u32),
    Attempts(u8),
    Round(u8),
    Controls { enabled: bool },
    /// Fire the celebration effect; only sent for a high-scoring finish.
    Celebrate,
}

/// Player-facing status messages. The host decides where they go; the
/// `Display` impl carries the stock prose.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StatusLine {
    Watch,
    Guess,
    TryAgain { attempts_left: u8, next_worth: u32 },
    RoundWon { points: u32, final_round: bool },
    OutOfAttempts,
    GameOver { score: u32, summary: Summary },
    Reset,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use StatusLine::*;

        match *self {
            Watch => write!(f, "Watch carefully where the unicorn appears!"),
            Guess => write!(f, "Where is the unicorn? Click a card to guess!"),
            TryAgain {
                attempts_left,
                next_worth,
            } => write!(
                f,
                "Try again! {attempts_left} attempts left. Next correct guess worth {next_worth} points."
            ),
            RoundWon {
                points,
                final_round: true,
            } => write!(f, "You found the unicorn! +{points} points! Final round complete!"),
            RoundWon {
                points,
                final_round: false,
            } => write!(
                f,
                "You found the unicorn! +{points} points! Get ready for the next round!"
            ),
            OutOfAttempts => write!(f, "No more attempts left for this round!"),
            GameOver { score, summary } => {
                write!(f, "Game over! Final score: {score} points. ")?;
                match summary {
                    Summary::Master => write!(f, "Amazing! You're a unicorn monte master!"),
                    Summary::Improving => write!(f, "Great job! You're getting better!"),
                    Summary::KeepTrying => {
                        write!(f, "Good try! Play again to improve your score!")
                    }
                }
            }
            Reset => write!(f, "Game reset. Press start to play!"),
        }
    }
}
