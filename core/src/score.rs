use serde::{Deserialize, Serialize};

use crate::MAX_ATTEMPTS;

/// Points for finding the marker on the first guess.
pub const MAX_SCORE: u32 = 100;

/// Points awarded when the marker is found on 1-indexed attempt
/// `attempt`. Anything past the second try is worth nothing.
pub const fn score_for_attempt(attempt: u8) -> u32 {
    match attempt {
        1 => MAX_SCORE,
        2 => MAX_SCORE / 2,
        _ => 0,
    }
}

/// 1-indexed attempt number derived from the attempts still available
/// before the guess is taken.
pub const fn attempt_number(attempts_left: u8) -> u8 {
    (MAX_ATTEMPTS + 1).saturating_sub(attempts_left)
}

/// Tier of the end-of-game summary, picked from the final score.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Summary {
    Master,
    Improving,
    KeepTrying,
}

impl Summary {
    /// Score needed for the top-tier summary.
    pub const TOP_SCORE: u32 = 250;
    /// Score needed for the middle tier.
    pub const MID_SCORE: u32 = 150;

    pub const fn for_score(score: u32) -> Self {
        if score >= Self::TOP_SCORE {
            Self::Master
        } else if score >= Self::MID_SCORE {
            Self::Improving
        } else {
            Self::KeepTrying
        }
    }
}
