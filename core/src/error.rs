use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Slot index out of range")]
    InvalidSlot,
    #[error("Unknown difficulty profile")]
    UnknownDifficulty,
    #[error("Shuffle needs at least one move")]
    EmptyShuffle,
    #[error("A shuffle move must name two distinct slots")]
    DegenerateMove,
}

pub type Result<T> = core::result::Result<T, GameError>;
