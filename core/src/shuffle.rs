use rand::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Swap of two of the three slots; the slot left out stays put.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleMove {
    low: SlotIx,
    high: SlotIx,
}

impl ShuffleMove {
    /// Every distinct pair, the full move set a plan draws from.
    pub const ALL: [ShuffleMove; 3] = [
        ShuffleMove { low: 0, high: 1 },
        ShuffleMove { low: 0, high: 2 },
        ShuffleMove { low: 1, high: 2 },
    ];

    pub fn new(a: SlotIx, b: SlotIx) -> Result<Self> {
        if a >= SLOT_COUNT || b >= SLOT_COUNT {
            return Err(GameError::InvalidSlot);
        }
        if a == b {
            return Err(GameError::DegenerateMove);
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    pub const fn slots(self) -> (SlotIx, SlotIx) {
        (self.low, self.high)
    }

    pub const fn involves(self, ix: SlotIx) -> bool {
        self.low == ix || self.high == ix
    }

    /// Where the contents of slot `ix` end up after this move.
    pub const fn apply(self, ix: SlotIx) -> SlotIx {
        if ix == self.low {
            self.high
        } else if ix == self.high {
            self.low
        } else {
            ix
        }
    }
}

/// Ordered moves making up one round's shuffle. Invariant: no two
/// consecutive moves are the same pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleSequence {
    moves: SmallVec<[ShuffleMove; 16]>,
}

impl ShuffleSequence {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn get(&self, ix: usize) -> Option<ShuffleMove> {
        self.moves.get(ix).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ShuffleMove> + '_ {
        self.moves.iter().copied()
    }

    /// Net effect of the whole sequence: `permutation()[i]` is where the
    /// contents of slot `i` end up.
    pub fn permutation(&self) -> [SlotIx; 3] {
        let mut assignment = [0, 1, 2];
        for mv in self.iter() {
            assignment = assignment.map(|ix| mv.apply(ix));
        }
        assignment
    }

    fn last(&self) -> Option<ShuffleMove> {
        self.moves.last().copied()
    }

    fn push(&mut self, mv: ShuffleMove) {
        self.moves.push(mv);
    }
}

/// Whether a plan that leaves the marker on its starting slot is handed
/// back as-is or extended until the marker actually travelled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoopShuffle {
    Allow,
    Extend,
}

pub trait ShufflePlanner {
    fn plan(self, move_count: u8, marker: SlotIx) -> Result<ShuffleSequence>;
}

/// Draws moves uniformly from the pair set, never repeating the previous
/// pair twice in a row.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RandomShufflePlanner {
    seed: u64,
    noop: NoopShuffle,
}

impl RandomShufflePlanner {
    pub fn new(seed: u64, noop: NoopShuffle) -> Self {
        Self { seed, noop }
    }
}

impl ShufflePlanner for RandomShufflePlanner {
    fn plan(self, move_count: u8, marker: SlotIx) -> Result<ShuffleSequence> {
        if move_count == 0 {
            return Err(GameError::EmptyShuffle);
        }
        if marker >= SLOT_COUNT {
            return Err(GameError::InvalidSlot);
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut sequence = ShuffleSequence::default();
        let mut tracked = marker;

        for _ in 0..move_count {
            let mv = draw_move(&mut rng, sequence.last());
            tracked = mv.apply(tracked);
            sequence.push(mv);
        }

        if matches!(self.noop, NoopShuffle::Extend) && tracked == marker {
            let mv = displacing_move(&mut rng, sequence.last(), tracked);
            tracked = mv.apply(tracked);
            sequence.push(mv);
        }

        log::debug!(
            "planned {} moves, marker slot {} -> {}",
            sequence.len(),
            marker,
            tracked
        );
        Ok(sequence)
    }
}

/// Uniform draw that never repeats the previous pair.
fn draw_move(rng: &mut SmallRng, previous: Option<ShuffleMove>) -> ShuffleMove {
    match previous {
        None => ShuffleMove::ALL[rng.random_range(0..ShuffleMove::ALL.len())],
        Some(prev) => {
            let candidates: SmallVec<[ShuffleMove; 2]> = ShuffleMove::ALL
                .into_iter()
                .filter(|&mv| mv != prev)
                .collect();
            candidates[rng.random_range(0..candidates.len())]
        }
    }
}

/// A move that touches `tracked` without repeating the previous pair.
fn displacing_move(
    rng: &mut SmallRng,
    previous: Option<ShuffleMove>,
    tracked: SlotIx,
) -> ShuffleMove {
    let candidates: SmallVec<[ShuffleMove; 2]> = ShuffleMove::ALL
        .into_iter()
        .filter(|&mv| mv.involves(tracked) && Some(mv) != previous)
        .collect();
    candidates[rng.random_range(0..candidates.len())]
}

/// Replays a planned sequence one move at a time, tracking which physical
/// slot currently holds the marker. `current()` is the move under
/// animation; `complete_current()` applies its permutation and hands out
/// the next move, so move *k+1* never starts before *k* is reported done.
#[derive(Clone, Debug, PartialEq)]
pub struct ShuffleRun {
    sequence: ShuffleSequence,
    next: usize,
    marker: SlotIx,
}

impl ShuffleRun {
    pub fn new(sequence: ShuffleSequence, marker: SlotIx) -> Result<Self> {
        if marker >= SLOT_COUNT {
            return Err(GameError::InvalidSlot);
        }
        if sequence.is_empty() {
            return Err(GameError::EmptyShuffle);
        }
        Ok(Self {
            sequence,
            next: 0,
            marker,
        })
    }

    /// Slot the marker sits on given the moves applied so far.
    pub fn marker(&self) -> SlotIx {
        self.marker
    }

    pub fn finished(&self) -> bool {
        self.next >= self.sequence.len()
    }

    pub fn current(&self) -> Option<ShuffleMove> {
        self.sequence.get(self.next)
    }

    /// Marks the move under animation as finished, updates the marker
    /// bookkeeping and returns the next move, `None` once the run is done.
    pub fn complete_current(&mut self) -> Option<ShuffleMove> {
        let mv = self.sequence.get(self.next)?;
        self.marker = mv.apply(self.marker);
        self.next += 1;
        self.current()
    }
}
