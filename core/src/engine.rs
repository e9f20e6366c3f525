use serde::{Deserialize, Serialize};

use crate::*;

/// Lifecycle of a round.
///
/// ```text
/// Idle -> Revealing -> Concealed -> Shuffling -> AwaitingGuess
///      -> Resolving -> RoundComplete -> (Idle | GameComplete)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Revealing,
    Concealed,
    Shuffling,
    AwaitingGuess,
    Resolving,
    RoundComplete,
    GameComplete,
}

impl Phase {
    pub const fn accepts_guesses(self) -> bool {
        matches!(self, Self::AwaitingGuess)
    }

    pub const fn is_shuffling(self) -> bool {
        matches!(self, Self::Shuffling)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameComplete)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

/// How a finished round went.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Won,
    Lost,
}

/// What a single card click did to the round.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Click arrived in the wrong phase or re-hit a revealed card; dropped.
    Ignored,
    /// Marker found, round heads into `Resolving`.
    Hit { points: u32 },
    /// Wrong card, more attempts remain.
    Miss { attempts_left: u8 },
    /// Wrong card and that was the last attempt.
    Exhausted,
}

/// Drives one round from reveal to resolution. The session owns the
/// cumulative score and round advancement; everything here is scoped to
/// a single round's slots, marker and attempts.
#[derive(Clone, Debug, PartialEq)]
pub struct Round {
    number: u8,
    difficulty: Difficulty,
    pacing: Pacing,
    slots: [Slot; 3],
    marker: SlotIx,
    attempts_left: u8,
    guessed: [bool; 3],
    phase: Phase,
    run: Option<ShuffleRun>,
    outcome: Option<RoundOutcome>,
}

impl Round {
    pub fn new(number: u8, marker: SlotIx, difficulty: Difficulty, pacing: Pacing) -> Result<Self> {
        if marker >= SLOT_COUNT {
            return Err(GameError::InvalidSlot);
        }
        Ok(Self {
            number,
            difficulty,
            pacing,
            slots: Slot::row(difficulty.card_spacing),
            marker,
            attempts_left: MAX_ATTEMPTS,
            guessed: [false; 3],
            phase: Phase::Idle,
            run: None,
            outcome: None,
        })
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Slot hiding the marker right now, live during a shuffle.
    pub fn marker(&self) -> SlotIx {
        self.run.as_ref().map_or(self.marker, ShuffleRun::marker)
    }

    pub fn attempts_left(&self) -> u8 {
        self.attempts_left
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.outcome
    }

    pub fn slots(&self) -> &[Slot; 3] {
        &self.slots
    }

    /// Idle -> Revealing: give the player a full look at where the
    /// marker is. This is a deliberate preview, not a guess.
    pub fn begin(&mut self, epoch: Epoch, out: &mut Vec<ViewCmd>) {
        debug_assert!(matches!(self.phase, Phase::Idle));
        self.phase = Phase::Revealing;
        self.slots[self.marker as usize].face = SlotFace::Marker;
        for slot in &self.slots {
            out.push(ViewCmd::Conceal { slot: slot.index });
        }
        out.push(ViewCmd::Show {
            slot: self.marker,
            face: SlotFace::Marker,
        });
        out.push(ViewCmd::Attempts(self.attempts_left));
        out.push(ViewCmd::Status(StatusLine::Watch));
        out.push(ViewCmd::Timer {
            delay: self.pacing.preview,
            epoch,
        });
        log::debug!("round {} revealing marker at slot {}", self.number, self.marker);
    }

    /// Revealing -> Concealed: everything face down before the shuffle.
    pub fn conceal(&mut self, epoch: Epoch, out: &mut Vec<ViewCmd>) {
        self.phase = Phase::Concealed;
        for slot in &mut self.slots {
            slot.face = SlotFace::Hidden;
            out.push(ViewCmd::Conceal { slot: slot.index });
        }
        out.push(ViewCmd::Timer {
            delay: self.pacing.settle,
            epoch,
        });
    }

    /// Concealed -> Shuffling: plan the sequence and animate its first
    /// move.
    pub fn begin_shuffle(
        &mut self,
        planner: impl ShufflePlanner,
        epoch: Epoch,
        out: &mut Vec<ViewCmd>,
    ) -> Result<()> {
        let moves = self.difficulty.moves_for_round(self.number);
        let sequence = planner.plan(moves, self.marker)?;
        let run = ShuffleRun::new(sequence, self.marker)?;
        let first = run.current().expect("a planned sequence is never empty");
        self.run = Some(run);
        self.phase = Phase::Shuffling;
        out.push(ViewCmd::Animate {
            mv: first,
            duration: self.difficulty.shuffle_speed,
            epoch,
        });
        Ok(())
    }

    /// One move finished animating: apply the marker bookkeeping, then
    /// either start the next move or open the table for guesses. Returns
    /// whether the shuffle is over.
    pub fn move_done(&mut self, epoch: Epoch, out: &mut Vec<ViewCmd>) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        match run.complete_current() {
            Some(next) => {
                out.push(ViewCmd::Animate {
                    mv: next,
                    duration: self.difficulty.shuffle_speed,
                    epoch,
                });
                false
            }
            None => {
                self.marker = run.marker();
                self.run = None;
                self.phase = Phase::AwaitingGuess;
                out.push(ViewCmd::Status(StatusLine::Guess));
                log::debug!(
                    "round {} shuffled, marker now at slot {}",
                    self.number,
                    self.marker
                );
                true
            }
        }
    }

    /// Handles a card click. Anything that is not a fresh guess while
    /// guesses are open is dropped without touching round state.
    pub fn guess(&mut self, slot: SlotIx, epoch: Epoch, out: &mut Vec<ViewCmd>) -> GuessOutcome {
        if !self.phase.accepts_guesses() {
            log::debug!("guess for slot {} ignored in {:?}", slot, self.phase);
            return GuessOutcome::Ignored;
        }
        if slot >= SLOT_COUNT {
            log::warn!("guess for slot {} out of range", slot);
            return GuessOutcome::Ignored;
        }
        if self.guessed[slot as usize] {
            log::trace!("slot {} already revealed, click dropped", slot);
            return GuessOutcome::Ignored;
        }

        self.guessed[slot as usize] = true;
        let attempt = attempt_number(self.attempts_left);

        if slot == self.marker {
            let points = score_for_attempt(attempt);
            self.slots[slot as usize].face = SlotFace::Marker;
            out.push(ViewCmd::Show {
                slot,
                face: SlotFace::Marker,
            });
            self.outcome = Some(RoundOutcome::Won);
            self.phase = Phase::Resolving;
            out.push(ViewCmd::Timer {
                delay: self.pacing.resolve,
                epoch,
            });
            GuessOutcome::Hit { points }
        } else {
            self.slots[slot as usize].face = SlotFace::Miss;
            out.push(ViewCmd::Show {
                slot,
                face: SlotFace::Miss,
            });
            self.attempts_left -= 1;
            out.push(ViewCmd::Attempts(self.attempts_left));
            if self.attempts_left == 0 {
                self.outcome = Some(RoundOutcome::Lost);
                self.phase = Phase::Resolving;
                out.push(ViewCmd::Status(StatusLine::OutOfAttempts));
                out.push(ViewCmd::Timer {
                    delay: self.pacing.resolve,
                    epoch,
                });
                GuessOutcome::Exhausted
            } else {
                out.push(ViewCmd::Status(StatusLine::TryAgain {
                    attempts_left: self.attempts_left,
                    next_worth: score_for_attempt(attempt_number(self.attempts_left)),
                }));
                GuessOutcome::Miss {
                    attempts_left: self.attempts_left,
                }
            }
        }
    }

    /// Resolving -> RoundComplete: turn over whatever is still face
    /// down, which on a lost round includes the marker itself.
    pub fn resolve(&mut self, out: &mut Vec<ViewCmd>) -> RoundOutcome {
        self.phase = Phase::RoundComplete;
        for slot in &mut self.slots {
            if slot.face.is_revealed() {
                continue;
            }
            slot.face = if slot.index == self.marker {
                SlotFace::Marker
            } else {
                SlotFace::Miss
            };
            out.push(ViewCmd::Show {
                slot: slot.index,
                face: slot.face,
            });
        }
        self.outcome.unwrap_or(RoundOutcome::Lost)
    }

    #[cfg(test)]
    fn with_attempts(mut self, attempts_left: u8) -> Self {
        self.attempts_left = attempts_left;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(marker: SlotIx) -> Round {
        Round::new(1, marker, Difficulty::NORMAL, Pacing::default()).unwrap()
    }

    /// Runs a round up to the point where guesses are accepted.
    fn open_for_guesses(round: &mut Round) {
        let mut out = Vec::new();
        round.begin(1, &mut out);
        round.conceal(2, &mut out);
        round
            .begin_shuffle(RandomShufflePlanner::new(5, NoopShuffle::Extend), 3, &mut out)
            .unwrap();
        while !round.move_done(4, &mut out) {}
        assert_eq!(round.phase(), Phase::AwaitingGuess);
    }

    #[test]
    fn begin_previews_the_marker_and_schedules_the_conceal() {
        let mut round = round(2);
        let mut out = Vec::new();
        round.begin(9, &mut out);
        assert_eq!(round.phase(), Phase::Revealing);
        assert!(out.contains(&ViewCmd::Show {
            slot: 2,
            face: SlotFace::Marker
        }));
        assert!(out.contains(&ViewCmd::Timer {
            delay: Pacing::default().preview,
            epoch: 9
        }));
    }

    #[test]
    fn guesses_are_dropped_until_the_shuffle_is_over() {
        let mut round = round(0);
        let mut out = Vec::new();
        assert_eq!(round.guess(0, 1, &mut out), GuessOutcome::Ignored);
        round.begin(1, &mut out);
        assert_eq!(round.guess(0, 2, &mut out), GuessOutcome::Ignored);
        assert_eq!(round.attempts_left(), MAX_ATTEMPTS);
    }

    #[test]
    fn marker_tracking_survives_the_whole_shuffle() {
        let mut round = round(1);
        let mut out = Vec::new();
        round.begin(1, &mut out);
        round.conceal(2, &mut out);
        round
            .begin_shuffle(RandomShufflePlanner::new(11, NoopShuffle::Extend), 3, &mut out)
            .unwrap();
        while !round.move_done(4, &mut out) {}
        // replay the emitted animation commands over plain indices
        let mut tracked = 1;
        for cmd in &out {
            if let ViewCmd::Animate { mv, .. } = cmd {
                tracked = mv.apply(tracked);
            }
        }
        assert_eq!(round.marker(), tracked);
    }

    #[test]
    fn first_attempt_hit_is_worth_the_full_score() {
        let mut round = round(1);
        open_for_guesses(&mut round);
        let marker = round.marker();
        let mut out = Vec::new();
        let outcome = round.guess(marker, 8, &mut out);
        assert_eq!(outcome, GuessOutcome::Hit { points: 100 });
        assert_eq!(round.phase(), Phase::Resolving);
        assert_eq!(round.outcome(), Some(RoundOutcome::Won));
    }

    #[test]
    fn miss_decrements_attempts_and_prices_the_next_guess() {
        let mut round = round(1);
        open_for_guesses(&mut round);
        let wrong = other_slots(round.marker())[0];
        let mut out = Vec::new();
        let outcome = round.guess(wrong, 8, &mut out);
        assert_eq!(outcome, GuessOutcome::Miss { attempts_left: 2 });
        assert!(out.contains(&ViewCmd::Status(StatusLine::TryAgain {
            attempts_left: 2,
            next_worth: 50,
        })));
        // the same card again is a no-op
        let again = round.guess(wrong, 9, &mut out);
        assert_eq!(again, GuessOutcome::Ignored);
        assert_eq!(round.attempts_left(), 2);
    }

    #[test]
    fn exhausting_attempts_loses_and_resolve_reveals_the_marker() {
        let mut round = round(0).with_attempts(2);
        open_for_guesses(&mut round);
        let marker = round.marker();
        let [wrong_a, wrong_b] = other_slots(marker);
        let mut out = Vec::new();
        assert_eq!(
            round.guess(wrong_a, 5, &mut out),
            GuessOutcome::Miss { attempts_left: 1 }
        );
        assert_eq!(round.guess(wrong_b, 6, &mut out), GuessOutcome::Exhausted);
        assert_eq!(round.phase(), Phase::Resolving);
        assert_eq!(round.outcome(), Some(RoundOutcome::Lost));

        let mut reveal = Vec::new();
        assert_eq!(round.resolve(&mut reveal), RoundOutcome::Lost);
        assert!(reveal.contains(&ViewCmd::Show {
            slot: marker,
            face: SlotFace::Marker
        }));
        assert_eq!(round.phase(), Phase::RoundComplete);
    }

    #[test]
    fn third_attempt_win_awards_nothing() {
        let mut round = round(2).with_attempts(1);
        open_for_guesses(&mut round);
        let marker = round.marker();
        let mut out = Vec::new();
        assert_eq!(round.guess(marker, 5, &mut out), GuessOutcome::Hit { points: 0 });
    }
}
