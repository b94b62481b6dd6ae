//! Round state machine
//!
//! One debate round walks
//! `RoundStart → CollectingThoughts → SelectingSpeaker → Responding → RoundEnd`.
//! `RoundEnd` loops back to `RoundStart` while rounds remain and moves to
//! the terminal `Finished` state after the last one.
//!
//! Valid transitions:
//! 1. RoundStart         → CollectingThoughts (on: ModeratorDone)
//! 2. CollectingThoughts → SelectingSpeaker   (on: ThoughtsCollected)
//! 3. SelectingSpeaker   → Responding         (on: SpeakerChosen)
//! 4. Responding         → RoundEnd           (on: ResponseRecorded)
//! 5. RoundEnd           → RoundStart         (on: NextRound)
//! 6. RoundEnd           → Finished           (on: LastRoundDone)
//! 7. Finished           → Finished           (terminal)

use crate::errors::{DebateError, Result};
use serde::{Deserialize, Serialize};

/// Phase of the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Optional moderator interjection
    RoundStart,

    /// Eligible agents produce private thoughts
    CollectingThoughts,

    /// Thoughts are ranked to pick the speaker
    SelectingSpeaker,

    /// The chosen speaker produces its public response
    Responding,

    /// Output persisted, previous speaker updated
    RoundEnd,

    /// All configured rounds ran (terminal)
    Finished,
}

/// Events that move a round forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    ModeratorDone,
    ThoughtsCollected,
    SpeakerChosen,
    ResponseRecorded,
    NextRound,
    LastRoundDone,
}

impl RoundPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Finished)
    }

    /// Attempt a transition, rejecting events the phase does not accept
    pub fn transition(&self, event: RoundEvent) -> Result<RoundPhase> {
        use RoundEvent::*;
        use RoundPhase::*;

        let next = match (self, event) {
            (RoundStart, ModeratorDone) => CollectingThoughts,
            (CollectingThoughts, ThoughtsCollected) => SelectingSpeaker,
            (SelectingSpeaker, SpeakerChosen) => Responding,
            (Responding, ResponseRecorded) => RoundEnd,
            (RoundEnd, NextRound) => RoundStart,
            (RoundEnd, LastRoundDone) => Finished,
            (Finished, _) => Finished,

            (from, event) => {
                return Err(DebateError::InvalidTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                    reason: format!("No valid transition from {:?} on {:?}", from, event),
                });
            }
        };

        Ok(next)
    }

    /// Human-readable phase name
    pub fn display_name(&self) -> &'static str {
        match self {
            RoundPhase::RoundStart => "Starting round",
            RoundPhase::CollectingThoughts => "Collecting thoughts",
            RoundPhase::SelectingSpeaker => "Selecting speaker",
            RoundPhase::Responding => "Responding",
            RoundPhase::RoundEnd => "Ending round",
            RoundPhase::Finished => "Finished",
        }
    }
}
