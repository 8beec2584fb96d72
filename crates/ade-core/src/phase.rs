//! Run lifecycle state machine.

use std::fmt;

use ade_model::EngineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Initialized,
    Extracting,
    Mapping,
    Normalizing,
    WritingOutput,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Extracting => "extracting",
            Self::Mapping => "mapping",
            Self::Normalizing => "normalizing",
            Self::WritingOutput => "writing_output",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The single forward step out of this phase.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Initialized => Some(Self::Extracting),
            Self::Extracting => Some(Self::Mapping),
            Self::Mapping => Some(Self::Normalizing),
            Self::Normalizing => Some(Self::WritingOutput),
            Self::WritingOutput => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the phase of one run and rejects anything but a single forward
/// step or a move to [`RunPhase::Failed`].
#[derive(Debug, Clone)]
pub struct RunMachine {
    phase: RunPhase,
}

impl Default for RunMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMachine {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Initialized,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Moves to `to`, returning the phase that was left.
    pub fn advance(&mut self, to: RunPhase) -> Result<RunPhase, EngineError> {
        let from = self.phase;
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.phase = to;
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_forward_to_completed() {
        let mut machine = RunMachine::new();
        for phase in [
            RunPhase::Extracting,
            RunPhase::Mapping,
            RunPhase::Normalizing,
            RunPhase::WritingOutput,
            RunPhase::Completed,
        ] {
            machine.advance(phase).expect("forward step");
        }
        assert_eq!(machine.phase(), RunPhase::Completed);
    }

    #[test]
    fn rejects_skips_and_reversals() {
        let mut machine = RunMachine::new();
        let err = machine.advance(RunPhase::Mapping).expect_err("skip");
        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.to_string(), "illegal run transition initialized -> mapping");

        machine.advance(RunPhase::Extracting).expect("extract");
        assert!(machine.advance(RunPhase::Initialized).is_err());
        assert!(machine.advance(RunPhase::Extracting).is_err());
        assert_eq!(machine.phase(), RunPhase::Extracting);
    }

    #[test]
    fn failed_is_reachable_from_any_open_phase_only() {
        for start in [RunPhase::Initialized, RunPhase::Normalizing, RunPhase::WritingOutput] {
            assert!(start.can_transition_to(RunPhase::Failed));
        }
        let mut machine = RunMachine::new();
        machine.advance(RunPhase::Failed).expect("fail");
        assert!(machine.advance(RunPhase::Failed).is_err());
        assert!(machine.advance(RunPhase::Extracting).is_err());
        assert!(!RunPhase::Completed.can_transition_to(RunPhase::Failed));
    }
}
