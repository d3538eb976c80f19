//! Results of dispatcher operations.
//!
//! None of these are errors: a missing step, an unmet prerequisite or a
//! target that never rendered all leave the tour silent. The outcome says
//! which silence it was.

use serde::Serialize;

use crate::geometry::Placement;

/// Result of selecting a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    UnknownStep,
    Dispatched { navigated: bool },
}

/// Result of triggering a feature from the guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TriggerOutcome {
    UnknownStep,
    UnknownFeature,
    PrerequisitesUnmet { missing: Vec<String> },
    Triggered { navigated: bool },
}

/// Result of one highlight attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HighlightOutcome {
    UnknownFeature,
    TargetNotFound,
    TargetDisabled,
    Shown { placement: Placement },
}

impl HighlightOutcome {
    pub fn is_shown(&self) -> bool {
        matches!(self, Self::Shown { .. })
    }
}
