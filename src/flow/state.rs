use crate::models::{Awards, RawPlayer, Roster, ScoreResult};
use crate::scoring::{FillPolicy, RuleTable};

/// Where a report run currently stands, with the data that phase works on.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    AcquireRoster {
        error: Option<String>,
    },
    ConfigureFillPolicy {
        raw: Vec<RawPlayer>,
        policy: FillPolicy,
    },
    CompleteData {
        roster: Roster,
        error: Option<String>,
    },
    Results {
        roster: Roster,
        results: Vec<ScoreResult>,
        awards: Awards,
    },
    EditRuleTable {
        draft: RuleTable,
    },
}

/// Data-free view of [`FlowState`] for matching and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AcquireRoster,
    ConfigureFillPolicy,
    CompleteData,
    Results,
    EditRuleTable,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AcquireRoster => "roster acquisition",
            Phase::ConfigureFillPolicy => "fill policy configuration",
            Phase::CompleteData => "data completion",
            Phase::Results => "results",
            Phase::EditRuleTable => "rule table editing",
        }
    }
}

impl FlowState {
    pub fn phase(&self) -> Phase {
        match self {
            FlowState::AcquireRoster { .. } => Phase::AcquireRoster,
            FlowState::ConfigureFillPolicy { .. } => Phase::ConfigureFillPolicy,
            FlowState::CompleteData { .. } => Phase::CompleteData,
            FlowState::Results { .. } => Phase::Results,
            FlowState::EditRuleTable { .. } => Phase::EditRuleTable,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FlowState::AcquireRoster { error } | FlowState::CompleteData { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn roster(&self) -> Option<&Roster> {
        match self {
            FlowState::CompleteData { roster, .. } | FlowState::Results { roster, .. } => Some(roster),
            _ => None,
        }
    }
}
