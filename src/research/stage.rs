use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage of a research run.
///
/// ```text
/// INIT -> [INGEST] -> GAP_ANALYSIS -> PLANNING -> RESEARCHING -> EDITING -> [COMPARING] -> DONE
/// ```
///
/// `FAILED` and `CANCELLED` are reachable from every non-terminal stage.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    Ingest,
    GapAnalysis,
    Planning,
    Researching,
    Editing,
    Comparing,
    Done,
    Failed,
    Cancelled,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed | Stage::Cancelled)
    }

    pub fn can_transition_to(&self, next: Stage) -> bool {
        use Stage::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Failed | Cancelled) {
            return true;
        }

        matches!(
            (self, next),
            (Init, Ingest)
                | (Init, GapAnalysis)
                | (Ingest, GapAnalysis)
                | (GapAnalysis, Planning)
                | (Planning, Researching)
                | (Researching, Editing)
                | (Editing, Comparing)
                | (Editing, Done)
                | (Comparing, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "INIT",
            Stage::Ingest => "INGEST",
            Stage::GapAnalysis => "GAP_ANALYSIS",
            Stage::Planning => "PLANNING",
            Stage::Researching => "RESEARCHING",
            Stage::Editing => "EDITING",
            Stage::Comparing => "COMPARING",
            Stage::Done => "DONE",
            Stage::Failed => "FAILED",
            Stage::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
