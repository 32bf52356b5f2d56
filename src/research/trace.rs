use super::stage::Stage;
use crate::types::{TraceEntry, TraceStatus};
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;

/// Receives trace entries as they are recorded.
pub type TraceSender = UnboundedSender<TraceEntry>;

/// Append-only audit log of a run.
///
/// Only the coordinator records entries; everyone else gets read access.
#[derive(Debug, Clone, Default)]
pub struct RunTrace {
    entries: Vec<TraceEntry>,
    progress: Option<TraceSender>,
}

impl RunTrace {
    pub fn new(progress: Option<TraceSender>) -> Self {
        Self {
            entries: Vec::new(),
            progress,
        }
    }

    pub(crate) fn record(&mut self, stage: Stage, status: TraceStatus, message: impl Into<String>) {
        let entry = TraceEntry {
            stage,
            status,
            message: message.into(),
            timestamp: Utc::now(),
        };

        if let Some(progress) = &self.progress {
            // A consumer that went away only loses the live view
            let _ = progress.send(entry.clone());
        }
        self.entries.push(entry);
    }

    /// Stop forwarding entries so progress consumers see the channel close.
    pub(crate) fn detach(mut self) -> Self {
        self.progress = None;
        self
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        self.entries.iter().any(|e| e.stage == stage)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == TraceStatus::Warning)
    }

    /// Stages in the order the run entered them.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = Vec::new();
        for entry in &self.entries {
            if stages.last() != Some(&entry.stage) {
                stages.push(entry.stage);
            }
        }
        stages
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}
