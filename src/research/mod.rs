//! Research run orchestration
//!
//! [`ResearchCoordinator`] owns a run from INIT to a terminal stage. It
//! sequences the agents, enforces the [`Stage`] transition rules, decides which
//! failures are fatal and records every step in the [`RunTrace`].

pub mod coordinator;
pub mod stage;
pub mod trace;

pub use coordinator::{
    PartialArtifacts, ResearchCoordinator, ResearchOutcome, RunFailure, RunInput,
};
pub use stage::Stage;
pub use trace::{RunTrace, TraceSender};
