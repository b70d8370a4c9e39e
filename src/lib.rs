//! Carpenter bot: replays a block build plan through a game-world agent.
//!
//! This crate defines:
//! - [`BuildPlan`]: the ordered placement instructions loaded from a project's plan file.
//! - [`AgentSession`]: the async capability contract the executor drives, with an RCON
//!   implementation in [`rcon`].
//! - [`BuildRun`]: the sequential executor that anchors the plan at an origin and places
//!   each block in order, pacing commands to stay under server rate limits.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod origin;
pub mod plan;
pub mod rcon;
pub mod spatial;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{AgentSession, EntityKind, PlaceCommand, SessionEvent};
pub use config::{Pacing, RconSettings};
pub use error::{AgentError, BuildError, PlanError};
pub use executor::{BuildRun, RunOutcome, RunReport, RunState};
pub use origin::OriginSpec;
pub use plan::{Action, BuildPlan, Instruction};
pub use rcon::RconAgent;
pub use spatial::{BlockPos, WorldPos};
pub use status::{StatusEvent, StatusReporter};
