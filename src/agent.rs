//! The capability interface a build run drives.
//!
//! An [`AgentSession`] is the only handle the executor has on the game: it is passed in
//! explicitly and owned by the run for its whole duration. Lifecycle notifications
//! (spawn, kick, transport errors) arrive separately on a [`SessionEvent`] channel.

use std::fmt;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::spatial::{BlockPos, WorldPos};

/// Lifecycle notifications published by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The agent is in the world and accepts commands.
    Spawned,
    Kicked(String),
    Error(String),
    Disconnected,
}

/// Predicate for the nearest-entity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Any player other than the agent itself.
    Player,
}

/// A single "set this block, replacing whatever is there" command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceCommand {
    pub pos: BlockPos,
    pub block: String,
}

impl PlaceCommand {
    pub fn new(pos: BlockPos, block: impl Into<String>) -> Self {
        Self {
            pos,
            block: block.into(),
        }
    }
}

impl fmt::Display for PlaceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "setblock {} {} replace", self.pos, self.block)
    }
}

/// The async contract a game-client connection must implement.
#[async_trait]
pub trait AgentSession: Send {
    /// In-world name of the agent.
    fn name(&self) -> &str;

    /// Current position of the agent.
    async fn position(&mut self) -> Result<WorldPos, AgentError>;

    /// Moves the agent to `target`.
    async fn teleport(&mut self, target: WorldPos) -> Result<(), AgentError>;

    /// Turns the agent to face `target`.
    async fn look_at(&mut self, target: WorldPos) -> Result<(), AgentError>;

    /// Enables or disables the non-falling flight mode.
    async fn set_flying(&mut self, flying: bool) -> Result<(), AgentError>;

    /// Issues a placement command.
    async fn place(&mut self, command: &PlaceCommand) -> Result<(), AgentError>;

    /// Position of the nearest entity matching `kind`, if any.
    async fn nearest_entity(&mut self, kind: EntityKind) -> Result<Option<WorldPos>, AgentError>;

    /// Suspends until `ticks` scheduler ticks have passed.
    async fn wait_ticks(&mut self, ticks: u32) -> Result<(), AgentError>;

    /// Sends a chat message visible in the world.
    async fn chat(&mut self, message: &str) -> Result<(), AgentError>;

    async fn disconnect(&mut self) -> Result<(), AgentError>;
}
