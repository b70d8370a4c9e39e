//! A scripted [`AgentSession`] that records every call.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::agent::{AgentSession, EntityKind, PlaceCommand, SessionEvent};
use crate::error::AgentError;
use crate::spatial::WorldPos;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Position,
    Teleport(WorldPos),
    LookAt(WorldPos),
    SetFlying(bool),
    Place(PlaceCommand),
    NearestEntity(EntityKind),
    Wait(u32),
    Chat(String),
    Disconnect,
}

pub struct RecordingAgent {
    pub position: WorldPos,
    pub players: Vec<WorldPos>,
    pub calls: Vec<Call>,
    events: mpsc::Sender<SessionEvent>,
    placed: usize,
    kick_after: Option<usize>,
    fail_after: Option<usize>,
}

impl RecordingAgent {
    /// An agent whose session has not announced a spawn yet.
    pub fn unspawned(position: WorldPos) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let agent = Self {
            position,
            players: Vec::new(),
            calls: Vec::new(),
            events: tx,
            placed: 0,
            kick_after: None,
            fail_after: None,
        };
        (agent, rx)
    }

    pub fn spawned(position: WorldPos) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (agent, rx) = Self::unspawned(position);
        agent
            .events
            .try_send(SessionEvent::Spawned)
            .expect("event buffer");
        (agent, rx)
    }

    pub fn with_player(mut self, pos: WorldPos) -> Self {
        self.players.push(pos);
        self
    }

    /// Publishes a kick right after the `n`th placement.
    pub fn kick_after(mut self, n: usize) -> Self {
        self.kick_after = Some(n);
        self
    }

    /// Fails every placement after the first `n`.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn publish(&self, event: SessionEvent) {
        self.events.try_send(event).expect("event buffer");
    }

    pub fn placements(&self) -> Vec<PlaceCommand> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Place(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn teleports(&self) -> Vec<WorldPos> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Teleport(pos) => Some(*pos),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AgentSession for RecordingAgent {
    fn name(&self) -> &str {
        "Carpenter"
    }

    async fn position(&mut self) -> Result<WorldPos, AgentError> {
        self.calls.push(Call::Position);
        Ok(self.position)
    }

    async fn teleport(&mut self, target: WorldPos) -> Result<(), AgentError> {
        self.calls.push(Call::Teleport(target));
        self.position = target;
        Ok(())
    }

    async fn look_at(&mut self, target: WorldPos) -> Result<(), AgentError> {
        self.calls.push(Call::LookAt(target));
        Ok(())
    }

    async fn set_flying(&mut self, flying: bool) -> Result<(), AgentError> {
        self.calls.push(Call::SetFlying(flying));
        Ok(())
    }

    async fn place(&mut self, command: &PlaceCommand) -> Result<(), AgentError> {
        if self.fail_after == Some(self.placed) {
            return Err(AgentError::Closed);
        }
        self.calls.push(Call::Place(command.clone()));
        self.placed += 1;
        if self.kick_after == Some(self.placed) {
            self.publish(SessionEvent::Kicked("Kicked for spamming".to_string()));
        }
        Ok(())
    }

    async fn nearest_entity(&mut self, kind: EntityKind) -> Result<Option<WorldPos>, AgentError> {
        self.calls.push(Call::NearestEntity(kind));
        let here = self.position;
        Ok(self
            .players
            .iter()
            .copied()
            .min_by(|a, b| a.distance(&here).total_cmp(&b.distance(&here))))
    }

    async fn wait_ticks(&mut self, ticks: u32) -> Result<(), AgentError> {
        self.calls.push(Call::Wait(ticks));
        Ok(())
    }

    async fn chat(&mut self, message: &str) -> Result<(), AgentError> {
        self.calls.push(Call::Chat(message.to_string()));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), AgentError> {
        self.calls.push(Call::Disconnect);
        Ok(())
    }
}
