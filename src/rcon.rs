//! An [`AgentSession`] backed by the server's RCON console.
//!
//! RCON speaks length-prefixed little-endian packets over TCP:
//!
//! ```text
//! i32 length | i32 request id | i32 type | body (UTF-8) | 0x00 0x00
//! ```
//!
//! where `length` counts everything after itself. The agent is an ordinary in-world entity
//! (typically a bot account) that console commands move around by name.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::agent::{AgentSession, EntityKind, PlaceCommand, SessionEvent};
use crate::config::{RconSettings, TICK};
use crate::error::AgentError;
use crate::spatial::WorldPos;

const PACKET_RESPONSE: i32 = 0;
const PACKET_COMMAND: i32 = 2;
const PACKET_LOGIN: i32 = 3;

/// Request id the server answers a failed login with.
const AUTH_FAILED_ID: i32 = -1;

/// id + type + two terminators.
const MIN_PACKET_LEN: i32 = 10;
/// Servers cap response bodies at 4096 bytes.
const MAX_PACKET_LEN: i32 = 4096 + MIN_PACKET_LEN;

/// Default gravity attribute value restored when flight is switched off.
const DEFAULT_GRAVITY: f64 = 0.08;

const EVENT_BUFFER: usize = 16;

/// One RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconPacket {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl RconPacket {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let length = (body.len() as i32) + MIN_PACKET_LEN;

        let mut buf = Vec::with_capacity(4 + length as usize);
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        buf
    }

    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, AgentError> {
        let length = reader.read_i32_le().await?;
        if !(MIN_PACKET_LEN..=MAX_PACKET_LEN).contains(&length) {
            return Err(AgentError::BadPacket(length));
        }

        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload).await?;

        let id = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let kind = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);

        let mut body = &payload[8..];
        while let [rest @ .., 0] = body {
            body = rest;
        }

        Ok(Self {
            id,
            kind,
            body: String::from_utf8_lossy(body).into_owned(),
        })
    }
}

/// A logged-in RCON connection.
#[derive(Debug)]
pub struct RconClient {
    stream: TcpStream,
    next_id: i32,
    timeout: Duration,
}

impl RconClient {
    /// Opens the TCP connection and authenticates.
    pub async fn connect(settings: &RconSettings) -> Result<Self, AgentError> {
        let stream = tokio::time::timeout(settings.timeout, TcpStream::connect(settings.address()))
            .await
            .map_err(|_| AgentError::Timeout(format!("connection to {}", settings.address())))??;

        let mut client = Self {
            stream,
            next_id: 1,
            timeout: settings.timeout,
        };

        let reply = client.exchange(PACKET_LOGIN, &settings.password).await?;
        if reply.id == AUTH_FAILED_ID {
            return Err(AgentError::AuthRejected);
        }
        Ok(client)
    }

    /// Runs a console command and returns the server's reply text.
    pub async fn command(&mut self, command: &str) -> Result<String, AgentError> {
        let reply = self.exchange(PACKET_COMMAND, command).await?;
        if reply.kind != PACKET_RESPONSE {
            return Err(AgentError::UnexpectedReply(format!(
                "packet type {} for command {command:?}",
                reply.kind
            )));
        }
        Ok(reply.body)
    }

    pub async fn close(&mut self) -> Result<(), AgentError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn exchange(&mut self, kind: i32, body: &str) -> Result<RconPacket, AgentError> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        let packet = RconPacket::new(id, kind, body).encode();
        tokio::time::timeout(self.timeout, round_trip(&mut self.stream, &packet, id))
            .await
            .map_err(|_| AgentError::Timeout(format!("reply to request {id}")))?
    }
}

async fn round_trip(stream: &mut TcpStream, packet: &[u8], id: i32) -> Result<RconPacket, AgentError> {
    stream.write_all(packet).await?;
    loop {
        let reply = RconPacket::read_from(&mut *stream).await?;
        if reply.id == id || reply.id == AUTH_FAILED_ID {
            return Ok(reply);
        }
        debug!(id = reply.id, kind = reply.kind, "skipping stale RCON reply");
    }
}

/// Extracts the position from a `data get entity <target> Pos` reply, e.g.
/// `Carpenter has the following entity data: [10.5d, 64.0d, -3.25d]`.
pub fn parse_entity_pos(reply: &str) -> Option<WorldPos> {
    let start = reply.find('[')?;
    let end = reply[start..].find(']')? + start;

    let coords: Vec<f64> = reply[start + 1..end]
        .split(',')
        .map(|c| c.trim().trim_end_matches(['d', 'D']).parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;

    match coords.as_slice() {
        [x, y, z] => Some(WorldPos::new(*x, *y, *z)).filter(WorldPos::is_finite),
        _ => None,
    }
}

fn entity_selector(kind: EntityKind, exclude: &str) -> String {
    match kind {
        EntityKind::Player => format!("@p[name=!{exclude}]"),
    }
}

/// An agent driven entirely through console commands.
pub struct RconAgent {
    client: RconClient,
    name: String,
    events: mpsc::Sender<SessionEvent>,
}

impl std::fmt::Debug for RconAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconAgent")
            .field("name", &self.name)
            .field("client", &self.client)
            .finish()
    }
}

impl RconAgent {
    /// Connects, authenticates and publishes [`SessionEvent::Spawned`].
    pub async fn connect(
        settings: &RconSettings,
        name: impl Into<String>,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), AgentError> {
        let client = RconClient::connect(settings).await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let agent = Self {
            client,
            name: name.into(),
            events: tx,
        };

        info!(address = %settings.address(), agent = %agent.name, "RCON session established");
        let _ = agent.events.try_send(SessionEvent::Spawned);
        Ok((agent, rx))
    }

    async fn send(&mut self, command: &str) -> Result<String, AgentError> {
        match self.client.command(command).await {
            Ok(reply) => {
                debug!(command, reply = %reply, "rcon");
                Ok(reply)
            }
            Err(e) => {
                let _ = self.events.try_send(SessionEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }
}

#[async_trait]
impl AgentSession for RconAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn position(&mut self) -> Result<WorldPos, AgentError> {
        let command = format!("data get entity {} Pos", self.name);
        let reply = self.send(&command).await?;
        parse_entity_pos(&reply).ok_or(AgentError::UnexpectedReply(reply))
    }

    async fn teleport(&mut self, target: WorldPos) -> Result<(), AgentError> {
        let command = format!("tp {} {}", self.name, target);
        self.send(&command).await.map(|_| ())
    }

    async fn look_at(&mut self, target: WorldPos) -> Result<(), AgentError> {
        let command = format!(
            "execute as {} at @s run tp @s ~ ~ ~ facing {}",
            self.name, target
        );
        self.send(&command).await.map(|_| ())
    }

    async fn set_flying(&mut self, flying: bool) -> Result<(), AgentError> {
        let gravity = if flying { 0.0 } else { DEFAULT_GRAVITY };
        let command = format!(
            "attribute {} minecraft:gravity base set {gravity}",
            self.name
        );
        self.send(&command).await.map(|_| ())
    }

    async fn place(&mut self, command: &PlaceCommand) -> Result<(), AgentError> {
        self.send(&command.to_string()).await.map(|_| ())
    }

    async fn nearest_entity(&mut self, kind: EntityKind) -> Result<Option<WorldPos>, AgentError> {
        let command = format!(
            "execute at {} run data get entity {} Pos",
            self.name,
            entity_selector(kind, &self.name)
        );
        let reply = self.send(&command).await?;
        Ok(parse_entity_pos(&reply))
    }

    async fn wait_ticks(&mut self, ticks: u32) -> Result<(), AgentError> {
        tokio::time::sleep(TICK * ticks).await;
        Ok(())
    }

    async fn chat(&mut self, message: &str) -> Result<(), AgentError> {
        let command = format!("say {message}");
        self.send(&command).await.map(|_| ())
    }

    async fn disconnect(&mut self) -> Result<(), AgentError> {
        self.client.close().await?;
        let _ = self.events.try_send(SessionEvent::Disconnected);
        Ok(())
    }
}
