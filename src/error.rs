use std::path::PathBuf;

/// Failures while locating or decoding a build plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("plan file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read plan file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed plan file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("instruction #{index} is invalid: {reason}")]
    InvalidInstruction { index: usize, reason: String },
}

/// Failures raised by an agent session.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("authentication rejected by server")]
    AuthRejected,

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("invalid packet length {0}")]
    BadPacket(i32),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("session is closed")]
    Closed,
}

/// Terminal failures of a build run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("usage: {0}")]
    Usage(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("connection error: {0}")]
    Connection(#[from] AgentError),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("kicked from server: {0}")]
    Kicked(String),

    #[error("agent did not spawn within {0:?}")]
    SpawnTimeout(std::time::Duration),

    #[error("instruction #{index} targets {target}, outside the block grid")]
    OutOfRange { index: usize, target: String },
}

impl BuildError {
    /// Whether the agent session can still take commands after this error.
    pub fn session_usable(&self) -> bool {
        matches!(
            self,
            BuildError::Usage(_) | BuildError::Plan(_) | BuildError::OutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
