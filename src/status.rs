//! Optional real-time status channel for a supervising process.
//!
//! When enabled, the reporter connects to a local socket (named pipe on Windows) and
//! writes one JSON-encoded [`StatusEvent`] per line. An in-process supervisor can take the
//! events from an mpsc channel instead. Either way the channel is best effort: the first
//! delivery failure disables it and the run carries on.

use std::io::Write;

use interprocess::local_socket::LocalSocketStream;
use nalgebra::Vector3;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

/// Default status channel name.
///
/// On Unix this is a filesystem-backed socket in `/tmp` so a supervisor can bind it before
/// launching the bot.
#[cfg(unix)]
pub const DEFAULT_STATUS_PIPE: &str = "/tmp/carpenter_bot_status";

/// Default status channel name (non-Unix platforms).
#[cfg(not(unix))]
pub const DEFAULT_STATUS_PIPE: &str = "carpenter_bot_status";

/// A progress notification for the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum StatusEvent {
    Connected {
        agent: String,
    },
    OriginResolved {
        origin: Vector3<f64>,
    },
    Progress {
        index: usize,
        total: usize,
        target: Vector3<i32>,
    },
    Completed {
        placed: usize,
        skipped: usize,
    },
    Aborted {
        reason: String,
    },
}

enum Sink {
    Pipe(LocalSocketStream),
    Channel(mpsc::UnboundedSender<StatusEvent>),
}

/// Delivers [`StatusEvent`]s to a local socket or an in-process channel, if one is attached.
#[derive(Default)]
pub struct StatusReporter {
    sink: Option<Sink>,
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match &self.sink {
            Some(Sink::Pipe(_)) => "pipe",
            Some(Sink::Channel(_)) => "channel",
            None => "none",
        };
        f.debug_struct("StatusReporter").field("sink", &sink).finish()
    }
}

impl StatusReporter {
    /// A reporter that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Connects to the status channel `name`.
    pub fn connect(name: &str) -> std::io::Result<Self> {
        let stream = LocalSocketStream::connect(name)?;
        Ok(Self {
            sink: Some(Sink::Pipe(stream)),
        })
    }

    /// A reporter that forwards events to the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self {
            sink: Some(Sink::Channel(tx)),
        };
        (reporter, rx)
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    pub fn emit(&mut self, event: &StatusEvent) {
        let delivered = match self.sink.as_mut() {
            None => return,
            Some(Sink::Channel(tx)) => tx.send(event.clone()).is_ok(),
            Some(Sink::Pipe(stream)) => Self::write_line(stream, event),
        };
        if !delivered {
            warn!("status channel closed; disabling status updates");
            self.sink = None;
        }
    }

    /// Returns `false` when the pipe can no longer be written.
    fn write_line(stream: &mut LocalSocketStream, event: &StatusEvent) -> bool {
        let mut line = match serde_json::to_vec(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to encode status event");
                return true;
            }
        };
        line.push(b'\n');

        match stream.write_all(&line).and_then(|_| stream.flush()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "status pipe write failed");
                false
            }
        }
    }
}
