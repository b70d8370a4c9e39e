//! Timing policy and connection settings.

use std::time::Duration;

/// Length of one server tick (20 ticks per second).
pub const TICK: Duration = Duration::from_millis(50);

/// Default RCON port.
pub const DEFAULT_RCON_PORT: u16 = 25575;

/// Default in-world name of the agent.
pub const DEFAULT_AGENT_NAME: &str = "Carpenter";

/// Default directory holding one sub-directory per project.
pub const DEFAULT_PROJECTS_DIR: &str = "projects";

/// Rate-limiting and movement policy for a run.
///
/// All delays are in server ticks. None of these are derived from the server; they are
/// tuned so command throughput stays below typical spam-kick thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Wait after the initial teleport to the origin, while chunks load.
    pub spawn_settle_ticks: u32,
    /// Wait after switching into flight mode.
    pub flight_settle_ticks: u32,
    /// Wait after a reposition before placing.
    pub reposition_ticks: u32,
    /// Wait after every placement.
    pub place_ticks: u32,
    /// Wait after the last instruction before announcing completion.
    pub final_settle_ticks: u32,
    /// Targets farther than this from the agent trigger a reposition.
    pub reach_distance: f64,
    /// How far above the target a reposition lands.
    pub reposition_lift: f64,
    /// How long to wait for the spawn event after connecting.
    pub spawn_timeout: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            spawn_settle_ticks: 40,
            flight_settle_ticks: 20,
            reposition_ticks: 5,
            place_ticks: 2,
            final_settle_ticks: 20,
            reach_distance: 4.0,
            reposition_lift: 2.0,
            spawn_timeout: Duration::from_secs(30),
        }
    }
}

/// Where and how to reach the server's RCON endpoint.
#[derive(Clone)]
pub struct RconSettings {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Per-exchange timeout.
    pub timeout: Duration,
}

impl RconSettings {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for RconSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
