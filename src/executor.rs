//! Sequential replay of a [`BuildPlan`] through an [`AgentSession`].
//!
//! A run moves through `Idle → Connecting → ResolvingOrigin → Executing → Completing →
//! Disconnected` exactly once. Any lifecycle error (kick, transport failure) ends the run
//! where it stands; nothing is retried and no progress is persisted.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::agent::{AgentSession, PlaceCommand, SessionEvent};
use crate::config::Pacing;
use crate::error::{AgentError, BuildError};
use crate::origin::{release_flight, resolve_origin, settle_at_origin, OriginSpec};
use crate::plan::{BuildPlan, Instruction};
use crate::spatial::{BlockPos, WorldPos};
use crate::status::{StatusEvent, StatusReporter};

/// Progress is reported on the first instruction, every `PROGRESS_EVERY`th, and the last.
pub const PROGRESS_EVERY: usize = 5;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Connecting,
    ResolvingOrigin,
    /// 1-based index of the instruction being processed.
    Executing { index: usize, total: usize },
    Completing,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every instruction was processed.
    Completed,
    /// No origin could be derived; nothing was placed.
    OriginUnresolvable,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub placed: usize,
    pub skipped: usize,
    pub repositions: usize,
}

impl RunReport {
    fn empty(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            placed: 0,
            skipped: 0,
            repositions: 0,
        }
    }
}

/// Whether instruction `index` (1-based) of `total` gets a progress line.
pub fn is_progress_checkpoint(index: usize, total: usize) -> bool {
    index == 1 || index % PROGRESS_EVERY == 0 || index == total
}

/// One build run, owning the agent session for its whole lifetime.
pub struct BuildRun<A> {
    agent: A,
    events: mpsc::Receiver<SessionEvent>,
    pacing: Pacing,
    status: StatusReporter,
    state: RunState,
    flying: bool,
}

impl<A: AgentSession> BuildRun<A> {
    pub fn new(agent: A, events: mpsc::Receiver<SessionEvent>, pacing: Pacing) -> Self {
        Self {
            agent,
            events,
            pacing,
            status: StatusReporter::disabled(),
            state: RunState::Idle,
            flying: false,
        }
    }

    /// Attaches a status channel for a supervising process.
    pub fn with_status(mut self, status: StatusReporter) -> Self {
        self.status = status;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn into_agent(self) -> A {
        self.agent
    }

    /// Drives the whole run: wait for spawn, resolve the origin, replay `plan`, disconnect.
    #[tracing::instrument(name = "build_run", skip_all, fields(agent = %self.agent.name(), instructions = plan.len()))]
    pub async fn execute(&mut self, origin: OriginSpec, plan: BuildPlan) -> Result<RunReport, BuildError> {
        let result = self.drive(origin, &plan).await;
        if let Err(e) = &result {
            error!(error = %e, state = ?self.state, "build run aborted");
            self.status.emit(&StatusEvent::Aborted {
                reason: e.to_string(),
            });
            if e.session_usable() {
                self.wind_down().await;
            }
        }
        result
    }

    /// Best-effort cleanup after a failure that left the session working.
    async fn wind_down(&mut self) {
        if self.flying {
            match release_flight(&mut self.agent).await {
                Ok(()) => self.flying = false,
                Err(e) => warn!(error = %e, "failed to restore gravity"),
            }
        }
        match self.agent.disconnect().await {
            Ok(()) => self.state = RunState::Disconnected,
            Err(e) => warn!(error = %e, "failed to disconnect"),
        }
    }

    async fn drive(&mut self, origin: OriginSpec, plan: &BuildPlan) -> Result<RunReport, BuildError> {
        self.state = RunState::Connecting;
        self.await_spawn().await?;
        info!("agent spawned");
        self.status.emit(&StatusEvent::Connected {
            agent: self.agent.name().to_string(),
        });

        self.state = RunState::ResolvingOrigin;
        let resolved = resolve_origin(&mut self.agent, &origin).await;
        let Some(origin) = self.guard(resolved)? else {
            return self.abort_unresolvable().await;
        };
        let settled = settle_at_origin(&mut self.agent, origin, &self.pacing).await;
        self.guard(settled)?;
        self.flying = true;
        let queried = self.agent.position().await;
        let mut here = self.guard(queried)?;
        self.status.emit(&StatusEvent::OriginResolved { origin: origin.0 });

        let total = plan.len();
        info!(total, placements = plan.placement_count(), origin = %origin, "starting build");

        let mut report = RunReport::empty(RunOutcome::Completed);
        for (i, instruction) in plan.instructions().iter().enumerate() {
            let index = i + 1;
            self.state = RunState::Executing { index, total };
            self.check_events()?;
            let target = origin.offset(instruction.offset());
            let block_pos = target.floor().ok_or_else(|| BuildError::OutOfRange {
                index,
                target: target.to_string(),
            })?;
            let stepped = self
                .step(index, total, instruction, (target, block_pos), &mut here, &mut report)
                .await;
            self.guard(stepped)?;
        }

        self.state = RunState::Completing;
        let finished = self.finish(&report).await;
        self.guard(finished)?;
        self.state = RunState::Disconnected;

        info!(
            placed = report.placed,
            skipped = report.skipped,
            repositions = report.repositions,
            "build complete"
        );
        self.status.emit(&StatusEvent::Completed {
            placed: report.placed,
            skipped: report.skipped,
        });
        Ok(report)
    }

    /// Processes one instruction. `here` tracks the agent's position between placements.
    async fn step(
        &mut self,
        index: usize,
        total: usize,
        instruction: &Instruction,
        (target, block_pos): (WorldPos, BlockPos),
        here: &mut WorldPos,
        report: &mut RunReport,
    ) -> Result<(), AgentError> {
        if is_progress_checkpoint(index, total) {
            info!(index, total, target = %block_pos, block = %instruction.block, "progress");
            self.status.emit(&StatusEvent::Progress {
                index,
                total,
                target: block_pos.0,
            });
        }

        if !instruction.action.places_block() {
            debug!(index, action = ?instruction.action, "skipping non-placement instruction");
            report.skipped += 1;
            return Ok(());
        }

        if here.distance(&target) > self.pacing.reach_distance {
            let vantage = target.lifted(self.pacing.reposition_lift);
            debug!(index, from = %here, to = %vantage, "repositioning");
            self.agent.teleport(vantage).await?;
            *here = vantage;
            self.agent.wait_ticks(self.pacing.reposition_ticks).await?;
            report.repositions += 1;
        }

        self.agent.look_at(target).await?;
        self.agent
            .place(&PlaceCommand::new(block_pos, instruction.block.clone()))
            .await?;
        report.placed += 1;
        self.agent.wait_ticks(self.pacing.place_ticks).await?;
        Ok(())
    }

    async fn finish(&mut self, report: &RunReport) -> Result<(), AgentError> {
        self.agent.wait_ticks(self.pacing.final_settle_ticks).await?;
        if self.flying {
            release_flight(&mut self.agent).await?;
            self.flying = false;
        }
        self.agent
            .chat(&format!("Build complete: {} blocks placed.", report.placed))
            .await?;
        self.agent.disconnect().await
    }

    async fn abort_unresolvable(&mut self) -> Result<RunReport, BuildError> {
        error!("no player found to anchor the build; aborting without placing blocks");
        self.status.emit(&StatusEvent::Aborted {
            reason: "no player found".to_string(),
        });

        let notified = self
            .agent
            .chat("No player found nearby. Give me coordinates to build at.")
            .await;
        self.guard(notified)?;
        let closed = self.agent.disconnect().await;
        self.guard(closed)?;
        self.state = RunState::Disconnected;
        Ok(RunReport::empty(RunOutcome::OriginUnresolvable))
    }

    async fn await_spawn(&mut self) -> Result<(), BuildError> {
        let timeout = self.pacing.spawn_timeout;
        tokio::select! {
            _ = tokio::time::sleep(timeout) => Err(BuildError::SpawnTimeout(timeout)),
            event = self.events.recv() => match event {
                Some(SessionEvent::Spawned) => Ok(()),
                Some(SessionEvent::Kicked(reason)) => Err(BuildError::Kicked(reason)),
                Some(SessionEvent::Error(message)) => Err(BuildError::ConnectionLost(message)),
                Some(SessionEvent::Disconnected) | None => {
                    Err(BuildError::ConnectionLost("session closed before spawn".to_string()))
                }
            },
        }
    }

    /// Drains pending lifecycle events, failing on the first terminal one.
    fn check_events(&mut self) -> Result<(), BuildError> {
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Spawned) => continue,
                Ok(SessionEvent::Kicked(reason)) => return Err(BuildError::Kicked(reason)),
                Ok(SessionEvent::Error(message)) => return Err(BuildError::ConnectionLost(message)),
                Ok(SessionEvent::Disconnected) => {
                    return Err(BuildError::ConnectionLost("disconnected".to_string()))
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    /// Converts an agent failure, preferring a pending kick as the explanation.
    fn guard<T>(&mut self, result: Result<T, AgentError>) -> Result<T, BuildError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => match self.check_events() {
                Err(lifecycle @ BuildError::Kicked(_)) => Err(lifecycle),
                _ => Err(BuildError::Connection(e)),
            },
        }
    }
}
