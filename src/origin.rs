//! Origin resolution and pre-build positioning.

use tracing::{info, warn};

use crate::agent::{AgentSession, EntityKind};
use crate::config::Pacing;
use crate::error::AgentError;
use crate::spatial::WorldPos;

/// How the run's anchor point is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OriginSpec {
    /// Caller-supplied world coordinates, used as given.
    Explicit(WorldPos),
    /// The floored position of the nearest entity of this kind.
    NearestEntity(EntityKind),
}

impl OriginSpec {
    /// Explicit coordinates when given, otherwise the nearest player.
    pub fn from_coords(coords: Option<[f64; 3]>) -> Self {
        match coords {
            Some([x, y, z]) => OriginSpec::Explicit(WorldPos::new(x, y, z)),
            None => OriginSpec::NearestEntity(EntityKind::Player),
        }
    }
}

/// Resolves `spec` to a world position. `Ok(None)` means no matching entity was found.
pub async fn resolve_origin<A>(agent: &mut A, spec: &OriginSpec) -> Result<Option<WorldPos>, AgentError>
where
    A: AgentSession + ?Sized,
{
    match spec {
        OriginSpec::Explicit(pos) => {
            info!(origin = %pos, "using explicit origin");
            Ok(Some(*pos))
        }
        OriginSpec::NearestEntity(kind) => match agent.nearest_entity(*kind).await? {
            Some(pos) => {
                let origin = pos
                    .floor()
                    .ok_or_else(|| AgentError::UnexpectedReply(format!("entity position {pos}")))?
                    .to_world();
                info!(?kind, found = %pos, origin = %origin, "derived origin from nearest entity");
                Ok(Some(origin))
            }
            None => {
                warn!(?kind, "no entity found to anchor the build");
                Ok(None)
            }
        },
    }
}

/// Moves the agent above `origin` and switches it into flight so it does not fall while
/// chunks load.
pub async fn settle_at_origin<A>(agent: &mut A, origin: WorldPos, pacing: &Pacing) -> Result<(), AgentError>
where
    A: AgentSession + ?Sized,
{
    agent.teleport(origin.lifted(pacing.reposition_lift)).await?;
    agent.wait_ticks(pacing.spawn_settle_ticks).await?;
    agent.set_flying(true).await?;
    agent.wait_ticks(pacing.flight_settle_ticks).await?;
    Ok(())
}

/// Switches flight back off so the agent is left with normal gravity.
pub async fn release_flight<A>(agent: &mut A) -> Result<(), AgentError>
where
    A: AgentSession + ?Sized,
{
    agent.set_flying(false).await
}
