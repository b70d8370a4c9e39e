//! Build plans: the ordered list of block placements replayed by the executor.
//!
//! Plan files look like:
//!
//! ```json
//! { "instructions": [ { "x": 0, "y": 0, "z": 0, "action": "setblock", "block": "stone" } ] }
//! ```
//!
//! A missing `instructions` key is an empty plan. Unknown actions are kept so the executor
//! can skip them in place; they are never rejected at load time.

use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use serde::Deserialize;

use crate::error::PlanError;

/// Plan file used when the caller names only a project.
pub const DEFAULT_PLAN_FILE: &str = "decoration.json";

/// What an instruction asks the executor to do.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Action {
    SetBlock,
    Place,
    /// Anything else. Carried through so annotation entries survive loading.
    Other(String),
}

impl Action {
    /// Whether this action results in a placement command.
    pub fn places_block(&self) -> bool {
        matches!(self, Action::SetBlock | Action::Place)
    }
}

impl From<String> for Action {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "setblock" => Action::SetBlock,
            "place" => Action::Place,
            _ => Action::Other(raw),
        }
    }
}

/// One intended world mutation, relative to the run's origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Instruction {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub action: Action,
    /// Block identifier plus optional state, e.g. `oak_leaves[persistent=true]`.
    #[serde(default)]
    pub block: String,
}

impl Instruction {
    pub fn offset(&self) -> Vector3<i32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

#[derive(Deserialize)]
struct PlanFile {
    #[serde(default)]
    instructions: Vec<Instruction>,
}

/// An immutable, ordered list of instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    instructions: Vec<Instruction>,
}

impl BuildPlan {
    /// Builds a plan from already-decoded instructions, applying the same checks as
    /// [`BuildPlan::load`].
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, PlanError> {
        for (i, instruction) in instructions.iter().enumerate() {
            if instruction.action.places_block() && instruction.block.trim().is_empty() {
                return Err(PlanError::InvalidInstruction {
                    index: i + 1,
                    reason: "placement without a block identifier".to_string(),
                });
            }
        }
        Ok(Self { instructions })
    }

    /// Reads and validates a plan file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PlanError::NotFound {
                path: path.to_path_buf(),
            },
            _ => PlanError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        Self::from_json(&raw).map_err(|e| match e {
            PlanError::Malformed { source, .. } => PlanError::Malformed {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Decodes a plan from JSON text.
    pub fn from_json(raw: &str) -> Result<Self, PlanError> {
        let file: PlanFile =
            serde_json::from_str(raw).map_err(|source| PlanError::Malformed {
                path: PathBuf::new(),
                source,
            })?;
        Self::new(file.instructions)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of instructions that will produce a placement.
    pub fn placement_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| i.action.places_block())
            .count()
    }
}

/// Resolves `<projects_dir>/<project>/<file>`, defaulting the file to [`DEFAULT_PLAN_FILE`].
pub fn project_plan_path(projects_dir: &Path, project: &str, file: Option<&str>) -> PathBuf {
    projects_dir
        .join(project)
        .join(file.unwrap_or(DEFAULT_PLAN_FILE))
}
