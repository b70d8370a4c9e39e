//! Command-line surface and environment-backed settings.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Pacing, RconSettings, DEFAULT_AGENT_NAME, DEFAULT_PROJECTS_DIR, DEFAULT_RCON_PORT};
use crate::error::{BuildError, Result};
use crate::executor::{RunOutcome, RunReport};
use crate::plan::project_plan_path;
use crate::spatial::WorldPos;
use crate::status::DEFAULT_STATUS_PIPE;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILED: u8 = 1;
/// A run aborted because no origin could be resolved, with `--fail-on-abort`.
pub const EXIT_ABORTED: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "carpenter-bot")]
#[command(version)]
#[command(about = "Replays a project's build plan into a Minecraft world, one block at a time")]
#[command(long_about = None)]
pub struct Cli {
    /// Project name; the plan is read from <PROJECTS_DIR>/<PROJECT>/
    pub project: String,

    /// Optional origin and plan file: [X Y Z] [PLAN_FILE]
    #[arg(value_name = "ARGS", allow_negative_numbers = true)]
    pub rest: Vec<String>,

    /// Plan file path, overriding the project layout
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,

    #[arg(long, env = "CARPENTER_PROJECTS_DIR", default_value = DEFAULT_PROJECTS_DIR)]
    pub projects_dir: PathBuf,

    #[arg(long, env = "RCON_HOST", default_value = "localhost")]
    pub rcon_host: String,

    #[arg(long, env = "RCON_PORT", default_value_t = DEFAULT_RCON_PORT)]
    pub rcon_port: u16,

    #[arg(long, env = "RCON_PASSWORD", hide_env_values = true, default_value = "")]
    pub rcon_password: String,

    /// In-world name of the entity that does the building
    #[arg(long, env = "CARPENTER_AGENT", default_value = DEFAULT_AGENT_NAME)]
    pub agent: String,

    /// Ticks to wait after every placement
    #[arg(long, default_value_t = Pacing::default().place_ticks)]
    pub place_ticks: u32,

    /// Ticks to wait after repositioning
    #[arg(long, default_value_t = Pacing::default().reposition_ticks)]
    pub reposition_ticks: u32,

    /// Stream JSON status events to a local socket
    #[arg(long, env = "CARPENTER_STATUS_PIPE", value_name = "NAME", num_args = 0..=1, default_missing_value = DEFAULT_STATUS_PIPE)]
    pub status_pipe: Option<String>,

    /// Exit non-zero when the run is aborted because no origin could be found
    #[arg(long)]
    pub fail_on_abort: bool,
}

/// The trailing positional arguments, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub origin: Option<[f64; 3]>,
    pub plan_file: Option<String>,
}

/// Accepts `[]`, `[PLAN_FILE]`, `[X Y Z]` or `[X Y Z PLAN_FILE]`.
pub fn parse_trailing(rest: &[String]) -> Result<Invocation> {
    match rest {
        [] => Ok(Invocation {
            origin: None,
            plan_file: None,
        }),
        [file] => Ok(Invocation {
            origin: None,
            plan_file: Some(file.clone()),
        }),
        [x, y, z] => Ok(Invocation {
            origin: Some(parse_coords(x, y, z)?),
            plan_file: None,
        }),
        [x, y, z, file] => Ok(Invocation {
            origin: Some(parse_coords(x, y, z)?),
            plan_file: Some(file.clone()),
        }),
        _ => Err(BuildError::Usage(
            "expected <PROJECT> [X Y Z] [PLAN_FILE]".to_string(),
        )),
    }
}

/// Coordinates must be finite and land on the `i32` block grid.
fn parse_coords(x: &str, y: &str, z: &str) -> Result<[f64; 3]> {
    let parse = |raw: &str| match raw.parse::<f64>() {
        Ok(value) if WorldPos::new(value, 0.0, 0.0).floor().is_some() => Ok(value),
        Ok(_) => Err(BuildError::Usage(format!(
            "coordinate {raw:?} is outside the world"
        ))),
        Err(_) => Err(BuildError::Usage(format!("invalid coordinate {raw:?}"))),
    };
    Ok([parse(x)?, parse(y)?, parse(z)?])
}

/// Process exit code for a finished run.
///
/// A run aborted for lack of an origin counts as success unless `fail_on_abort` is set.
pub fn exit_code(result: &Result<RunReport>, fail_on_abort: bool) -> u8 {
    match result {
        Ok(report) => match report.outcome {
            RunOutcome::OriginUnresolvable if fail_on_abort => EXIT_ABORTED,
            _ => EXIT_OK,
        },
        Err(_) => EXIT_FAILED,
    }
}

impl Cli {
    pub fn plan_path(&self, invocation: &Invocation) -> PathBuf {
        match &self.plan {
            Some(path) => path.clone(),
            None => project_plan_path(
                &self.projects_dir,
                &self.project,
                invocation.plan_file.as_deref(),
            ),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            place_ticks: self.place_ticks,
            reposition_ticks: self.reposition_ticks,
            ..Pacing::default()
        }
    }

    pub fn rcon_settings(&self) -> Result<RconSettings> {
        if self.rcon_password.is_empty() {
            return Err(BuildError::Usage(
                "RCON password not set (use --rcon-password or RCON_PASSWORD)".to_string(),
            ));
        }
        Ok(RconSettings::new(
            self.rcon_host.clone(),
            self.rcon_port,
            self.rcon_password.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn trailing_arguments_shapes() {
        assert_eq!(
            parse_trailing(&[]).expect("empty"),
            Invocation {
                origin: None,
                plan_file: None
            }
        );
        assert_eq!(
            parse_trailing(&args(&["full_build.json"])).expect("file only"),
            Invocation {
                origin: None,
                plan_file: Some("full_build.json".to_string())
            }
        );
        assert_eq!(
            parse_trailing(&args(&["10", "64", "-10.5", "full_build.json"])).expect("full"),
            Invocation {
                origin: Some([10.0, 64.0, -10.5]),
                plan_file: Some("full_build.json".to_string())
            }
        );
    }

    #[test]
    fn bad_trailing_arguments_are_usage_errors() {
        assert!(matches!(
            parse_trailing(&args(&["10", "64"])),
            Err(BuildError::Usage(_))
        ));
        assert!(matches!(
            parse_trailing(&args(&["10", "sixty-four", "10"])),
            Err(BuildError::Usage(_))
        ));
    }

    #[test]
    fn non_finite_or_off_grid_coordinates_are_usage_errors() {
        for bad in [
            ["NaN", "64", "0"],
            ["0", "inf", "0"],
            ["0", "64", "-infinity"],
            ["0", "64", "3e9"],
        ] {
            let err = parse_trailing(&args(&bad)).unwrap_err();
            assert!(matches!(err, BuildError::Usage(_)), "{bad:?} gave {err}");
        }
    }

    fn report(outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            placed: 0,
            skipped: 0,
            repositions: 0,
        }
    }

    #[test]
    fn exit_codes_follow_outcome() {
        assert_eq!(exit_code(&Ok(report(RunOutcome::Completed)), true), EXIT_OK);
        assert_eq!(
            exit_code(&Ok(report(RunOutcome::OriginUnresolvable)), false),
            EXIT_OK
        );
        assert_eq!(
            exit_code(&Ok(report(RunOutcome::OriginUnresolvable)), true),
            EXIT_ABORTED
        );

        let usage = parse_trailing(&args(&["1", "2"])).map(|_| report(RunOutcome::Completed));
        assert_eq!(exit_code(&usage, false), EXIT_FAILED);
    }

    #[test]
    fn project_is_required() {
        assert!(Cli::try_parse_from(["carpenter-bot"]).is_err());
    }

    #[test]
    fn negative_coordinates_parse_as_positionals() {
        let cli = Cli::try_parse_from(["carpenter-bot", "castle", "-120", "64", "-8"])
            .expect("parse");
        assert_eq!(cli.rest, args(&["-120", "64", "-8"]));

        let invocation = parse_trailing(&cli.rest).expect("invocation");
        assert_eq!(invocation.origin, Some([-120.0, 64.0, -8.0]));
    }

    #[test]
    fn plan_path_prefers_explicit_flag() {
        let cli = Cli::try_parse_from([
            "carpenter-bot",
            "castle",
            "--projects-dir",
            "/srv/projects",
        ])
        .expect("parse");
        let invocation = parse_trailing(&cli.rest).expect("invocation");
        assert_eq!(
            cli.plan_path(&invocation),
            Path::new("/srv/projects/castle/decoration.json")
        );

        let cli = Cli::try_parse_from(["carpenter-bot", "castle", "--plan", "/tmp/plan.json"])
            .expect("parse");
        assert_eq!(cli.plan_path(&invocation), Path::new("/tmp/plan.json"));
    }

    #[test]
    fn empty_password_is_rejected_before_connecting() {
        let cli = Cli::try_parse_from(["carpenter-bot", "castle", "--rcon-password", ""])
            .expect("parse");
        assert!(matches!(cli.rcon_settings(), Err(BuildError::Usage(_))));
    }
}
