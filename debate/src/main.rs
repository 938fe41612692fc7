//! `debate` command-line entry point.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;

use debate::core::controller::{NextAction, next_action, termination_mode};
use debate::core::error::DebateError;
use debate::core::types::Role;
use debate::exit_codes;
use debate::io::executor::CommandExecutor;
use debate::io::init::{InitOptions, init_debate};
use debate::io::paths::DEFAULT_OUTPUT_DIR;
use debate::manual::{NextTask, deliver_result, next_task};
use debate::run::{run_debate, synthesize};
use debate::workspace::DebateWorkspace;

#[derive(Parser)]
#[command(
    name = "debate",
    version,
    about = "Round-based critic/advocate/judge/scribe debate orchestrator"
)]
struct Cli {
    /// Output directory holding the debate.
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new debate in the output directory.
    Init {
        #[arg(long)]
        topic: String,
        /// Round limit (defaults to `rounds` in config.toml).
        #[arg(long)]
        rounds: Option<u32>,
        /// Discard an existing debate.
        #[arg(short, long)]
        force: bool,
    },
    /// Run every remaining turn through the configured agent command.
    Run,
    /// Print the task for the next turn (manual host mode).
    Next {
        #[arg(long)]
        json: bool,
    },
    /// Record a result produced outside this program (manual host mode).
    Deliver {
        #[arg(long)]
        role: Role,
        #[arg(long, conflicts_with = "content", required_unless_present = "content")]
        content_file: Option<PathBuf>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Show progress of the debate.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Write the synthesis for a debate that has terminated.
    Synthesize,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    topic: String,
    round_limit: u32,
    rounds_closed: u32,
    open_round: Option<u32>,
    next: String,
    termination: Option<String>,
    synthesized: bool,
    outstanding_task: Option<String>,
}

#[derive(Debug, Serialize)]
struct TaskReport<'a> {
    id: u32,
    round: u32,
    role: Role,
    description: &'a str,
}

fn main() {
    debate::logging::init("warn");
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DebateError>() {
        Some(DebateError::TurnTimedOut { .. }) => exit_codes::TIMED_OUT,
        _ => exit_codes::INVALID,
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let dir = cli.dir.as_path();
    match cli.command {
        Command::Init {
            topic,
            rounds,
            force,
        } => cmd_init(dir, topic, rounds, force),
        Command::Run => cmd_run(dir),
        Command::Next { json } => cmd_next(dir, json),
        Command::Deliver {
            role,
            content_file,
            content,
        } => cmd_deliver(dir, role, content_file.as_deref(), content),
        Command::Status { json } => cmd_status(dir, json),
        Command::Synthesize => cmd_synthesize(dir),
    }
}

fn cmd_init(dir: &Path, topic: String, rounds: Option<u32>, force: bool) -> Result<i32> {
    let paths = init_debate(
        dir,
        &InitOptions {
            topic,
            rounds,
            force,
        },
    )?;
    println!("initialized {}", paths.root.display());
    Ok(exit_codes::OK)
}

fn cmd_run(dir: &Path) -> Result<i32> {
    let mut ws = DebateWorkspace::open(dir)?;
    let executor = CommandExecutor::new(&ws.config.agent)?;
    let outcome = run_debate(&mut ws, &executor, |turn| {
        println!(
            "round {} {} done (attempt {}){}",
            turn.round,
            turn.role,
            turn.attempt,
            if turn.delivery.early_ruling {
                ", early ruling"
            } else {
                ""
            }
        );
    })?;
    println!(
        "debate finished after {} round(s): {}",
        outcome.rounds, outcome.termination
    );
    println!("synthesis: {}", outcome.synthesis_path.display());
    Ok(exit_codes::OK)
}

fn cmd_next(dir: &Path, json: bool) -> Result<i32> {
    let mut ws = DebateWorkspace::open(dir)?;
    match next_task(&mut ws)? {
        NextTask::Complete => {
            eprintln!("debate complete: {}", ws.paths.synthesis_path.display());
            Ok(exit_codes::COMPLETE)
        }
        NextTask::Pending {
            id,
            round,
            role,
            description,
        } => {
            if json {
                let report = TaskReport {
                    id: id.0,
                    round,
                    role,
                    description: &description,
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serialize task")?
                );
            } else {
                eprintln!("task {id}: round {round} {role}");
                println!("{description}");
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_deliver(
    dir: &Path,
    role: Role,
    content_file: Option<&Path>,
    content: Option<String>,
) -> Result<i32> {
    let text = match (content_file, content) {
        (Some(path), _) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        (None, Some(text)) => text,
        (None, None) => return Err(anyhow!("either --content-file or --content is required")),
    };
    if text.trim().is_empty() {
        return Err(anyhow!("refusing to deliver an empty {role} result"));
    }

    let mut ws = DebateWorkspace::open(dir)?;
    let result = deliver_result(&mut ws, role, text.trim())?;
    println!(
        "round {} {} recorded (task {})",
        result.delivery.round, role, result.task
    );
    if let Some(closed) = &result.closed {
        println!("round {} written to {}", closed.index, closed.path.display());
    }
    if let Some(path) = &result.synthesis {
        println!("synthesis written to {}", path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_status(dir: &Path, json: bool) -> Result<i32> {
    let ws = DebateWorkspace::open(dir)?;
    let session = &ws.state.session;
    let next = match next_action(session) {
        NextAction::StartRound => "start round".to_string(),
        NextAction::Turn { round, role } => format!("round {round} {role}"),
        NextAction::CloseRound { round } => format!("close round {round}"),
        NextAction::Synthesize => "synthesize".to_string(),
        NextAction::Finished => "finished".to_string(),
    };
    let report = StatusReport {
        topic: session.topic.clone(),
        round_limit: session.effective_round_limit(),
        rounds_closed: session.closed_round_count(),
        open_round: session.open_round().map(|round| round.index),
        next,
        termination: termination_mode(session).map(|mode| mode.label().to_string()),
        synthesized: session.synthesis.is_some(),
        outstanding_task: ws
            .state
            .queue
            .outstanding()
            .map(|task| format!("{} {}", task.id, task.subject)),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize status")?
        );
        return Ok(exit_codes::OK);
    }
    println!("topic: {}", report.topic);
    println!("rounds: {}/{}", report.rounds_closed, report.round_limit);
    if let Some(index) = report.open_round {
        println!("open round: {index}");
    }
    if let Some(task) = &report.outstanding_task {
        println!("outstanding task: {task}");
    }
    if let Some(termination) = &report.termination {
        println!("terminated: {termination}");
    }
    println!("next: {}", report.next);
    Ok(exit_codes::OK)
}

fn cmd_synthesize(dir: &Path) -> Result<i32> {
    let mut ws = DebateWorkspace::open(dir)?;
    let path = synthesize(&mut ws)?;
    println!("synthesis written to {}", path.display());
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_with_rounds() {
        let cli = Cli::parse_from(["debate", "init", "--topic", "Adopt Rust", "--rounds", "2"]);
        assert_eq!(cli.dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert!(matches!(
            cli.command,
            Command::Init {
                rounds: Some(2),
                force: false,
                ..
            }
        ));
    }

    #[test]
    fn parse_deliver_role_case_insensitively() {
        let cli = Cli::parse_from([
            "debate", "--dir", "out", "deliver", "--role", "Judge", "--content", "ruling",
        ]);
        assert_eq!(cli.dir, PathBuf::from("out"));
        assert!(matches!(
            cli.command,
            Command::Deliver {
                role: Role::Judge,
                ..
            }
        ));
    }

    #[test]
    fn deliver_requires_content() {
        assert!(Cli::try_parse_from(["debate", "deliver", "--role", "critic"]).is_err());
        assert!(
            Cli::try_parse_from([
                "debate",
                "deliver",
                "--role",
                "critic",
                "--content",
                "x",
                "--content-file",
                "f"
            ])
            .is_err()
        );
    }

    #[test]
    fn timeouts_map_to_their_exit_code() {
        let err = anyhow::Error::from(DebateError::TurnTimedOut {
            role: Role::Critic,
            round: 1,
            timeout_secs: 5,
        })
        .context("run debate");
        assert_eq!(exit_code_for(&err), exit_codes::TIMED_OUT);
        assert_eq!(
            exit_code_for(&anyhow::Error::from(DebateError::NoRounds)),
            exit_codes::INVALID
        );
    }
}
