//! CLI tests: spawn the `debate` binary and check exit codes and artifacts.

use std::path::Path;
use std::process::{Command, Output};

use debate::exit_codes;
use debate::io::config::{AgentConfig, DebateConfig, write_config};
use debate::io::paths::DebatePaths;

fn debate(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_debate"))
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("spawn debate")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn commands_without_init_are_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = debate(&temp.path().join("missing"), &["status"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("debate init"));
}

#[test]
fn manual_flow_rejects_out_of_order_and_reports_completion() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("out");
    let init = debate(&dir, &["init", "--topic", "Adopt Rust", "--rounds", "1"]);
    assert_eq!(init.status.code(), Some(exit_codes::OK), "{}", stderr(&init));

    let next = debate(&dir, &["next"]);
    assert_eq!(next.status.code(), Some(exit_codes::OK));
    assert!(stdout(&next).contains("### Role: Critic"));

    let early = debate(&dir, &["deliver", "--role", "judge", "--content", "ruling"]);
    assert_eq!(early.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&early).contains("out of order"), "{}", stderr(&early));

    for role in ["critic", "advocate", "judge", "scribe"] {
        let text = format!("{role} result");
        let output = debate(&dir, &["deliver", "--role", role, "--content", &text]);
        assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    }

    let paths = DebatePaths::new(&dir);
    assert!(paths.round_path(1).is_file());
    assert!(paths.synthesis_path.is_file());
    let done = debate(&dir, &["next"]);
    assert_eq!(done.status.code(), Some(exit_codes::COMPLETE));
}

#[cfg(unix)]
#[test]
fn run_drives_the_agent_command_to_a_synthesis() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("out");
    let init = debate(&dir, &["init", "--topic", "Adopt Rust", "--rounds", "2"]);
    assert_eq!(init.status.code(), Some(exit_codes::OK), "{}", stderr(&init));
    write_config(
        &DebatePaths::new(&dir).config_path,
        &DebateConfig {
            agent: AgentConfig {
                command: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "cat >/dev/null; echo \"$DEBATE_ROLE speaks in round $DEBATE_ROUND\""
                        .to_string(),
                ],
            },
            ..DebateConfig::default()
        },
    )
    .expect("config");

    let run = debate(&dir, &["run"]);
    assert_eq!(run.status.code(), Some(exit_codes::OK), "{}", stderr(&run));
    assert!(stdout(&run).contains("full rounds completed"));

    let paths = DebatePaths::new(&dir);
    let round_two = std::fs::read_to_string(paths.round_path(2)).expect("round 2");
    assert!(round_two.contains("judge speaks in round 2"));
    assert!(paths.turn_log_path(1, debate::core::types::Role::Critic, 1).is_file());

    let status = debate(&dir, &["status", "--json"]);
    let report: serde_json::Value = serde_json::from_slice(&status.stdout).expect("json");
    assert_eq!(report["rounds_closed"], 2);
    assert_eq!(report["synthesized"], true);
}

#[cfg(unix)]
#[test]
fn agent_timeout_exits_with_timed_out_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("out");
    debate(&dir, &["init", "--topic", "topic"]);
    write_config(
        &DebatePaths::new(&dir).config_path,
        &DebateConfig {
            turn_timeout_secs: 1,
            agent: AgentConfig {
                command: vec!["sleep".to_string(), "10".to_string()],
            },
            ..DebateConfig::default()
        },
    )
    .expect("config");

    let run = debate(&dir, &["run"]);
    assert_eq!(run.status.code(), Some(exit_codes::TIMED_OUT));
    assert!(stderr(&run).contains("timed out"));
}
