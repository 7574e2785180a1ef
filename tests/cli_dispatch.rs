//! Argument handling in front of the launcher: usage errors and help never
//! reach the compositor.

use still_lib::cli::Config;
use still_lib::freeze::{FreezeError, Launcher};
use still_lib::run_with;
use still_lib::scheduler::Outcome;
use still_lib::supervisor::ChildOutcome;

struct RecordingLauncher {
    configs: Vec<Config>,
    outcome: Outcome,
}

impl RecordingLauncher {
    fn new(outcome: Outcome) -> Self {
        Self {
            configs: Vec::new(),
            outcome,
        }
    }
}

impl Launcher for RecordingLauncher {
    fn freeze(&mut self, config: &Config) -> Result<Outcome, FreezeError> {
        self.configs.push(config.clone());
        Ok(self.outcome)
    }
}

struct Run {
    code: i32,
    stdout: String,
    stderr: String,
    launcher: RecordingLauncher,
}

fn run(args: &[&str], outcome: Outcome) -> Run {
    let mut launcher = RecordingLauncher::new(outcome);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = run_with(args.iter().copied(), &mut stdout, &mut stderr, &mut launcher);
    Run {
        code,
        stdout: String::from_utf8(stdout).unwrap(),
        stderr: String::from_utf8(stderr).unwrap(),
        launcher,
    }
}

const OK: Outcome = Outcome::Child(ChildOutcome::Exited(0));

// ── Help and usage errors ───────────────────────────────────────────

#[test]
fn help_prints_usage_to_stdout_without_connecting() {
    let run = run(&["still", "-h"], OK);
    assert_eq!(run.code, 0);
    assert!(run.stdout.starts_with("Usage: still "));
    assert!(run.stderr.is_empty());
    assert!(run.launcher.configs.is_empty());
}

#[test]
fn help_before_a_bad_flag_still_exits_cleanly() {
    for args in [["still", "-h", "-x"], ["still", "-h", "-c"]] {
        let run = run(&args, OK);
        assert_eq!(run.code, 0, "{args:?}");
        assert!(run.stdout.starts_with("Usage: still "));
        assert!(run.stderr.is_empty());
        assert!(run.launcher.configs.is_empty());
    }
}

#[test]
fn missing_command_prints_usage_to_stderr_without_connecting() {
    let run = run(&["still", "-p"], OK);
    assert_eq!(run.code, 1);
    assert!(run.stdout.is_empty());
    assert!(run
        .stderr
        .starts_with("ERROR: a command must be provided via -c flag\nUsage: still "));
    assert!(run.launcher.configs.is_empty());
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let run = run(&["still", "-q", "-c", "true"], OK);
    assert_eq!(run.code, 1);
    assert!(run.stderr.starts_with("ERROR: "));
    assert!(run.stderr.contains("Usage: still "));
    assert!(run.launcher.configs.is_empty());
}

// ── Freeze dispatch ─────────────────────────────────────────────────

#[test]
fn config_reaches_the_launcher() {
    let run = run(&["still", "-p", "-c", "grim -g \"$(slurp)\""], OK);
    assert_eq!(run.code, 0);
    assert_eq!(
        run.launcher.configs,
        vec![Config {
            command: "grim -g \"$(slurp)\"".to_string(),
            overlay_cursor: true,
        }]
    );
}

#[test]
fn launcher_outcome_becomes_the_exit_code() {
    assert_eq!(run(&["still", "-c", "x"], Outcome::Child(ChildOutcome::Exited(7))).code, 7);
    assert_eq!(run(&["still", "-c", "x"], Outcome::Child(ChildOutcome::Signaled(9))).code, 137);
    assert_eq!(run(&["still", "-c", "x"], Outcome::CaptureFailed).code, 1);
}
