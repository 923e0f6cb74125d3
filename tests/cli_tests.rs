//! Runs the `arena` binary and checks how it reacts to its command line

use std::process::{Command, Output};

fn arena(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arena"))
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to run arena")
}

#[test]
fn unrecognized_option_exits_before_building_a_world() {
    let output = arena(&["--bogus"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unrecognized option '--bogus'. Use --help for usage info."),
        "stderr: {}",
        stderr
    );
    // World construction logs every join; nothing got that far
    assert!(!stderr.contains("joined as actor"), "stderr: {}", stderr);
    assert!(!stderr.contains("Game mode"), "stderr: {}", stderr);
}

#[test]
fn help_lists_modes_and_exits_cleanly() {
    let output = arena(&["--help"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--server", "--client", "--players", "--ai", "--gamemode"] {
        assert!(stdout.contains(flag), "missing {} in: {}", flag, stdout);
    }
}

#[test]
fn unknown_gamemode_is_a_fatal_error() {
    let output = arena(&["--server", "0", "--gamemode", "no-such-mode"]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("-!- FATAL ERROR:"), "stderr: {}", stderr);
}
