//! Integration Test: Process Spawning Goes Through the Launcher
//!
//! **Policy**: Only `deck/core/src/launcher.rs` may build a `Command`. Every
//! other module starts programs through a `ProcessLauncher`, so tests can
//! swap in the recording launcher.

use std::path::Path;

use architectural_enforcement::production_sources;

const LAUNCHER: &str = "deck/core/src/launcher.rs";

#[test]
fn test_command_only_in_launcher() {
    let mut violations = Vec::new();

    for source in production_sources() {
        if source.path.ends_with(Path::new(LAUNCHER)) {
            continue;
        }
        for (line_number, code) in source.code_lines() {
            if builds_command(code) || code.contains("process::Command") {
                violations.push(source.violation(line_number));
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Processes started outside the launcher!\n");
        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }
        eprintln!("\n✅ Use ProcessLauncher::spawn from {LAUNCHER}.");

        panic!(
            "\nFound {} process spawning violation(s).\nFix these before merging!",
            violations.len()
        );
    }
}

/// `Command::new(` as a bare type, not `ViewerCommand::new(`
fn builds_command(code: &str) -> bool {
    code.match_indices("Command::new(").any(|(at, _)| {
        code[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric() && c != '_')
    })
}

#[test]
fn test_builds_command_ignores_prefixed_types() {
    assert!(builds_command("let mut command = Command::new(program);"));
    assert!(builds_command("tokio::process::Command::new(\"x\")"));
    assert!(!builds_command("let v = ViewerCommand::new(\"vgdeck\");"));
}

#[test]
fn test_launcher_still_spawns() {
    let launcher = production_sources()
        .into_iter()
        .find(|s| s.path.ends_with(Path::new(LAUNCHER)))
        .expect("launcher source should exist");

    assert!(launcher
        .code_lines()
        .any(|(_, code)| builds_command(code)));
}
