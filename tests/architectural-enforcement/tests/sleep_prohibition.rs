//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the deck crates MUST NOT call sleep methods.
//! The controller waits on the lock and on the launcher, never on a timer.

use architectural_enforcement::production_sources;

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for source in production_sources() {
        for (line_number, code) in source.code_lines() {
            if code.contains("::sleep(") || code.contains(".sleep(") {
                violations.push(source.violation(line_number));
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }
        eprintln!("\n✅ Wait on the lock or the launcher future instead.");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_scan_covers_both_crates() {
    let sources = production_sources();

    assert!(sources
        .iter()
        .any(|s| s.path.ends_with("deck/core/src/controller.rs")));
    assert!(sources
        .iter()
        .any(|s| s.path.ends_with("deck/daemon/src/server.rs")));
}
