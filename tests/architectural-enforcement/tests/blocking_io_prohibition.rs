//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async functions in the deck crates MUST NOT touch `std::fs`
//! directly. Filesystem work lives in plain functions and is driven from
//! handlers through `spawn_blocking`.
//!
//! **Acceptable**: non-async functions (library, PID file, config loading) and
//! test code.

use architectural_enforcement::{in_async_fn, production_sources};

#[test]
fn test_no_blocking_fs_in_async_functions() {
    let mut violations = Vec::new();

    for source in production_sources() {
        for (idx, line) in source.lines.iter().enumerate() {
            let code = architectural_enforcement::strip_comment(line);
            let blocking = code.contains("fs::") && !code.contains("tokio::fs::");
            if blocking && !code.trim_start().starts_with("use ") && in_async_fn(&source.lines, idx)
            {
                violations.push(source.violation(idx + 1));
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking filesystem calls in async functions!\n");
        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }
        eprintln!("\n✅ Move the work into a plain fn and call it via spawn_blocking.");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
