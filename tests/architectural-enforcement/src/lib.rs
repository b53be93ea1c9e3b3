//! Architectural Enforcement Integration Tests
//!
//! Source scans that keep the deck crates honest:
//! - No sleep() calls in production code
//! - Only the process launcher builds `Command`s
//! - No blocking filesystem calls inside async functions
//!
//! Everything after a file's `#[cfg(test)]` marker is treated as test code
//! and skipped.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["deck/core/src", "deck/daemon/src"];

/// A production source file with its test module cut off
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Lines before the first `#[cfg(test)]`
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Lines paired with their 1-based line number, comments stripped
    pub fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(idx, line)| (idx + 1, strip_comment(line)))
    }

    /// Format a violation for the report
    pub fn violation(&self, line_number: usize) -> String {
        format!(
            "{}:{} - {}",
            self.path.display(),
            line_number,
            self.lines[line_number - 1].trim()
        )
    }
}

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Load every `.rs` file under [`PRODUCTION_DIRS`]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut sources = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }

        for entry in walkdir::WalkDir::new(&path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let content = match fs::read_to_string(entry.path()) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();
            sources.push(SourceFile {
                path: relative,
                lines: production_lines(&content),
            });
        }
    }

    sources
}

/// Lines of `content` up to its first `#[cfg(test)]` marker
pub fn production_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(str::to_string)
        .collect()
}

/// Drop a trailing `//` comment (and whole doc-comment lines)
pub fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether the function enclosing `lines[idx]` is declared `async`
pub fn in_async_fn(lines: &[String], idx: usize) -> bool {
    for line in lines[..=idx].iter().rev() {
        let code = strip_comment(line).trim();
        if is_fn_signature(code) {
            return code.contains("async fn ");
        }
    }
    false
}

fn is_fn_signature(code: &str) -> bool {
    let rest = code
        .trim_start_matches("pub(crate) ")
        .trim_start_matches("pub ");
    rest.starts_with("fn ") || rest.starts_with("async fn ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let lines = production_lines("fn a() {}\n#[cfg(test)]\nmod tests {}\n");
        assert_eq!(lines, vec!["fn a() {}".to_string()]);
    }

    #[test]
    fn test_async_detection() {
        let code = owned(&[
            "pub async fn handler() {",
            "    let x = std::fs::read(\"a\");",
            "}",
            "fn helper() {",
            "    let y = std::fs::read(\"b\");",
            "}",
        ]);

        assert!(in_async_fn(&code, 1));
        assert!(!in_async_fn(&code, 4));
    }

    #[test]
    fn test_comment_stripping() {
        assert_eq!(strip_comment("let a = 1; // sleep(1)"), "let a = 1; ");
        assert_eq!(strip_comment("/// docs"), "");
    }
}
