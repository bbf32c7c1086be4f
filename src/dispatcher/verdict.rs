//! Tester verdict artifact.
//!
//! The tester writes a small text file whose first non-empty line is `PASS`
//! or `FAIL`; anything after the keyword is the failure detail. The file is
//! consumed (deleted) once read.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
    /// No verdict file was written.
    Missing,
    /// The file exists but does not start with PASS or FAIL.
    Ambiguous(String),
}

/// Parse verdict text.
pub fn parse_verdict(content: &str) -> Verdict {
    let mut lines = content.lines().skip_while(|l| l.trim().is_empty());
    let Some(first) = lines.next() else {
        return Verdict::Ambiguous(String::new());
    };

    let first = first.trim();
    let keyword_len = first
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(first.len());
    let (keyword, rest) = first.split_at(keyword_len);
    let rest = rest.trim_start_matches([':', '-', ' ', '\t']).trim();

    match keyword.to_ascii_uppercase().as_str() {
        "PASS" => Verdict::Pass,
        "FAIL" => {
            let mut detail: Vec<&str> = Vec::new();
            if !rest.is_empty() {
                detail.push(rest);
            }
            detail.extend(lines);
            Verdict::Fail(detail.join("\n").trim().to_string())
        }
        _ => Verdict::Ambiguous(first.to_string()),
    }
}

/// Read and delete the verdict at `path`.
pub fn take_verdict(path: &Path) -> Verdict {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Verdict::Missing,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read verdict");
            clear_verdict(path);
            return Verdict::Missing;
        }
    };
    clear_verdict(path);
    parse_verdict(&content)
}

/// Delete any verdict at `path`.
pub fn clear_verdict(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "verdict removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove verdict"),
    }
}
