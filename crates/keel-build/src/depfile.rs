//! Header-dependency capture from compiler output.
//!
//! GNU-style compilers write a Make rule (`a.o: a.cpp h1 h2 ...`); MSVC
//! interleaves `Note: including file:` lines with its normal output. Both
//! are normalized into a JSON sidecar next to the object file so later
//! tooling has one format to read.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The normalized dependency record written as `<object>.deps.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepsSidecar {
    pub object: PathBuf,
    pub source: PathBuf,
    pub dependencies: Vec<PathBuf>,
}

impl DepsSidecar {
    pub fn sidecar_path(object: &Path) -> PathBuf {
        let mut name = object
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(".deps.json");
        object.with_file_name(name)
    }

    pub fn write(&self) -> BuildResult<()> {
        let path = Self::sidecar_path(&self.object);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BuildError::io(&path, std::io::Error::other(e)))?;
        std::fs::write(&path, json).map_err(|e| BuildError::io(&path, e))?;
        Ok(())
    }
}

/// Parse a Make-style dependency file.
///
/// Handles `\`-newline continuations and `\ `-escaped spaces in paths.
/// Only the prerequisite list matters; the target (everything up to the
/// first unescaped `:`) is dropped.
pub fn parse_gnu_depfile(text: &str) -> Vec<PathBuf> {
    // Join continuation lines first.
    let joined = text.replace("\\\r\n", " ").replace("\\\n", " ");

    // Skip past the "target:" prefix. A colon inside a Windows drive
    // letter (single char followed by ':') is not the separator.
    let rest = match split_rule(&joined) {
        Some(r) => r,
        None => return Vec::new(),
    };

    let mut deps = Vec::new();
    let mut current = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                chars.next();
                current.push(' ');
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    deps.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        deps.push(PathBuf::from(current));
    }
    deps
}

fn split_rule(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' {
            // "C:\..." drive-letter colon: previous char is a lone letter
            // at a word start and the next char is not whitespace.
            let is_drive = i == 1 && bytes[0].is_ascii_alphabetic()
                || (i >= 2
                    && bytes[i - 2].is_ascii_whitespace()
                    && bytes[i - 1].is_ascii_alphabetic()
                    && bytes.get(i + 1).is_some_and(|n| !n.is_ascii_whitespace()));
            if !is_drive {
                return Some(&text[i + 1..]);
            }
        }
    }
    None
}

/// Pull `Note: including file:` records out of MSVC compiler output.
///
/// Returns the include list and the remaining output with those lines
/// removed, so diagnostics shown to the user are not drowned in notes.
pub fn scrape_msvc_includes(output: &str) -> (Vec<PathBuf>, String) {
    const MARKER: &str = "Note: including file:";

    let mut includes = Vec::new();
    let mut remaining = String::new();
    for line in output.lines() {
        if let Some(rest) = line.trim_start().strip_prefix(MARKER) {
            includes.push(PathBuf::from(rest.trim()));
        } else {
            remaining.push_str(line);
            remaining.push('\n');
        }
    }
    (includes, remaining)
}
