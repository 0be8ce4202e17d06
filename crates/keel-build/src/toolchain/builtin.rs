//! Builtin toolchain profiles, selected by id strings such as
//! `gcc`, `clang-12`, `debug:c++17:gcc-11` or `ccache:msvc`.
//!
//! Grammar:
//! `[debug:][ccache:][c++(98|03|11|14|17|20):](gcc|clang|msvc)[-(7..13)]`
//!
//! A profile id is expanded into configuration text and fed through the
//! regular parsing path, so builtin and file-based toolchains behave
//! identically from there on.

use super::parse::{parse_kv_text, parse_toolchain};
use super::Toolchain;
use crate::error::BuildResult;

const VERSION_SUFFIXES: &[&str] = &["-7", "-8", "-9", "-10", "-11", "-12", "-13"];

/// Resolve a builtin toolchain id. Returns `Ok(None)` when the id does not
/// match the builtin grammar (the caller falls back to treating it as a
/// file path).
pub fn builtin_toolchain(tc_id: &str) -> BuildResult<Option<Toolchain>> {
    let mut rest = tc_id;
    let mut content = String::new();

    if let Some(stripped) = rest.strip_prefix("debug:") {
        rest = stripped;
        content.push_str("Debug: True\n");
    }
    if let Some(stripped) = rest.strip_prefix("ccache:") {
        rest = stripped;
        content.push_str("Compiler-Launcher: ccache\n");
    }
    for std in ["98", "03", "11", "14", "17", "20"] {
        if let Some(stripped) = rest.strip_prefix(&format!("c++{std}:")) {
            rest = stripped;
            content.push_str(&format!("C++-Version: C++{std}\n"));
            break;
        }
    }

    let Some((c, cxx, id)) = compiler_triple(rest) else {
        return Ok(None);
    };

    content.push_str(&format!("C-Compiler: {c}\n"));
    content.push_str(&format!("C++-Compiler: {cxx}\n"));
    content.push_str(&format!("Compiler-ID: {id}\n"));

    parse_toolchain(&parse_kv_text(&content), tc_id).map(Some)
}

/// Match the compiler part of the id, yielding (C compiler, C++ compiler,
/// compiler id).
fn compiler_triple(rest: &str) -> Option<(String, String, &'static str)> {
    if rest == "msvc" {
        return Some(("cl.exe".to_string(), "cl.exe".to_string(), "MSVC"));
    }

    let (c_base, cxx_base, id) = if rest.starts_with("gcc") {
        ("gcc", "g++", "GNU")
    } else if rest.starts_with("clang") {
        ("clang", "clang++", "Clang")
    } else {
        return None;
    };

    let suffix = VERSION_SUFFIXES
        .iter()
        .find(|s| rest.ends_with(*s))
        .copied()
        .unwrap_or("");

    // The id must be exactly base + suffix; anything else (e.g. "gcc-99"
    // or "gccx") is not a builtin.
    if rest != format!("{c_base}{suffix}") {
        return None;
    }

    Some((
        format!("{c_base}{suffix}"),
        format!("{cxx_base}{suffix}"),
        id,
    ))
}
