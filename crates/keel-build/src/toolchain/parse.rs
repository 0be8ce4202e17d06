//! Toolchain configuration: an enumerated key/value surface plus the
//! deduction tables that fill in everything a `Compiler-ID` implies.
//!
//! Keys are case-sensitive. Accumulating options (`Flags`, `C-Flags`, ...)
//! concatenate shell-split values in declaration order; single-value
//! options reject duplicate specification. Unknown keys fail with a typo
//! suggestion drawn from the known-key list.

use super::prep::ToolchainPrep;
use super::{DepsMode, Toolchain};
use crate::error::{BuildError, BuildResult};
use crate::shlex::split_shell_string;

/// One `key: value` entry from a toolchain definition.
///
/// The surrounding file format is the front-end's concern; the core only
/// consumes the ordered pair list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Parse a minimal line-oriented `Key: Value` document.
///
/// Blank lines and `#` comment lines are skipped. This is the reader used
/// for internally synthesized configuration (builtin profiles); front-ends
/// are free to produce the pair list some other way.
pub fn parse_kv_text(text: &str) -> Vec<KeyValue> {
    let mut pairs = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = match line.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (line, ""),
        };
        pairs.push(KeyValue::new(key, value));
    }
    pairs
}

/// Every option the configuration surface recognizes.
const KNOWN_KEYS: &[&str] = &[
    "Compiler-ID",
    "C-Compiler",
    "C++-Compiler",
    "C-Version",
    "C++-Version",
    "Include-Template",
    "External-Include-Template",
    "Define-Template",
    "Warning-Flags",
    "Flags",
    "C-Flags",
    "C++-Flags",
    "Link-Flags",
    "Optimize",
    "Debug",
    "Compiler-Launcher",
    "Deps-Mode",
    "C-Compile-File",
    "C++-Compile-File",
    "Create-Archive",
    "Link-Executable",
    "Archive-Prefix",
    "Archive-Suffix",
    "Object-Prefix",
    "Object-Suffix",
    "Executable-Prefix",
    "Executable-Suffix",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompilerId {
    Msvc,
    Gnu,
    Clang,
}

impl CompilerId {
    fn is_gnu_like(self) -> bool {
        matches!(self, Self::Gnu | Self::Clang)
    }
}

/// Options as read from the pair list, before deduction.
#[derive(Debug, Default)]
struct RawOptions {
    compiler_id: Option<String>,
    c_compiler: Option<String>,
    cxx_compiler: Option<String>,
    c_version: Option<String>,
    cxx_version: Option<String>,
    include_template: Option<Vec<String>>,
    external_include_template: Option<Vec<String>>,
    define_template: Option<Vec<String>>,
    warning_flags: Option<Vec<String>>,
    flags: Option<Vec<String>>,
    c_flags: Option<Vec<String>>,
    cxx_flags: Option<Vec<String>>,
    link_flags: Option<Vec<String>>,
    optimize: Option<bool>,
    debug: Option<bool>,
    compiler_launcher: Option<Vec<String>>,
    deps_mode: Option<String>,
    c_compile_file: Option<Vec<String>>,
    cxx_compile_file: Option<Vec<String>>,
    create_archive: Option<Vec<String>>,
    link_executable: Option<Vec<String>>,
    archive_prefix: Option<String>,
    archive_suffix: Option<String>,
    object_prefix: Option<String>,
    object_suffix: Option<String>,
    exe_prefix: Option<String>,
    exe_suffix: Option<String>,
}

impl RawOptions {
    fn read(pairs: &[KeyValue], context: &str) -> BuildResult<Self> {
        let mut opts = Self::default();
        for pair in pairs {
            opts.read_pair(pair, context)?;
        }
        Ok(opts)
    }

    fn read_pair(&mut self, pair: &KeyValue, context: &str) -> BuildResult<()> {
        let KeyValue { key, value } = pair;
        match key.as_str() {
            "Compiler-ID" => set_string(&mut self.compiler_id, key, value, context),
            "C-Compiler" => set_string(&mut self.c_compiler, key, value, context),
            "C++-Compiler" => set_string(&mut self.cxx_compiler, key, value, context),
            "C-Version" => set_string(&mut self.c_version, key, value, context),
            "C++-Version" => set_string(&mut self.cxx_version, key, value, context),
            "Include-Template" => set_argv(&mut self.include_template, key, value, context),
            "External-Include-Template" => {
                set_argv(&mut self.external_include_template, key, value, context)
            }
            "Define-Template" => set_argv(&mut self.define_template, key, value, context),
            "Warning-Flags" => Ok(accumulate_argv(&mut self.warning_flags, value)),
            "Flags" => Ok(accumulate_argv(&mut self.flags, value)),
            "C-Flags" => Ok(accumulate_argv(&mut self.c_flags, value)),
            "C++-Flags" => Ok(accumulate_argv(&mut self.cxx_flags, value)),
            "Link-Flags" => Ok(accumulate_argv(&mut self.link_flags, value)),
            "Optimize" => set_bool(&mut self.optimize, key, value, context),
            "Debug" => set_bool(&mut self.debug, key, value, context),
            "Compiler-Launcher" => set_argv(&mut self.compiler_launcher, key, value, context),
            "Deps-Mode" => set_string(&mut self.deps_mode, key, value, context),
            "C-Compile-File" => set_argv(&mut self.c_compile_file, key, value, context),
            "C++-Compile-File" => set_argv(&mut self.cxx_compile_file, key, value, context),
            "Create-Archive" => set_argv(&mut self.create_archive, key, value, context),
            "Link-Executable" => set_argv(&mut self.link_executable, key, value, context),
            "Archive-Prefix" => set_string(&mut self.archive_prefix, key, value, context),
            "Archive-Suffix" => set_string(&mut self.archive_suffix, key, value, context),
            "Object-Prefix" => set_string(&mut self.object_prefix, key, value, context),
            "Object-Suffix" => set_string(&mut self.object_suffix, key, value, context),
            "Executable-Prefix" => set_string(&mut self.exe_prefix, key, value, context),
            "Executable-Suffix" => set_string(&mut self.exe_suffix, key, value, context),
            unknown => Err(BuildError::unknown_key(
                context,
                unknown,
                suggest_known_key(unknown),
            )),
        }
    }
}

fn set_string(
    slot: &mut Option<String>,
    key: &str,
    value: &str,
    context: &str,
) -> BuildResult<()> {
    if slot.is_some() {
        return Err(BuildError::DuplicateKey {
            context: context.to_string(),
            key: key.to_string(),
        });
    }
    *slot = Some(value.to_string());
    Ok(())
}

fn set_argv(
    slot: &mut Option<Vec<String>>,
    key: &str,
    value: &str,
    context: &str,
) -> BuildResult<()> {
    if slot.is_some() {
        return Err(BuildError::DuplicateKey {
            context: context.to_string(),
            key: key.to_string(),
        });
    }
    *slot = Some(split_shell_string(value));
    Ok(())
}

fn accumulate_argv(slot: &mut Option<Vec<String>>, value: &str) {
    slot.get_or_insert_with(Vec::new)
        .extend(split_shell_string(value));
}

fn set_bool(slot: &mut Option<bool>, key: &str, value: &str, context: &str) -> BuildResult<()> {
    if slot.is_some() {
        return Err(BuildError::DuplicateKey {
            context: context.to_string(),
            key: key.to_string(),
        });
    }
    *slot = Some(match value {
        "True" => true,
        "False" => false,
        other => return Err(BuildError::unknown_value(context, key, other)),
    });
    Ok(())
}

/// Suggest the closest known option for an unrecognized key.
fn suggest_known_key(unknown: &str) -> Option<String> {
    let max_distance = match unknown.len() {
        0..=2 => 1,
        3..=5 => 2,
        _ => 3,
    };
    KNOWN_KEYS
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| k.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, ac) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, bc) in b_chars.iter().enumerate() {
            let cost = usize::from(ac != *bc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Build a [`Toolchain`] from an ordered option list.
pub fn parse_toolchain(pairs: &[KeyValue], context: &str) -> BuildResult<Toolchain> {
    let opts = RawOptions::read(pairs, context)?;
    deduce(opts, context).map(ToolchainPrep::realize)
}

fn deduce(opts: RawOptions, context: &str) -> BuildResult<ToolchainPrep> {
    let compiler_id = match opts.compiler_id.as_deref() {
        None => None,
        Some("MSVC") => Some(CompilerId::Msvc),
        Some("GNU") => Some(CompilerId::Gnu),
        Some("Clang") => Some(CompilerId::Clang),
        Some(other) => return Err(BuildError::unknown_value(context, "Compiler-ID", other)),
    };
    let is_gnu_like = compiler_id.is_some_and(CompilerId::is_gnu_like);
    let is_msvc = compiler_id == Some(CompilerId::Msvc);

    let deps_mode = match opts.deps_mode.as_deref() {
        None => {
            if is_gnu_like {
                DepsMode::Gnu
            } else if is_msvc {
                DepsMode::Msvc
            } else {
                DepsMode::None
            }
        }
        Some("GNU") => DepsMode::Gnu,
        Some("MSVC") => DepsMode::Msvc,
        Some("None") => DepsMode::None,
        Some(other) => return Err(BuildError::unknown_value(context, "Deps-Mode", other)),
    };

    let do_debug = opts.debug.unwrap_or(false);
    let do_optimize = opts.optimize.unwrap_or(false);

    let get_compiler = |want_cxx: bool| -> BuildResult<String> {
        if want_cxx {
            if let Some(path) = &opts.cxx_compiler {
                return Ok(path.clone());
            }
        } else if let Some(path) = &opts.c_compiler {
            return Ok(path.clone());
        }
        match compiler_id {
            Some(CompilerId::Gnu) => Ok(if want_cxx { "g++" } else { "gcc" }.to_string()),
            Some(CompilerId::Clang) => Ok(if want_cxx { "clang++" } else { "clang" }.to_string()),
            Some(CompilerId::Msvc) => Ok("cl.exe".to_string()),
            None => Err(BuildError::cannot_deduce(context, "the compiler to use")),
        }
    };

    // Language standard flags. MSVC only grew /std switches from C++14 on;
    // earlier standards (and every C standard) get no flag.
    let c_version_flags = match opts.c_version.as_deref() {
        None => Vec::new(),
        Some(v @ ("C89" | "C99" | "C11" | "C18")) => {
            let id = compiler_id.ok_or_else(|| {
                BuildError::cannot_deduce(context, "flags for 'C-Version'")
            })?;
            if id.is_gnu_like() {
                vec![format!("-std={}", v.to_lowercase())]
            } else {
                Vec::new()
            }
        }
        Some(other) => return Err(BuildError::unknown_value(context, "C-Version", other)),
    };

    let cxx_version_flags = match opts.cxx_version.as_deref() {
        None => Vec::new(),
        Some(v @ ("C++98" | "C++03" | "C++11" | "C++14" | "C++17" | "C++20")) => {
            let id = compiler_id.ok_or_else(|| {
                BuildError::cannot_deduce(context, "flags for 'C++-Version'")
            })?;
            let std = v.trim_start_matches("C++");
            match id {
                CompilerId::Gnu | CompilerId::Clang => vec![format!("-std=c++{std}")],
                CompilerId::Msvc => match std {
                    "14" => vec!["/std:c++14".to_string()],
                    "17" => vec!["/std:c++17".to_string()],
                    "20" => vec!["/std:c++latest".to_string()],
                    _ => Vec::new(),
                },
            }
        }
        Some(other) => return Err(BuildError::unknown_value(context, "C++-Version", other)),
    };

    // The full per-language flag block of a deduced compile command:
    // language flags, debug/optimize injections, then the fixed tail with
    // the <FLAGS>/<IN>/<OUT> placeholders.
    let base_flags = |want_cxx: bool| -> Vec<String> {
        let mut ret = Vec::new();
        if want_cxx {
            ret.extend(opts.cxx_flags.iter().flatten().cloned());
            ret.extend(cxx_version_flags.iter().cloned());
        } else {
            ret.extend(opts.c_flags.iter().flatten().cloned());
            ret.extend(c_version_flags.iter().cloned());
        }
        if is_msvc {
            let mut rt_lib = "/MT";
            if do_optimize {
                ret.push("/O2".to_string());
            }
            if do_debug {
                ret.extend(["/Z7".to_string(), "/DEBUG".to_string()]);
                rt_lib = "/MTd";
            }
            ret.push(rt_lib.to_string());
            if want_cxx {
                ret.push("/EHsc".to_string());
            }
            ret.extend(
                ["/nologo", "/permissive-", "<FLAGS>", "/c", "<IN>", "/Fo<OUT>"]
                    .map(String::from),
            );
        } else if is_gnu_like {
            if do_optimize {
                ret.push("-O2".to_string());
            }
            if do_debug {
                ret.push("-g".to_string());
            }
            ret.extend(
                ["-fPIC", "-fdiagnostics-color", "-pthread", "<FLAGS>", "-c", "<IN>", "-o<OUT>"]
                    .map(String::from),
            );
        }
        ret.extend(opts.flags.iter().flatten().cloned());
        ret
    };

    let compile_template = |want_cxx: bool,
                            overridden: &Option<Vec<String>>|
     -> BuildResult<Vec<String>> {
        if let Some(full) = overridden {
            return Ok(full.clone());
        }
        let mut cmd = Vec::new();
        cmd.extend(opts.compiler_launcher.iter().flatten().cloned());
        cmd.push(get_compiler(want_cxx)?);
        cmd.extend(base_flags(want_cxx));
        Ok(cmd)
    };

    let c_compile = compile_template(false, &opts.c_compile_file)?;
    let cxx_compile = compile_template(true, &opts.cxx_compile_file)?;

    let include_template = match opts.include_template {
        Some(t) => t,
        None => {
            if is_gnu_like {
                vec!["-I".to_string(), "<PATH>".to_string()]
            } else if is_msvc {
                vec!["/I".to_string(), "<PATH>".to_string()]
            } else {
                return Err(BuildError::cannot_deduce(context, "'Include-Template'"));
            }
        }
    };

    let external_include_template = match opts.external_include_template {
        Some(t) => t,
        None => {
            if is_gnu_like {
                vec!["-isystem".to_string(), "<PATH>".to_string()]
            } else if is_msvc {
                // MSVC external-header support is not ready; plain /I.
                vec!["/I".to_string(), "<PATH>".to_string()]
            } else {
                // Without a compiler id there is nothing better than the
                // regular include template.
                include_template.clone()
            }
        }
    };

    let define_template = match opts.define_template {
        Some(t) => t,
        None => {
            if is_gnu_like {
                vec!["-D".to_string(), "<DEF>".to_string()]
            } else if is_msvc {
                vec!["/D".to_string(), "<DEF>".to_string()]
            } else {
                return Err(BuildError::cannot_deduce(context, "'Define-Template'"));
            }
        }
    };

    let warning_flags = match opts.warning_flags {
        Some(f) => f,
        // Absent warning flags are not an error, just no warnings.
        None if is_msvc => vec!["/W4".to_string()],
        None if is_gnu_like => ["-Wall", "-Wextra", "-Wpedantic", "-Wconversion"]
            .map(String::from)
            .to_vec(),
        None => Vec::new(),
    };

    let link_archive = match opts.create_archive {
        Some(t) => t,
        None => {
            if is_msvc {
                ["lib", "/nologo", "/OUT:<OUT>", "<IN>"].map(String::from).to_vec()
            } else if is_gnu_like {
                ["ar", "rcs", "<OUT>", "<IN>"].map(String::from).to_vec()
            } else {
                return Err(BuildError::cannot_deduce(context, "archive creation rules"));
            }
        }
    };

    let link_flags = {
        let mut ret = Vec::new();
        if is_msvc {
            let mut rt_lib = "/MT";
            if do_optimize {
                ret.push("/O2".to_string());
            }
            if do_debug {
                ret.extend(["/Z7".to_string(), "/DEBUG".to_string()]);
                rt_lib = "/MTd";
            }
            ret.push(rt_lib.to_string());
        } else if is_gnu_like {
            if do_optimize {
                ret.push("-O2".to_string());
            }
            if do_debug {
                ret.push("-g".to_string());
            }
        }
        ret.extend(opts.link_flags.iter().flatten().cloned());
        ret
    };

    let link_exe = match opts.link_executable {
        Some(t) => t,
        None => {
            let mut ret = match compiler_id {
                Some(CompilerId::Msvc) => vec![
                    get_compiler(true)?,
                    "/nologo".to_string(),
                    "/EHsc".to_string(),
                    "<IN>".to_string(),
                    "/Fe<OUT>".to_string(),
                ],
                Some(CompilerId::Gnu) => vec![
                    get_compiler(true)?,
                    "-fPIC".to_string(),
                    "-fdiagnostics-color".to_string(),
                    "<IN>".to_string(),
                    "-pthread".to_string(),
                    "-lstdc++fs".to_string(),
                    "-o<OUT>".to_string(),
                ],
                Some(CompilerId::Clang) => vec![
                    get_compiler(true)?,
                    "-fPIC".to_string(),
                    "-fdiagnostics-color".to_string(),
                    "<IN>".to_string(),
                    "-pthread".to_string(),
                    "-o<OUT>".to_string(),
                ],
                None => {
                    return Err(BuildError::cannot_deduce(
                        context,
                        "how to link executables",
                    ))
                }
            };
            ret.extend(link_flags);
            ret
        }
    };

    let archive_suffix = match opts.archive_suffix {
        Some(s) => s,
        None if is_gnu_like => ".a".to_string(),
        None if is_msvc => ".lib".to_string(),
        None => {
            return Err(BuildError::cannot_deduce(
                context,
                "the archive file extension",
            ))
        }
    };

    let object_suffix = match opts.object_suffix {
        Some(s) => s,
        None if is_gnu_like => ".o".to_string(),
        None if is_msvc => ".obj".to_string(),
        None => {
            return Err(BuildError::cannot_deduce(
                context,
                "the object file extension",
            ))
        }
    };

    let exe_suffix = opts.exe_suffix.unwrap_or_else(|| {
        if cfg!(windows) { ".exe" } else { "" }.to_string()
    });

    Ok(ToolchainPrep {
        c_compile,
        cxx_compile,
        include_template,
        external_include_template,
        define_template,
        link_archive,
        link_exe,
        warning_flags,
        archive_prefix: opts.archive_prefix.unwrap_or_else(|| "lib".to_string()),
        archive_suffix,
        object_prefix: opts.object_prefix.unwrap_or_default(),
        object_suffix,
        exe_prefix: opts.exe_prefix.unwrap_or_default(),
        exe_suffix,
        deps_mode,
    })
}
