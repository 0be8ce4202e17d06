//! Build planning and execution tests, driven by a scripted process
//! runner so no real compiler is needed.

use keel_build::plan::{BuildEnv, BuildPlan, LibraryBuildParams, LibraryPlan};
use keel_build::toolchain::{parse_kv_text, parse_toolchain, Toolchain};
use keel_build::{
    BuildError, Library, ProcessOutput, ProcessRunner, SourceKind, SourceRoot, Usage, UsageMap,
    UsageRequirements,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Records every command and fails those matching a predicate.
struct FakeRunner {
    commands: Mutex<Vec<Vec<String>>>,
    fail_when: Box<dyn Fn(&[String]) -> bool + Send + Sync>,
}

impl FakeRunner {
    fn ok() -> Self {
        Self::failing(|_| false)
    }

    fn failing(pred: impl Fn(&[String]) -> bool + Send + Sync + 'static) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_when: Box::new(pred),
        }
    }

    fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, argv: &[String]) -> std::io::Result<ProcessOutput> {
        self.commands.lock().unwrap().push(argv.to_vec());
        let fails = (self.fail_when)(argv);
        Ok(ProcessOutput {
            exit_code: i32::from(fails),
            output: if fails { "scripted failure\n".to_string() } else { String::new() },
            duration: Duration::from_millis(1),
        })
    }
}

fn gnu_toolchain() -> Toolchain {
    parse_toolchain(
        &parse_kv_text("Compiler-ID: GNU\nDeps-Mode: None"),
        "test-toolchain",
    )
    .unwrap()
}

/// Write a library source tree and return its model.
fn make_library(root: &Path, name: &str, files: &[&str]) -> Library {
    let src = root.join(name).join("src");
    fs::create_dir_all(&src).unwrap();
    for file in files {
        let path = src.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "int x;\n").unwrap();
    }
    Library::new(name, SourceRoot::new(&src))
}

fn make_env<'a>(runner: &'a FakeRunner, out_root: &Path) -> BuildEnv<'a> {
    BuildEnv {
        toolchain: gnu_toolchain(),
        output_root: out_root.to_path_buf(),
        usage: UsageMap::new(),
        runner,
    }
}

#[test]
fn test_plan_shape_for_mixed_library() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(
        temp.path(),
        "math",
        &["vec.cpp", "mat.cpp", "vec.hpp", "tool.main.cpp", "vec.test.cpp"],
    );

    let plan = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("math"),
            build_apps: true,
            build_tests: true,
            ..Default::default()
        },
    )
    .unwrap();

    // Headers are not compiled; lib sources + app + test are.
    assert_eq!(plan.compile_files.len(), 4);
    assert!(plan.create_archive.is_some());
    assert_eq!(plan.link_executables.len(), 2);

    let exe_names: Vec<&str> = plan
        .link_executables
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(exe_names, vec!["tool", "vec"]);

    // Tests build into an extra "test" subdirectory.
    let test_exe = plan
        .link_executables
        .iter()
        .find(|e| e.main_compile.source.kind == SourceKind::Test)
        .unwrap();
    assert_eq!(test_exe.out_subdir, PathBuf::from("math/test"));
}

#[test]
fn test_plan_skips_apps_and_tests_when_disabled() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(temp.path(), "math", &["vec.cpp", "tool.main.cpp", "vec.test.cpp"]);

    let plan = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("math"),
            build_apps: false,
            build_tests: false,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(plan.compile_files.len(), 1);
    assert!(plan.link_executables.is_empty());
}

#[test]
fn test_same_stem_sources_get_distinct_objects() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(
        temp.path(),
        "math",
        &["vec.cpp", "vec.test.cpp", "a/util.cpp", "b/util.cpp"],
    );

    let plan = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("math"),
            build_tests: true,
            ..Default::default()
        },
    )
    .unwrap();

    let tc = gnu_toolchain();
    let objects: Vec<PathBuf> = plan
        .compile_files
        .iter()
        .map(|cf| cf.object_file_path(&tc))
        .collect();

    // The library source, its .test counterpart, and same-named files in
    // different subdirectories all compile to distinct objects.
    let mut deduped = objects.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), objects.len(), "object paths collide: {objects:?}");

    assert!(objects.contains(&PathBuf::from("math/obj/vec.cpp.o")));
    assert!(objects.contains(&PathBuf::from("math/obj/vec.test.cpp.o")));
    assert!(objects.contains(&PathBuf::from("math/obj/a/util.cpp.o")));
    assert!(objects.contains(&PathBuf::from("math/obj/b/util.cpp.o")));
}

#[test]
fn test_header_only_library_has_no_archive() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(temp.path(), "hdr", &["span.hpp"]);

    let plan = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("hdr"),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(plan.compile_files.is_empty());
    assert!(plan.create_archive.is_none());
}

#[test]
fn test_execute_runs_compile_archive_link_in_order() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(temp.path(), "math", &["vec.cpp", "mat.cpp", "tool.main.cpp"]);

    let plan_lib = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("math"),
            build_apps: true,
            ..Default::default()
        },
    )
    .unwrap();
    let mut plan = BuildPlan::new();
    plan.add_library(plan_lib);

    let runner = FakeRunner::ok();
    let out_root = temp.path().join("_build");
    let env = make_env(&runner, &out_root);
    plan.execute(&env, 1).unwrap();

    let commands = runner.commands();
    assert_eq!(commands.len(), 5, "3 compiles + 1 archive + 1 link");

    // Single-worker submission preserves plan order (lib sources in
    // sorted order, then executable sources), with the archive and link
    // after the barrier.
    assert!(commands[0].iter().any(|a| a.ends_with("mat.cpp")));
    assert!(commands[1].iter().any(|a| a.ends_with("vec.cpp")));
    assert!(commands[2].iter().any(|a| a.ends_with("tool.main.cpp")));
    assert_eq!(commands[3][0], "ar");
    assert_eq!(commands[4][0], "g++");

    // The archive consumes exactly the objects the compile pass produced
    // for lib sources (never the app object).
    let compiled_objects: Vec<String> = commands[..3]
        .iter()
        .filter_map(|argv| {
            argv.iter()
                .find(|a| a.starts_with("-o"))
                .map(|a| a["-o".len()..].to_string())
        })
        .collect();
    let archive_inputs = &commands[3][3..];
    for input in archive_inputs {
        assert!(
            compiled_objects.contains(input),
            "archive input {input} was never compiled"
        );
    }
    assert_eq!(archive_inputs.len(), 2);
    assert!(!archive_inputs.iter().any(|a| a.contains("tool")));

    // The link consumes the app object and the archive.
    let link_cmd = &commands[4];
    assert!(link_cmd.iter().any(|a| a.ends_with("tool.main.cpp.o")));
    assert!(link_cmd.iter().any(|a| a.ends_with("libmath.a")));
}

#[test]
fn test_link_pulls_usage_requirements() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(temp.path(), "app", &["main.main.cpp"]);
    let lib = lib.with_uses(vec![Usage::new("acme", "math")]);

    let plan_lib = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("app"),
            build_apps: true,
            ..Default::default()
        },
    )
    .unwrap();
    let mut plan = BuildPlan::new();
    plan.add_library(plan_lib);

    let runner = FakeRunner::ok();
    let out_root = temp.path().join("_build");
    let mut env = make_env(&runner, &out_root);
    env.usage
        .add(
            "acme",
            "math",
            UsageRequirements {
                include_paths: vec![temp.path().join("math/include")],
                linkable_path: Some(temp.path().join("libmath.a")),
                uses: vec![],
                links: vec![],
            },
        )
        .unwrap();

    plan.execute(&env, 1).unwrap();
    let commands = runner.commands();

    // Compile sees the dependency's headers as external includes.
    let compile = &commands[0];
    let isystem = compile.iter().position(|a| a == "-isystem").unwrap();
    assert!(compile[isystem + 1].ends_with("math/include"));

    // Link sees the dependency's archive.
    let link = commands.last().unwrap();
    assert!(link.iter().any(|a| a.ends_with("libmath.a")));
}

#[test]
fn test_compile_failure_is_fail_fast_and_aggregated() {
    let temp = tempfile::tempdir().unwrap();
    let files: Vec<String> = (0..100).map(|i| format!("f{i:03}.cpp")).collect();
    let file_refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
    let lib = make_library(temp.path(), "big", &file_refs);

    let plan_lib = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("big"),
            ..Default::default()
        },
    )
    .unwrap();
    let mut plan = BuildPlan::new();
    plan.add_library(plan_lib);

    let runner = FakeRunner::failing(|argv| argv.iter().any(|a| a.ends_with("f017.cpp")));
    let out_root = temp.path().join("_build");
    let env = make_env(&runner, &out_root);

    let err = plan.execute(&env, 4).unwrap_err();
    match err {
        BuildError::CompilePassFailed { failed, total } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 100);
        }
        other => panic!("expected CompilePassFailed, got {other:?}"),
    }

    // No archive or link command ever ran.
    let commands = runner.commands();
    assert!(commands.iter().all(|argv| argv[0] != "ar"));
    assert!(commands.iter().all(|argv| !argv.iter().any(|a| a.ends_with("libbig.a"))));
}

#[test]
fn test_archive_failure_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(temp.path(), "math", &["vec.cpp"]);

    let plan_lib = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("math"),
            ..Default::default()
        },
    )
    .unwrap();
    let mut plan = BuildPlan::new();
    plan.add_library(plan_lib);

    let runner = FakeRunner::failing(|argv| argv[0] == "ar");
    let out_root = temp.path().join("_build");
    let env = make_env(&runner, &out_root);

    let err = plan.execute(&env, 1).unwrap_err();
    match err {
        BuildError::ArchiveFailed { name, output, .. } => {
            assert_eq!(name, "math");
            assert!(output.contains("scripted failure"));
        }
        other => panic!("expected ArchiveFailed, got {other:?}"),
    }
}

#[test]
fn test_gnu_depfile_becomes_sidecar() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(temp.path(), "math", &["vec.cpp"]);
    let out_root = temp.path().join("_build");

    // A runner that writes the depfile the way a GNU compiler would.
    struct DepfileRunner;
    impl ProcessRunner for DepfileRunner {
        fn run(&self, argv: &[String]) -> std::io::Result<ProcessOutput> {
            if let Some(mf) = argv.iter().position(|a| a == "-MF") {
                let depfile = &argv[mf + 1];
                let out = &argv[mf + 3];
                fs::write(depfile, format!("{out}: src/vec.cpp src/vec.hpp\n"))?;
            }
            Ok(ProcessOutput {
                exit_code: 0,
                output: String::new(),
                duration: Duration::from_millis(1),
            })
        }
    }

    let plan_lib = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("math"),
            ..Default::default()
        },
    )
    .unwrap();
    let mut plan = BuildPlan::new();
    plan.add_library(plan_lib);

    let env = BuildEnv {
        toolchain: parse_toolchain(&parse_kv_text("Compiler-ID: GNU"), "t").unwrap(),
        output_root: out_root.clone(),
        usage: UsageMap::new(),
        runner: &DepfileRunner,
    };
    plan.compile_all(&env, 1).unwrap();

    let sidecar = out_root.join("math/obj/vec.cpp.o.deps.json");
    let text = fs::read_to_string(&sidecar).unwrap();
    let parsed: keel_build::depfile::DepsSidecar = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed.dependencies,
        vec![PathBuf::from("src/vec.cpp"), PathBuf::from("src/vec.hpp")]
    );
}

#[test]
fn test_failed_compile_writes_no_sidecar() {
    let temp = tempfile::tempdir().unwrap();
    let lib = make_library(temp.path(), "math", &["vec.cpp"]);
    let out_root = temp.path().join("_build");

    // A failing compiler that still leaves a partial depfile behind, as
    // GCC can when it dies mid-translation-unit.
    struct PartialDepfileRunner;
    impl ProcessRunner for PartialDepfileRunner {
        fn run(&self, argv: &[String]) -> std::io::Result<ProcessOutput> {
            if let Some(mf) = argv.iter().position(|a| a == "-MF") {
                fs::write(&argv[mf + 1], "vec.cpp.o: src/vec.cpp\n")?;
            }
            Ok(ProcessOutput {
                exit_code: 1,
                output: "vec.cpp:3: error: expected ';'\n".to_string(),
                duration: Duration::from_millis(1),
            })
        }
    }

    let plan_lib = LibraryPlan::create(
        &lib,
        &LibraryBuildParams {
            out_subdir: PathBuf::from("math"),
            ..Default::default()
        },
    )
    .unwrap();
    let mut plan = BuildPlan::new();
    plan.add_library(plan_lib);

    let env = BuildEnv {
        toolchain: parse_toolchain(&parse_kv_text("Compiler-ID: GNU"), "t").unwrap(),
        output_root: out_root.clone(),
        usage: UsageMap::new(),
        runner: &PartialDepfileRunner,
    };
    plan.compile_all(&env, 1).unwrap_err();

    assert!(!out_root.join("math/obj/vec.cpp.o.deps.json").exists());
}
