//! Subprocess execution behind a narrow trait.
//!
//! The build executor only ever needs "run this argv, give me the exit code
//! and combined output". Keeping that behind [`ProcessRunner`] lets the
//! tests script compiler behavior without ever spawning anything.

use std::io;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Result of running one subprocess to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Process exit code (-1 when terminated by a signal).
    pub exit_code: i32,
    /// Combined stdout + stderr.
    pub output: String,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn okay(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs argv vectors produced by the toolchain.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, argv: &[String]) -> io::Result<ProcessOutput>;
}

/// The real runner: spawns the command and captures its output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> io::Result<ProcessOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty command line")
        })?;

        let start = Instant::now();
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        let duration = start.elapsed();

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));

        Ok(ProcessOutput {
            exit_code: out.status.code().unwrap_or(-1),
            output,
            duration,
        })
    }
}

/// Render an argv vector for diagnostics, quoting words that need it.
pub fn quote_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"') {
                format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
