//! Persistent exiftool process
//!
//! Spawning exiftool costs far more than the work per file, so one process is
//! kept alive in `-stay_open` mode and fed argument batches over stdin. Each
//! batch ends with `-execute`; exiftool answers with its output followed by a
//! `{ready}` line.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use anyhow::{bail, Context, Result};
use tracing::debug;

/// Program name looked up on `PATH` when no explicit binary is given
pub const DEFAULT_PROGRAM: &str = "exiftool";

/// Check that the exiftool binary can be run
pub fn is_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-ver")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub struct ExiftoolRunner {
    program: PathBuf,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ExiftoolRunner {
    /// Create a new ExiftoolRunner with a persistent exiftool process
    pub fn new(program: &Path) -> Result<Self> {
        let mut child = Command::new(program)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!(
                "Failed to spawn {}. Make sure exiftool is installed and in PATH.",
                program.display()
            ))?;

        let stdin = BufWriter::new(
            child.stdin.take()
                .context("Failed to get stdin handle for exiftool process")?
        );

        let stdout = BufReader::new(
            child.stdout.take()
                .context("Failed to get stdout handle for exiftool process")?
        );

        debug!(program = %program.display(), "Started exiftool");
        Ok(Self {
            program: program.to_path_buf(),
            child,
            stdin,
            stdout,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run one argument batch and return everything printed before `{ready}`.
    pub(crate) fn execute(&mut self, args: &[String]) -> Result<String> {
        for arg in args {
            writeln!(self.stdin, "{}", arg)?;
        }
        writeln!(self.stdin, "-execute")?;
        self.stdin.flush()?;

        let mut output = String::new();
        loop {
            let mut line = String::new();
            let bytes_read = self.stdout.read_line(&mut line)?;
            if bytes_read == 0 {
                bail!("Unexpected EOF from exiftool process");
            }

            let trimmed = line.trim();
            if trimmed.starts_with("{ready") && trimmed.ends_with('}') {
                break;
            }
            output.push_str(&line);
        }

        Ok(output)
    }
}

impl Drop for ExiftoolRunner {
    fn drop(&mut self) {
        // Gracefully shut down exiftool
        let _ = writeln!(self.stdin, "-stay_open");
        let _ = writeln!(self.stdin, "False");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}
