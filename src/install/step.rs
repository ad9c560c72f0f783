//! Install steps and the executor seam they run through.

use crate::process::Cmd;
use anyhow::{Context, Result};
use std::path::Path;

/// One named external invocation with a structured argument list.
///
/// Immutable once built; success means exit code 0. Sequencing is the
/// caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl InstallStep {
    pub fn new<S: Into<String>>(name: &str, program: S, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            program: program.into(),
            args,
        }
    }

    /// Human-readable command line for status output.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Executor seam: production spawns real processes, tests script exit codes.
pub trait CommandRunner {
    /// Run a step to completion and return its exit code.
    fn run(&self, step: &InstallStep) -> Result<i32>;

    /// Run a step and capture its stdout along with the exit code.
    fn capture(&self, step: &InstallStep) -> Result<(i32, Vec<u8>)>;
}

/// Runner that spawns the step's program directly, blocking until it exits.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, step: &InstallStep) -> Result<i32> {
        let status = Cmd::new(&step.program)
            .args(&step.args)
            .allow_fail()
            .run()
            .with_context(|| format!("step '{}' could not be spawned", step.name))?;
        Ok(status.code().unwrap_or(-1))
    }

    fn capture(&self, step: &InstallStep) -> Result<(i32, Vec<u8>)> {
        let output = Cmd::new(&step.program)
            .args(&step.args)
            .allow_fail()
            .output()
            .with_context(|| format!("step '{}' could not be spawned", step.name))?;
        Ok((output.status.code().unwrap_or(-1), output.stdout))
    }
}

/// Make a bundled installer binary executable if it is not already.
///
/// The binaries ship without the execute bit on some installs; this is a
/// one-time fix and a no-op on every later call.
#[cfg(unix)]
pub fn ensure_executable(binary: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(binary)
        .with_context(|| format!("installer binary missing: {}", binary.display()))?;
    let mut permissions = metadata.permissions();
    if permissions.mode() & 0o111 == 0 {
        permissions.set_mode(permissions.mode() | 0o755);
        std::fs::set_permissions(binary, permissions)
            .with_context(|| format!("could not mark {} executable", binary.display()))?;
    }
    Ok(())
}
