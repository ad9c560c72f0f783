//! Structured external process invocation.
//!
//! Every external tool is spawned with an explicit argv vector; nothing is
//! routed through a shell, so mount points or ISO names containing spaces or
//! shell metacharacters cannot change the meaning of a command.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Output};

/// Builder for running an external command.
///
/// `run()` treats a nonzero exit status as an error (with the message set by
/// [`Cmd::error_msg`]) unless [`Cmd::allow_fail`] was called, in which case
/// the caller inspects the returned status itself.
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    error_msg: Option<String>,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            error_msg: None,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument without lossy string conversion.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    /// Don't error on nonzero exit; the caller checks the status.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Message used when the command exits nonzero.
    pub fn error_msg(mut self, msg: &str) -> Self {
        self.error_msg = Some(msg.to_string());
        self
    }

    /// Run the command, inheriting stdout/stderr.
    pub fn run(self) -> Result<ExitStatus> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .with_context(|| format!("failed to run {}", self.program.to_string_lossy()))?;

        if !status.success() && !self.allow_fail {
            match self.error_msg {
                Some(msg) => bail!("{} (exit: {})", msg, status),
                None => bail!(
                    "{} failed with status {}",
                    self.program.to_string_lossy(),
                    status
                ),
            }
        }

        Ok(status)
    }

    /// Run the command and capture stdout/stderr.
    pub fn output(self) -> Result<Output> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("failed to run {}", self.program.to_string_lossy()))?;

        if !output.status.success() && !self.allow_fail {
            match self.error_msg {
                Some(msg) => bail!("{} (exit: {})", msg, output.status),
                None => bail!(
                    "{} failed with status {}",
                    self.program.to_string_lossy(),
                    output.status
                ),
            }
        }

        Ok(output)
    }
}
