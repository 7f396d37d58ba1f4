//! External command execution for the sync pipeline.
//!
//! All stages shell out to system tools (`git`, `cp`, `systemctl`) through
//! the [`CommandRunner`] trait so the pipeline can be driven without
//! touching the real system in tests.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::process::Command;

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl StageCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a command that was spawned and ran to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

/// Runs external commands on behalf of the sync pipeline.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion. An `Err` means it could not be spawned.
    fn run<'a>(&'a self, command: &'a StageCommand) -> BoxFuture<'a, io::Result<CommandOutput>>;
}

/// Runs commands as child processes of the server.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run<'a>(&'a self, command: &'a StageCommand) -> BoxFuture<'a, io::Result<CommandOutput>> {
        Box::pin(async move {
            let output = Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .output()
                .await?;

            Ok(CommandOutput {
                success: output.status.success(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        })
    }
}
