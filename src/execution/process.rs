//! Process handle supplied by the caller.

use std::fmt;

use tokio::io::AsyncWrite;
use tokio::process::Command;

use crate::capture::Sink;

/// A configured, not yet started child process.
///
/// Program, arguments, environment and working directory are set on the
/// wrapped [`Command`]. Output sinks attached here receive a raw copy of the
/// corresponding stream. Stdio settings on the command itself are replaced,
/// since the supervisor always pipes both output streams.
pub struct Process {
    command: Command,
    stdout: Option<Sink>,
    stderr: Option<Sink>,
}

impl Process {
    /// Wrap a prepared command.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            stdout: None,
            stderr: None,
        }
    }

    /// Copy the child's stdout to `sink`.
    pub fn stdout<W>(mut self, sink: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.stdout = Some(Box::new(sink));
        self
    }

    /// Copy the child's stderr to `sink`.
    pub fn stderr<W>(mut self, sink: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.stderr = Some(Box::new(sink));
        self
    }

    /// Access the wrapped command for further configuration.
    pub fn command_mut(&mut self) -> &mut Command {
        &mut self.command
    }

    /// Program name, for error messages and logs.
    pub fn program(&self) -> String {
        self.command
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned()
    }

    pub(crate) fn into_parts(self) -> (Command, Option<Sink>, Option<Sink>) {
        (self.command, self.stdout, self.stderr)
    }
}

impl From<Command> for Process {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

impl From<std::process::Command> for Process {
    fn from(command: std::process::Command) -> Self {
        Self::new(Command::from(command))
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("command", &self.command)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}
