//! Process execution
//!
//! Every external program devsync calls is described as an [`Invocation`]
//! and run through a [`CommandRunner`], so command composition can be
//! checked without spawning `ssh`, `rsync` or `git`.

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::debug;

/// Errors starting or talking to a child process
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read output of {program}: {source}")]
    Output {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> ProcessError {
        ProcessError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a finished process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// Non-zero exit code
    Failure(i32),
    /// Killed by a signal, no exit code
    Signaled,
}

impl Exit {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Exit::Success,
            Some(code) => Exit::Failure(code),
            None => Exit::Signaled,
        }
    }
}

impl From<ExitStatus> for Exit {
    fn from(status: ExitStatus) -> Self {
        Exit::from_code(status.code())
    }
}

/// Runs external programs to completion
pub trait CommandRunner {
    /// Run with inherited stdio and wait for it to finish
    fn status(&self, invocation: &Invocation) -> Result<Exit, ProcessError>;

    /// Run with stdout piped, handing each line to `on_line` as it arrives
    fn stream_lines(
        &self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Exit, ProcessError>;
}

/// Runner backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn status(&self, invocation: &Invocation) -> Result<Exit, ProcessError> {
        debug!(command = %invocation, "running");

        let mut cmd = invocation.command();
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = cmd.status().map_err(|e| invocation.spawn_error(e))?;
        let exit = Exit::from(status);

        debug!(command = %invocation.program, ?exit, "finished");
        Ok(exit)
    }

    fn stream_lines(
        &self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Exit, ProcessError> {
        debug!(command = %invocation, "running (streaming stdout)");

        let mut cmd = invocation.command();
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|e| invocation.spawn_error(e))?;

        // The reader is dropped before waiting so a child still writing
        // after a read error gets EPIPE instead of blocking.
        let forwarded = match child.stdout.take() {
            Some(stdout) => forward_lines(BufReader::new(stdout), on_line),
            None => Ok(()),
        };

        let status = child.wait().map_err(|e| invocation.spawn_error(e))?;
        let exit = Exit::from(status);

        forwarded.map_err(|source| ProcessError::Output {
            program: invocation.program.clone(),
            source,
        })?;

        debug!(command = %invocation.program, ?exit, "finished");
        Ok(exit)
    }
}

/// Hand each line of `reader` to `on_line` without its line ending.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the stream.
fn forward_lines(mut reader: impl BufRead, on_line: &mut dyn FnMut(&str)) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        on_line(&String::from_utf8_lossy(&buf));
    }
}

/// Quote a string for a POSIX shell
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Quote a remote path, leaving a leading `~/` bare so the remote shell
/// still expands it to the remote home.
pub fn quote_remote_path(path: &str) -> String {
    if path == "~" {
        return path.to_string();
    }
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", shell_quote(rest)),
        None => shell_quote(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("git").args(["remote", "add"]).arg("devbox");
        assert_eq!(inv.to_string(), "git remote add devbox");
        assert_eq!(inv.args.len(), 3);
    }

    #[test]
    fn test_exit_from_code() {
        assert_eq!(Exit::from_code(Some(0)), Exit::Success);
        assert_eq!(Exit::from_code(Some(12)), Exit::Failure(12));
        assert_eq!(Exit::from_code(None), Exit::Signaled);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("simple"), "'simple'");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_quote_remote_path_keeps_tilde_bare() {
        assert_eq!(quote_remote_path("~/dev/app/src/"), "~/'dev/app/src/'");
        assert_eq!(quote_remote_path("~/"), "~/");
        assert_eq!(quote_remote_path("~"), "~");
        assert_eq!(quote_remote_path("/srv/dev"), "'/srv/dev'");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_status() -> Result<(), ProcessError> {
        let runner = SystemRunner;
        assert_eq!(runner.status(&Invocation::new("true"))?, Exit::Success);
        assert_eq!(runner.status(&Invocation::new("false"))?, Exit::Failure(1));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_streams_lines() -> Result<(), ProcessError> {
        let mut lines = Vec::new();
        let exit = SystemRunner.stream_lines(
            &Invocation::new("sh").args(["-c", "printf 'one\\ntwo\\n'"]),
            &mut |line: &str| lines.push(line.to_string()),
        )?;

        assert_eq!(exit, Exit::Success);
        assert_eq!(lines, vec!["one", "two"]);
        Ok(())
    }

    #[test]
    fn test_forward_lines_replaces_invalid_utf8() -> io::Result<()> {
        let input: &[u8] = b"ok\n\xffbad\r\nlast";
        let mut lines = Vec::new();

        forward_lines(input, &mut |line: &str| lines.push(line.to_string()))?;

        assert_eq!(lines, vec!["ok", "\u{FFFD}bad", "last"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_keeps_streaming_past_invalid_utf8() -> Result<(), ProcessError> {
        let mut lines = Vec::new();
        let exit = SystemRunner.stream_lines(
            &Invocation::new("sh").args(["-c", "printf 'ok\\n\\377bad\\nafter\\n'; exit 0"]),
            &mut |line: &str| lines.push(line.to_string()),
        )?;

        assert_eq!(exit, Exit::Success);
        assert_eq!(lines, vec!["ok", "\u{FFFD}bad", "after"]);
        Ok(())
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = SystemRunner
            .status(&Invocation::new("devsync-no-such-program"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
