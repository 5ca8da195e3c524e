//! Remote command execution over SSH
//!
//! Commands address the host by its SSH config alias, so ports, identity
//! files and jump hosts configured for it still apply.

use devsync_core::process::{CommandRunner, Exit, Invocation, ProcessError};

use crate::ssh_config::RemoteEntry;

/// SSH connection handler
pub struct SshConnection<'a> {
    entry: &'a RemoteEntry,
}

impl<'a> SshConnection<'a> {
    /// Create a new SSH connection for a remote
    pub fn new(entry: &'a RemoteEntry) -> Self {
        Self { entry }
    }

    /// Build the `ssh <alias> <command>` invocation
    pub fn command(&self, remote_command: &str) -> Invocation {
        Invocation::new("ssh")
            .arg(&self.entry.alias)
            .arg(remote_command)
    }

    /// Execute a command on the remote host
    pub fn exec(
        &self,
        runner: &dyn CommandRunner,
        remote_command: &str,
    ) -> Result<Exit, ProcessError> {
        runner.status(&self.command(remote_command))
    }

    /// Execute a command, handing each line of its output to `on_line`
    pub fn stream(
        &self,
        runner: &dyn CommandRunner,
        remote_command: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Exit, ProcessError> {
        runner.stream_lines(&self.command(remote_command), on_line)
    }
}
