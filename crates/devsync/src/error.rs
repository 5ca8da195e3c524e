//! Error taxonomy and exit-code classification

use devsync_core::process::{Exit, ProcessError};
use std::io;
use thiserror::Error;

use crate::ssh_config::SshConfigError;

/// rsync: "error in rsync protocol data stream", usually a missing remote dir
const RSYNC_PROTOCOL_STREAM: i32 = 12;
/// git: fatal error, which `git remote add` uses for an existing remote
const GIT_FATAL: i32 = 128;
/// `test -f` result when the file is absent
const TEST_FALSE: i32 = 1;

/// Errors surfaced by devsync commands
#[derive(Error, Debug)]
pub enum DevsyncError {
    #[error(transparent)]
    SshConfig(#[from] SshConfigError),

    #[error("Unknown remote '{0}': no matching Host entry in the SSH config")]
    UnknownRemote(String),

    #[error("rsync failed with exit code 12")]
    RemoteDirMissing,

    #[error("remote {0} already exists, delete it first")]
    GitRemoteExists(String),

    #[error("git remote add failed with exit code {0}")]
    GitFailed(i32),

    #[error("cannot find {script} on remote machine {alias}")]
    SetupScriptMissing { alias: String, script: String },

    #[error("{program} failed with exit code {code}")]
    ProcessFailed { program: String, code: i32 },

    #[error("{program} was terminated by a signal")]
    Terminated { program: String },

    #[error("Cannot derive a project name from {0}")]
    ProjectName(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DevsyncError {
    /// Process exit status for this error.
    ///
    /// Failures of `rsync` and `ssh` keep their own exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            DevsyncError::RemoteDirMissing => RSYNC_PROTOCOL_STREAM as u8,
            DevsyncError::GitRemoteExists(_) | DevsyncError::GitFailed(_) => 2,
            DevsyncError::ProcessFailed { code, .. } => u8::try_from(*code).unwrap_or(1),
            _ => 1,
        }
    }

    /// Guidance printed after the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            DevsyncError::RemoteDirMissing => Some(
                "possibly the directory does not exist on the remote machine\n\
                 create it with the --create-dir flag",
            ),
            _ => None,
        }
    }
}

/// The external command whose exit is being interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind<'a> {
    Rsync,
    GitRemoteAdd { remote: &'a str },
    SetupScriptCheck { alias: &'a str, script: &'a str },
    Ssh,
}

impl CommandKind<'_> {
    pub fn program(&self) -> &'static str {
        match self {
            CommandKind::Rsync => "rsync",
            CommandKind::GitRemoteAdd { .. } => "git",
            CommandKind::SetupScriptCheck { .. } | CommandKind::Ssh => "ssh",
        }
    }
}

/// Map an external command's exit onto the error taxonomy
pub fn classify(kind: CommandKind<'_>, exit: Exit) -> Result<(), DevsyncError> {
    let code = match exit {
        Exit::Success => return Ok(()),
        Exit::Signaled => {
            return Err(DevsyncError::Terminated {
                program: kind.program().to_string(),
            });
        }
        Exit::Failure(code) => code,
    };

    Err(match (kind, code) {
        (CommandKind::Rsync, RSYNC_PROTOCOL_STREAM) => DevsyncError::RemoteDirMissing,
        (CommandKind::GitRemoteAdd { remote }, GIT_FATAL) => {
            DevsyncError::GitRemoteExists(remote.to_string())
        }
        (CommandKind::GitRemoteAdd { .. }, code) => DevsyncError::GitFailed(code),
        (CommandKind::SetupScriptCheck { alias, script }, TEST_FALSE) => {
            DevsyncError::SetupScriptMissing {
                alias: alias.to_string(),
                script: script.to_string(),
            }
        }
        (kind, code) => DevsyncError::ProcessFailed {
            program: kind.program().to_string(),
            code,
        },
    })
}
