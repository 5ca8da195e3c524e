//! devsync - push, pull and git remotes for SSH dev hosts
//!
//! Reads remotes from the OpenSSH client config, mirrors project folders
//! with rsync, and registers dev hosts as git remotes.

pub mod error;
pub mod remote;
pub mod ssh;
pub mod ssh_config;
pub mod sync;

#[cfg(test)]
mod testing;

pub use error::{classify, CommandKind, DevsyncError};
pub use remote::RemoteSetup;
pub use ssh::SshConnection;
pub use ssh_config::{RemoteEntry, Remotes, SshConfigError};
pub use sync::{ProjectLayout, SyncCommand, SyncDirection, SyncOptions, Syncer};
