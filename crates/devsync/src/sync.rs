//! File synchronization with rsync
//!
//! Push and pull share one rsync command; only the order of the local and
//! remote paths differs.

use devsync_core::process::{quote_remote_path, CommandRunner, Invocation};
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::{classify, CommandKind, DevsyncError};
use crate::ssh::SshConnection;
use crate::ssh_config::RemoteEntry;

/// Direction of file sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Local to remote
    Push,
    /// Remote to local
    Pull,
}

/// Options for file synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Show what would be transferred without writing anything
    pub dry_run: bool,

    /// Create the remote folder before syncing
    pub create_dir: bool,
}

impl SyncOptions {
    /// Enable dry run
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enable remote directory creation
    pub fn create_dir(mut self, enabled: bool) -> Self {
        self.create_dir = enabled;
        self
    }

    fn rsync_flags(&self) -> &'static str {
        if self.dry_run {
            "-aznP"
        } else {
            "-azP"
        }
    }
}

/// Where a project lives on the remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Project name, the base name of the local working directory
    pub project: String,

    /// Remote directory holding all projects (e.g. `~/dev`)
    pub remote_root: String,
}

impl ProjectLayout {
    pub fn new(project: &str, remote_root: &str) -> Self {
        Self {
            project: project.to_string(),
            remote_root: remote_root.trim_end_matches('/').to_string(),
        }
    }

    /// Derive the project name from `dir`'s base name
    pub fn for_dir(dir: &Path, remote_root: &str) -> Result<Self, DevsyncError> {
        let project = project_name(dir)?;
        Ok(Self::new(&project, remote_root))
    }

    /// Remote path of `folder` inside this project, always ending in `/`
    pub fn remote_folder(&self, folder: &str) -> String {
        format!(
            "{}/{}/{}",
            self.remote_root,
            self.project,
            normalize_folder(folder)
        )
    }
}

/// Base name of a directory, used to namespace remote paths
pub fn project_name(dir: &Path) -> Result<String, DevsyncError> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| DevsyncError::ProjectName(dir.display().to_string()))
}

/// Ensure a folder ends with `/` so rsync syncs its contents, not the
/// folder itself.
pub fn normalize_folder(folder: &str) -> String {
    if folder.is_empty() {
        "./".to_string()
    } else if folder.ends_with('/') {
        folder.to_string()
    } else {
        format!("{}/", folder)
    }
}

/// A fully resolved rsync transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    pub direction: SyncDirection,
    /// rsync flags, e.g. `-azP`
    pub flags: &'static str,
    /// Local folder, slash-terminated
    pub local: String,
    /// `user@host:path/`, slash-terminated
    pub remote: String,
}

impl SyncCommand {
    pub fn build(
        direction: SyncDirection,
        entry: &RemoteEntry,
        layout: &ProjectLayout,
        folder: &str,
        options: &SyncOptions,
    ) -> Self {
        Self {
            direction,
            flags: options.rsync_flags(),
            local: normalize_folder(folder),
            remote: format!("{}:{}", entry.destination(), layout.remote_folder(folder)),
        }
    }

    /// The base command without paths
    pub fn base(&self) -> Invocation {
        Invocation::new("rsync").arg(self.flags)
    }

    pub fn source(&self) -> &str {
        match self.direction {
            SyncDirection::Push => &self.local,
            SyncDirection::Pull => &self.remote,
        }
    }

    pub fn destination(&self) -> &str {
        match self.direction {
            SyncDirection::Push => &self.remote,
            SyncDirection::Pull => &self.local,
        }
    }

    pub fn invocation(&self) -> Invocation {
        self.base().arg(self.source()).arg(self.destination())
    }
}

/// File synchronizer using rsync
pub struct Syncer<'a> {
    runner: &'a dyn CommandRunner,
    entry: &'a RemoteEntry,
    layout: &'a ProjectLayout,
}

impl<'a> Syncer<'a> {
    /// Create a new syncer for a remote
    pub fn new(
        runner: &'a dyn CommandRunner,
        entry: &'a RemoteEntry,
        layout: &'a ProjectLayout,
    ) -> Self {
        Self {
            runner,
            entry,
            layout,
        }
    }

    /// Create `folder` inside the project directory on the remote
    pub fn create_remote_dir(
        &self,
        folder: &str,
        out: &mut dyn Write,
    ) -> Result<(), DevsyncError> {
        writeln!(
            out,
            "creating dir {} on remote machine {}",
            folder, self.entry.alias
        )?;

        let path = self.layout.remote_folder(folder);
        let exit = SshConnection::new(self.entry)
            .exec(self.runner, &format!("mkdir -p {}", quote_remote_path(&path)))?;

        classify(CommandKind::Ssh, exit)
    }

    /// Sync `folder` in the given direction
    pub fn sync(
        &self,
        direction: SyncDirection,
        folder: &str,
        options: &SyncOptions,
        out: &mut dyn Write,
    ) -> Result<(), DevsyncError> {
        if options.create_dir {
            self.create_remote_dir(folder, out)?;
        }

        let command = SyncCommand::build(direction, self.entry, self.layout, folder, options);
        info!(
            source = command.source(),
            destination = command.destination(),
            dry_run = options.dry_run,
            "syncing"
        );

        let exit = self.runner.status(&command.invocation())?;
        classify(CommandKind::Rsync, exit)
    }
}
