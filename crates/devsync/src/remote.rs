//! Remote management: listing SSH remotes and registering git remotes
//!
//! `add` registers a local git remote pointing at the project's bare
//! repository on the dev host, then runs the host's setup script, which
//! creates the working directory, the bare repository and its hooks.

use devsync_core::process::{quote_remote_path, shell_quote, CommandRunner, Invocation};
use std::io::Write;
use tracing::info;

use crate::error::{classify, CommandKind, DevsyncError};
use crate::ssh::SshConnection;
use crate::ssh_config::{RemoteEntry, Remotes};

/// Look up a remote by alias
pub fn resolve<'a>(remotes: &'a Remotes, alias: &str) -> Result<&'a RemoteEntry, DevsyncError> {
    remotes
        .get(alias)
        .ok_or_else(|| DevsyncError::UnknownRemote(alias.to_string()))
}

/// Print one `<alias> <user>@<hostname>` line per remote
pub fn list(remotes: &Remotes, out: &mut dyn Write) -> Result<(), DevsyncError> {
    for entry in remotes.values() {
        writeln!(out, "{} {}", entry.alias, entry.destination())?;
    }
    Ok(())
}

/// Print the remotes as a JSON array
pub fn list_json(remotes: &Remotes, out: &mut dyn Write) -> Result<(), DevsyncError> {
    let entries: Vec<&RemoteEntry> = remotes.values().collect();
    serde_json::to_writer_pretty(&mut *out, &entries)?;
    writeln!(out)?;
    Ok(())
}

/// URL of the project's bare repository on the remote
pub fn git_url(entry: &RemoteEntry, repo_root: &str, project: &str) -> String {
    format!(
        "ssh://{}/{}/{}.git",
        entry.destination(),
        repo_root.trim_end_matches('/'),
        project
    )
}

/// Registers a dev host as a git remote and prepares it
pub struct RemoteSetup<'a> {
    runner: &'a dyn CommandRunner,
    entry: &'a RemoteEntry,
    project: &'a str,
    repo_root: &'a str,
    setup_script: &'a str,
}

impl<'a> RemoteSetup<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        entry: &'a RemoteEntry,
        project: &'a str,
        repo_root: &'a str,
        setup_script: &'a str,
    ) -> Self {
        Self {
            runner,
            entry,
            project,
            repo_root,
            setup_script,
        }
    }

    /// Add the git remote, check for the setup script, then run it.
    ///
    /// Stops at the first failure. A git remote added before a later step
    /// fails is left in place.
    pub fn add(&self, out: &mut dyn Write) -> Result<(), DevsyncError> {
        let alias = self.entry.alias.as_str();
        let url = git_url(self.entry, self.repo_root, self.project);

        let git = Invocation::new("git").args(["remote", "add", alias, url.as_str()]);
        classify(CommandKind::GitRemoteAdd { remote: alias }, self.runner.status(&git)?)?;
        writeln!(out, "added local git remote {} -> {}", alias, url)?;

        let ssh = SshConnection::new(self.entry);
        let script = quote_remote_path(self.setup_script);

        let check = ssh.exec(self.runner, &format!("[ -f {} ]", script))?;
        classify(
            CommandKind::SetupScriptCheck {
                alias,
                script: self.setup_script,
            },
            check,
        )?;

        writeln!(out, "setup remote")?;
        info!(remote = alias, project = self.project, "running setup script");

        let mut write_error = None;
        let exit = ssh.stream(
            self.runner,
            &format!("{} {}", script, shell_quote(self.project)),
            &mut |line: &str| {
                if write_error.is_none() {
                    if let Err(e) = writeln!(out, "{}", line) {
                        write_error = Some(e);
                    }
                }
            },
        )?;
        if let Some(e) = write_error {
            return Err(e.into());
        }

        classify(CommandKind::Ssh, exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh_config::parse;
    use crate::testing::RecordingRunner;
    use devsync_core::process::Exit;

    const SCRIPT: &str = "~/bin/setup_remote.sh";

    fn remotes() -> Remotes {
        parse("Host devbox\n    Hostname 10.0.0.5\n    User alice\n").unwrap()
    }

    fn run_add(runner: &RecordingRunner, out: &mut Vec<u8>) -> Result<(), DevsyncError> {
        let remotes = remotes();
        let entry = resolve(&remotes, "devbox")?;
        RemoteSetup::new(runner, entry, "myapp", "~/dev/repo", SCRIPT).add(out)
    }

    #[test]
    fn test_list() -> Result<(), DevsyncError> {
        let mut out: Vec<u8> = Vec::new();
        list(&remotes(), &mut out)?;
        assert_eq!(String::from_utf8_lossy(&out), "devbox alice@10.0.0.5\n");
        Ok(())
    }

    #[test]
    fn test_list_is_alphabetical() -> Result<(), DevsyncError> {
        let remotes = parse("Host zeta\n  Hostname z\nHost alpha\n  Hostname a\n  User me\n")?;
        let mut out: Vec<u8> = Vec::new();
        list(&remotes, &mut out)?;
        assert_eq!(String::from_utf8_lossy(&out), "alpha me@a\nzeta z\n");
        Ok(())
    }

    #[test]
    fn test_list_json() -> Result<(), DevsyncError> {
        let mut out: Vec<u8> = Vec::new();
        list_json(&remotes(), &mut out)?;

        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(value[0]["alias"], "devbox");
        assert_eq!(value[0]["hostname"], "10.0.0.5");
        assert_eq!(value[0]["user"], "alice");
        Ok(())
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve(&remotes(), "prod").unwrap_err();
        assert!(matches!(err, DevsyncError::UnknownRemote(ref alias) if alias == "prod"));
    }

    #[test]
    fn test_git_url() {
        let entry = RemoteEntry::new("devbox", "10.0.0.5", Some("alice"));
        assert_eq!(
            git_url(&entry, "~/dev/repo/", "myapp"),
            "ssh://alice@10.0.0.5/~/dev/repo/myapp.git"
        );
    }

    #[test]
    fn test_add_full_flow() -> Result<(), DevsyncError> {
        let runner = RecordingRunner::new().with_output(["created ~/dev/myapp", "installed hooks"]);
        let mut out: Vec<u8> = Vec::new();

        run_add(&runner, &mut out)?;

        let calls: Vec<String> = runner.calls().iter().map(ToString::to_string).collect();
        assert_eq!(
            calls,
            vec![
                "git remote add devbox ssh://alice@10.0.0.5/~/dev/repo/myapp.git",
                "ssh devbox [ -f ~/'bin/setup_remote.sh' ]",
                "ssh devbox ~/'bin/setup_remote.sh' 'myapp'",
            ]
        );
        assert_eq!(
            String::from_utf8_lossy(&out),
            "added local git remote devbox -> ssh://alice@10.0.0.5/~/dev/repo/myapp.git\n\
             setup remote\n\
             created ~/dev/myapp\n\
             installed hooks\n"
        );
        Ok(())
    }

    #[test]
    fn test_add_existing_git_remote_stops_early() {
        let runner = RecordingRunner::new().with_exits([Exit::Failure(128)]);
        let mut out: Vec<u8> = Vec::new();

        let err = run_add(&runner, &mut out).unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("already exists"));
        assert_eq!(runner.calls().len(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_add_other_git_failure_exits_2() {
        let runner = RecordingRunner::new().with_exits([Exit::Failure(1)]);
        let err = run_add(&runner, &mut Vec::new()).unwrap_err();

        assert!(matches!(err, DevsyncError::GitFailed(1)));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_add_missing_setup_script() {
        let runner = RecordingRunner::new().with_exits([Exit::Success, Exit::Failure(1)]);
        let mut out: Vec<u8> = Vec::new();

        let err = run_add(&runner, &mut out).unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.to_string(),
            "cannot find ~/bin/setup_remote.sh on remote machine devbox"
        );
        // git remote was added, script never ran
        assert_eq!(runner.calls().len(), 2);
        assert!(String::from_utf8_lossy(&out).starts_with("added local git remote"));
    }

    #[test]
    fn test_add_setup_script_failure_propagates() {
        let runner =
            RecordingRunner::new().with_exits([Exit::Success, Exit::Success, Exit::Failure(3)]);

        let err = run_add(&runner, &mut Vec::new()).unwrap_err();

        assert!(matches!(err, DevsyncError::ProcessFailed { code: 3, .. }));
        assert_eq!(runner.calls().len(), 3);
    }

    #[test]
    fn test_project_name_is_quoted() -> Result<(), DevsyncError> {
        let runner = RecordingRunner::new();
        let entry = RemoteEntry::new("devbox", "10.0.0.5", Some("alice"));

        RemoteSetup::new(&runner, &entry, "my app", "~/dev/repo", SCRIPT)
            .add(&mut std::io::sink())?;

        let calls = runner.calls();
        assert_eq!(calls[2].args[1], "~/'bin/setup_remote.sh' 'my app'");
        Ok(())
    }
}
