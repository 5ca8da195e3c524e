//! SSH client config reading
//!
//! Extracts the `Host` aliases of an OpenSSH client config together with
//! their `Hostname` and `User` values. Only those three keywords matter;
//! everything else in the file is skipped.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading the SSH client config
#[derive(Error, Debug)]
pub enum SshConfigError {
    #[error("SSH config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read SSH config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("SSH config line {line}: {keyword} appears before any Host entry")]
    FieldOutsideHost { line: usize, keyword: String },
}

/// A remote host resolved from the SSH config
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    /// Alias from the `Host` line
    pub alias: String,

    /// Hostname or IP address
    pub hostname: String,

    /// Login user, if the block sets one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl RemoteEntry {
    pub fn new(alias: &str, hostname: &str, user: Option<&str>) -> Self {
        Self {
            alias: alias.to_string(),
            hostname: hostname.to_string(),
            user: user.map(str::to_string),
        }
    }

    /// Get the login destination (user@hostname, or hostname alone)
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.hostname),
            None => self.hostname.clone(),
        }
    }
}

/// Remotes keyed by alias, in alphabetical order
pub type Remotes = BTreeMap<String, RemoteEntry>;

#[derive(Default)]
struct Block {
    hostname: Option<String>,
    user: Option<String>,
}

/// Where the parser currently writes fields
#[derive(Clone, Copy)]
enum Scope<'a> {
    /// Nothing opened yet
    Start,
    /// Inside a wildcard `Host` or a `Match` block
    Skipped,
    Host(&'a str),
}

/// Read and parse the SSH config at `path`
pub fn read_remotes(path: &Path) -> Result<Remotes, SshConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SshConfigError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(SshConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let remotes = parse(&contents)?;
    tracing::debug!(path = %path.display(), count = remotes.len(), "parsed SSH config");
    Ok(remotes)
}

/// Parse SSH config text into remotes.
///
/// Keywords are matched case-sensitively on the first token of each line.
/// A repeated alias starts over from an empty block.
pub fn parse(contents: &str) -> Result<Remotes, SshConfigError> {
    let mut blocks: BTreeMap<String, Block> = BTreeMap::new();
    let mut scope = Scope::Start;

    for (index, line) in contents.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let value = tokens.next();

        match keyword {
            "Host" if line.contains('*') => scope = Scope::Skipped,
            "Host" => match value {
                Some(alias) => {
                    blocks.insert(alias.to_string(), Block::default());
                    scope = Scope::Host(alias);
                }
                None => scope = Scope::Skipped,
            },
            "Match" => scope = Scope::Skipped,
            "Hostname" | "User" => {
                let alias = match scope {
                    Scope::Start => {
                        return Err(SshConfigError::FieldOutsideHost {
                            line: index + 1,
                            keyword: keyword.to_string(),
                        });
                    }
                    Scope::Skipped => continue,
                    Scope::Host(alias) => alias,
                };
                let Some(value) = value else {
                    continue;
                };

                let block = blocks.entry(alias.to_string()).or_default();
                if keyword == "Hostname" {
                    block.hostname = Some(value.to_string());
                } else {
                    block.user = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(blocks
        .into_iter()
        .map(|(alias, block)| {
            let entry = RemoteEntry {
                hostname: block.hostname.unwrap_or_else(|| alias.clone()),
                user: block.user,
                alias: alias.clone(),
            };
            (alias, entry)
        })
        .collect())
}
