//! devsync Core - Shared functionality for the devsync tool
//!
//! Standard paths, the optional TOML config, and the process runner every
//! external `ssh`, `rsync` and `git` call goes through.

pub mod config;
pub mod paths;
pub mod process;

pub use config::Config;
pub use paths::Paths;
pub use process::{CommandRunner, Exit, Invocation, ProcessError, SystemRunner};
