//! devsync - rsync and git remotes for SSH dev hosts
//!
//! Commands:
//! - push: Sync a local folder to the remote project directory
//! - pull: Sync a remote project folder back to the local one
//! - remote list: List remotes from the SSH config
//! - remote add: Register a remote as a git remote and run its setup script

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use devsync::{
    remote::{self, RemoteSetup},
    ssh_config,
    sync::{ProjectLayout, SyncDirection, SyncOptions, Syncer},
    DevsyncError,
};
use devsync_core::{Config, Paths, SystemRunner};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devsync")]
#[command(about = "Push, pull and git remotes for dev hosts in your SSH config")]
#[command(version)]
#[command(after_help = r#"WHEN TO USE:
    Editing locally while building and running on a remote dev host.
    Remotes are the Host aliases in ~/.ssh/config; projects live under
    ~/dev/<project> on the remote, where <project> is the name of the
    current directory.

WORKFLOW:
    1. devsync remote list             # See available hosts
    2. devsync remote add devbox       # git remote + remote setup
    3. devsync push devbox src -c      # First push, create the dir
    4. devsync pull devbox build       # Bring artifacts back

EXAMPLES:
    devsync push devbox src --dry-run  # Show what would be sent
    devsync pull devbox logs           # Copy ~/dev/<project>/logs/ here
    devsync remote list --json         # Machine-readable remotes

CONFIG:
    ~/.config/devsync/config.toml (all keys optional):
        remote_root  = "~/dev"
        repo_root    = "~/dev/repo"
        setup_script = "~/bin/setup_remote.sh"
        ssh_config   = "~/.ssh/config"

LOGGING:
    RUST_LOG=devsync=debug shows every external command.
"#)]
struct Cli {
    /// SSH client config to read remotes from
    #[arg(long, global = true)]
    ssh_config: Option<PathBuf>,

    /// devsync config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync a local folder to the remote project directory
    Push(SyncArgs),

    /// Sync a remote project folder to the local folder
    Pull(SyncArgs),

    /// List remotes or register one as a git remote
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
}

#[derive(Args)]
struct SyncArgs {
    /// Host alias from the SSH config
    remote_name: String,

    /// Folder relative to the project root
    folder: String,

    /// Show what would be synced without doing it
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Create the folder on the remote first
    #[arg(short = 'c', long)]
    create_dir: bool,
}

#[derive(Subcommand)]
enum RemoteAction {
    /// List remote machines (alias: ls)
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a local git remote, then create the repo and working dir on the remote
    Add {
        /// Host alias from the SSH config
        remote_name: String,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

/// Print an error and pick the exit status
fn report(err: &anyhow::Error) -> ExitCode {
    eprintln!("error: {:#}", err);

    match err.downcast_ref::<DevsyncError>() {
        Some(e) => {
            if let Some(hint) = e.hint() {
                eprintln!("{}", hint);
            }
            ExitCode::from(e.exit_code())
        }
        None => ExitCode::FAILURE,
    }
}

/// Settings shared by every command
struct Workspace {
    config: Config,
    ssh_config: PathBuf,
    runner: SystemRunner,
}

impl Workspace {
    fn load(cli_config: Option<&Path>, cli_ssh_config: Option<&Path>) -> Result<Self> {
        let paths = Paths::new();
        let config = match cli_config {
            Some(path) => Config::load_required(path)?,
            None => Config::load(&paths.config_file())?,
        };
        let ssh_config = config.ssh_config_path(&paths, cli_ssh_config);

        Ok(Self {
            config,
            ssh_config,
            runner: SystemRunner,
        })
    }

    fn remotes(&self) -> Result<devsync::Remotes> {
        let remotes = ssh_config::read_remotes(&self.ssh_config).map_err(DevsyncError::from)?;
        Ok(remotes)
    }

    fn layout(&self) -> Result<ProjectLayout> {
        let cwd = std::env::current_dir().context("Failed to read the current directory")?;
        let layout = ProjectLayout::for_dir(&cwd, &self.config.remote_root)?;
        Ok(layout)
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Workspace::load(cli.config.as_deref(), cli.ssh_config.as_deref())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Push(args) => cmd_sync(&ctx, SyncDirection::Push, &args, &mut out),
        Commands::Pull(args) => cmd_sync(&ctx, SyncDirection::Pull, &args, &mut out),
        Commands::Remote { action } => match action {
            RemoteAction::List { json } => cmd_list(&ctx, json, &mut out),
            RemoteAction::Add { remote_name } => cmd_add(&ctx, &remote_name, &mut out),
        },
    }
}

/// Push or pull a folder
fn cmd_sync(
    ctx: &Workspace,
    direction: SyncDirection,
    args: &SyncArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let remotes = ctx.remotes()?;
    let entry = remote::resolve(&remotes, &args.remote_name)?;
    let layout = ctx.layout()?;

    let options = SyncOptions::default()
        .dry_run(args.dry_run)
        .create_dir(args.create_dir);

    Syncer::new(&ctx.runner, entry, &layout).sync(direction, &args.folder, &options, out)?;
    Ok(())
}

/// List remotes from the SSH config
fn cmd_list(ctx: &Workspace, json: bool, out: &mut dyn Write) -> Result<()> {
    let remotes = ctx.remotes()?;

    if json {
        remote::list_json(&remotes, out)?;
    } else {
        remote::list(&remotes, out)?;
    }

    Ok(())
}

/// Register a git remote and prepare the dev host
fn cmd_add(ctx: &Workspace, name: &str, out: &mut dyn Write) -> Result<()> {
    let remotes = ctx.remotes()?;
    let entry = remote::resolve(&remotes, name)?;
    let layout = ctx.layout()?;

    RemoteSetup::new(
        &ctx.runner,
        entry,
        &layout.project,
        &ctx.config.repo_root,
        &ctx.config.setup_script,
    )
    .add(out)?;

    Ok(())
}
