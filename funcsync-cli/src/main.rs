//! funcsync — keep a function registry in step with template changes.
//!
//! # Usage
//!
//! ```text
//! funcsync handle <event.json> [--repos-root DIR]
//! funcsync sync --repo DIR --after REV [--before REV]
//! funcsync diff --repo DIR --after REV [--before REV] [--json]
//! funcsync registry list [--json]
//! funcsync registry remove <function>
//! ```
//!
//! Every command accepts `--home DIR` to use a different home directory.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, handle::HandleArgs, registry::RegistryCommand, sync::SyncArgs, Workspace,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "funcsync",
    version,
    about = "Synchronize a function registry with infrastructure template changes",
    long_about = None,
)]
struct Cli {
    /// Home directory holding `.funcsync/` (defaults to the user's home).
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a commit trigger event and print the invocation result.
    Handle(HandleArgs),

    /// Diff two revisions of a local repository and update the registry.
    Sync(SyncArgs),

    /// Show the line changes a sync would act on, without touching the registry.
    Diff(DiffArgs),

    /// Inspect or edit the registry directly.
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let workspace = Workspace::resolve(cli.home)?;
    match cli.command {
        Commands::Handle(args) => args.run(&workspace),
        Commands::Sync(args) => args.run(&workspace),
        Commands::Diff(args) => args.run(&workspace),
        Commands::Registry { command } => commands::registry::run(command, &workspace),
    }
}

/// Log to stderr so JSON output on stdout stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
