//! Command-line argument handling for `xbps-remove` (§6).

use std::path::PathBuf;

use clap::Parser;

/// Remove installed packages, following the exact flag surface of the removal front-end (§6).
#[derive(Debug, Parser)]
#[clap(about = "Remove installed packages", author, name = "xbps-remove", version)]
pub struct Cli {
    /// Path to a configuration file.
    #[arg(short = 'C', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Package cache directory.
    #[arg(short, long, value_name = "DIR")]
    pub cachedir: Option<PathBuf>,

    /// Enable debug-level trace events.
    #[arg(short, long)]
    pub debug: bool,

    /// Proceed even with blocking reverse dependencies.
    #[arg(short = 'F', long = "force-revdeps")]
    pub force_revdeps: bool,

    /// Force removal of files even where that would normally be refused.
    #[arg(short, long)]
    pub force: bool,

    /// Plan only: print what would happen, mutate nothing.
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Invoke the cache-cleaner collaborator before anything else runs.
    #[arg(short = 'O', long = "clean-cache")]
    pub clean_cache: bool,

    /// Also queue every current orphan for removal.
    #[arg(short = 'o', long = "remove-orphans")]
    pub remove_orphans: bool,

    /// Include automatic-only transitive dependencies of the named packages.
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Alternate installation root.
    #[arg(short, long, value_name = "DIR")]
    pub rootdir: Option<PathBuf>,

    /// Emit a progress event per file removed, not only per package.
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the interactive confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// The packages to remove. Ignored (but accepted) if `--remove-orphans` is the only request.
    #[arg(value_name = "PKGNAME")]
    pub packages: Vec<String>,
}
