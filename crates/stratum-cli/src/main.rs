//! stratum command-line front end
//!
//! Mounts one or more directories as translators and runs a single file
//! operation through the routing layer.
//!
//! This binary:
//! 1. Parses command-line arguments and environment variables
//! 2. Builds the layer configuration (JSON file, then flag overrides)
//! 3. Registers every `--mount` directory in the order given
//! 4. Runs the requested command and reports failures through the exit code

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use stratum_vfs::backend::LocalTranslator;
use stratum_vfs::{Vfs, VfsConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stratum")]
#[command(about = "Route file operations through layered directories", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory to mount as a translator (repeatable, earlier mounts win)
    #[arg(short, long = "mount", value_name = "DIR", global = true)]
    mounts: Vec<PathBuf>,

    /// Application root; paths inside it resolve relative to each mount
    #[arg(long, env = "STRATUM_APP_ROOT", global = true)]
    app_root: Option<PathBuf>,

    /// Override the platform case policy
    #[arg(long, env = "STRATUM_CASE_SENSITIVE", global = true)]
    case_sensitive: Option<bool>,

    /// JSON configuration file loaded before flag overrides
    #[arg(short, long, env = "STRATUM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the merged contents of a directory
    Ls {
        /// Directory to list
        #[arg(default_value = "//")]
        dir: String,

        /// Glob patterns an entry must match (all of them)
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,

        /// Include hidden entries
        #[arg(short, long)]
        all: bool,

        /// List directories only
        #[arg(long, conflicts_with = "files_only")]
        dirs_only: bool,

        /// List files only
        #[arg(long)]
        files_only: bool,
    },

    /// Print a file to standard output
    Cat {
        /// File to read
        path: String,
    },

    /// Show what the first answering mount knows about a path
    Stat {
        /// File or directory
        path: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Copy a file between any two mounts
    Cp {
        /// Source file
        source: String,
        /// Destination file
        dest: String,
    },

    /// Rename a file in the first mount that holds it
    Mv {
        /// Existing name
        source: String,
        /// New name
        dest: String,
    },

    /// Remove a file from every mount
    Rm {
        /// File to remove
        path: String,
    },

    /// Create a directory in the first mount
    Mkdir {
        /// Directory to create
        dir: String,
    },

    /// Remove an empty directory from every mount
    Rmdir {
        /// Directory to remove
        dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let vfs = build_layer(&cli)?;

    match cli.command {
        Commands::Ls {
            dir,
            patterns,
            all,
            dirs_only,
            files_only,
        } => {
            let options = commands::ListOptions {
                hidden: all,
                dirs_only,
                files_only,
            };
            for name in commands::list(&vfs, &dir, &patterns, options)? {
                println!("{name}");
            }
        }
        Commands::Cat { path } => {
            let mut stdout = std::io::stdout().lock();
            commands::cat(&vfs, &path, &mut stdout)?;
        }
        Commands::Stat { path, json } => {
            let report = commands::stat(&vfs, &path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                print!("{report}");
            }
        }
        Commands::Cp { source, dest } => commands::copy(&vfs, &source, &dest)?,
        Commands::Mv { source, dest } => commands::rename(&vfs, &source, &dest)?,
        Commands::Rm { path } => commands::remove(&vfs, &path)?,
        Commands::Mkdir { dir } => commands::mkdir(&vfs, &dir)?,
        Commands::Rmdir { dir } => commands::rmdir(&vfs, &dir)?,
    }

    Ok(())
}

/// Build the layer and mount every requested directory.
///
/// With no `--mount` the current directory is mounted.
fn build_layer(cli: &Cli) -> Result<Arc<Vfs>> {
    let mut config = match &cli.config {
        Some(path) => VfsConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VfsConfig::default(),
    };
    if let Some(root) = &cli.app_root {
        let root = std::path::absolute(root)
            .with_context(|| format!("Invalid app root {}", root.display()))?;
        config = config.with_app_root(root);
    }
    if let Some(case_sensitive) = cli.case_sensitive {
        config = config.with_case_sensitive(case_sensitive);
    }
    debug!("Layer configuration: {:?}", config);

    let case_sensitive = config.case_sensitive;
    let marker = config.root_marker.clone();
    let vfs = Vfs::new(config).context("Invalid layer configuration")?;

    let mounts = if cli.mounts.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cli.mounts.clone()
    };
    for dir in &mounts {
        let translator = LocalTranslator::new(dir)
            .with_context(|| format!("Cannot mount {}", dir.display()))?
            .with_root_marker(marker.clone())
            .with_case_sensitive(case_sensitive);
        info!("Mounted {}", translator.base().display());
        vfs.register_translator(Arc::new(translator));
    }

    Ok(vfs)
}
