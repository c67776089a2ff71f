//! MyST CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "myst")]
#[command(version)]
#[command(about = "MyST document engine", long_about = None)]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build files of a project and write them in one output format
    Build {
        /// Input files, relative to the project root
        files: Vec<String>,

        /// Project root; `myst.yml` is read from here
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Output format (html, latex, typst, jats, docx, myst-json)
        #[arg(short = 't', long, default_value = "html")]
        to: String,

        /// Output directory (defaults to `_build/<format>` under the root)
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Run executable cells
        #[arg(long)]
        execute: bool,

        /// Execute cells even when the cache has their outputs
        #[arg(long)]
        force_execute: bool,

        /// Execution cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Files processed concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Rule id whose diagnostics are dropped (repeatable)
        #[arg(long = "suppress")]
        suppressed_rules: Vec<String>,

        /// Write the body only, without a document preamble
        #[arg(long)]
        fragment: bool,

        /// Run latexmk or typst on the written sources
        #[arg(long)]
        compile: bool,
    },

    /// Rewrite a JSON tree at another schema version
    Migrate {
        /// File holding a `{"mystVersion", "tree"}` envelope
        input: PathBuf,

        /// Target schema version (defaults to the current one)
        #[arg(long)]
        to: Option<u32>,

        /// Write to FILE instead of standard output
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Build {
            files,
            root,
            to,
            out,
            execute,
            force_execute,
            cache_dir,
            workers,
            suppressed_rules,
            fragment,
            compile,
        } => {
            let summary = commands::build::execute(commands::build::BuildArgs {
                files,
                root,
                to,
                out,
                execute,
                force_execute,
                cache_dir,
                workers,
                suppressed_rules,
                fragment,
                compile,
            })?;
            if summary.has_errors {
                anyhow::bail!(
                    "build finished with errors ({} of {} files failed)",
                    summary.failed,
                    summary.inputs
                );
            }
            Ok(())
        }
        Commands::Migrate { input, to, output } => {
            commands::migrate::execute(commands::migrate::MigrateArgs { input, to, output })
        }
    }
}
