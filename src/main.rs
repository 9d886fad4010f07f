//! dumpsplit: split a Wikimedia dump into per-article wikitext artifacts

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dumpsplit::{
    config::{Config, LogFormat, LoggingConfig},
    extract::DumpLocation,
};
use std::path::PathBuf;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dumpsplit")]
#[command(about = "Split a compressed MediaWiki dump into wikitext files keyed by Wikidata id")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the identifier map, then extract and write every mapped page
    Run {
        /// page_props SQL dump (path or URL)
        #[arg(long)]
        mappings: Option<DumpLocation>,

        /// pages-articles XML dump (path or URL)
        #[arg(long)]
        pages: Option<DumpLocation>,

        /// Write to this directory instead of the configured outputs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Maximum writes in flight (0 = unbounded)
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Abort on the first failed write
        #[arg(long)]
        fail_fast: bool,

        /// Suppress the progress spinner
        #[arg(short, long)]
        quiet: bool,

        /// Write the run summary as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Build the identifier map only
    Mappings {
        /// page_props SQL dump (path or URL)
        #[arg(long)]
        mappings: Option<DumpLocation>,

        /// Write the map as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = logging.effective_level(verbose);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    match logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Init { path } => {
            init_logging(&LoggingConfig::default(), cli.verbose)?;
            return commands::init::init_config(path).await;
        }
        other => other,
    };

    // Precedence: file < environment < flags
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.apply_env()?;
    init_logging(&config.logging, cli.verbose)?;

    match command {
        Commands::Run {
            mappings,
            pages,
            output_dir,
            max_concurrent,
            fail_fast,
            quiet,
            summary,
        } => {
            if let Some(mappings) = mappings {
                config.sources.mappings = mappings;
            }
            if let Some(pages) = pages {
                config.sources.pages = pages;
            }
            if let Some(dir) = output_dir {
                config.set_output_dir(dir);
            }
            if let Some(max) = max_concurrent {
                config.pipeline.max_concurrent = max;
            }
            if fail_fast {
                config.set_fail_fast();
            }
            config.pipeline.quiet |= quiet;
            config.validate()?;

            commands::run::run_pipeline(config, summary).await
        }
        Commands::Mappings { mappings, output } => {
            if let Some(mappings) = mappings {
                config.sources.mappings = mappings;
            }
            config.validate()?;

            commands::mappings::build_mappings(config, output).await
        }
        Commands::Init { .. } => Ok(()),
    }
}
