// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use viewengine_cli::commands;
use viewengine_cli::config::{Config, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "viewengine")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Master-page template rendering CLI", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page or partial to stdout
    Render {
        /// Registered view name, relative to the views root
        name: String,
        /// JSON file bound as the template data
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Views root directory (overrides the config)
        #[arg(long)]
        root: Option<String>,
        /// Glob pattern under the root (repeatable, overrides the config)
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
    /// List registered pages and partials
    List {
        /// Views root directory (overrides the config)
        #[arg(long)]
        root: Option<String>,
        /// Glob pattern under the root (repeatable, overrides the config)
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load_from(&cli.config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Render {
            name,
            data,
            root,
            patterns,
        } => {
            config.views.apply_overrides(root, patterns);
            commands::render::run(&config, &name, data.as_deref(), &mut out)
        }
        Commands::List { root, patterns } => {
            config.views.apply_overrides(root, patterns);
            commands::list::run(&config, &mut out)
        }
    }
}
