mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "srcsrv_indexer=debug"
    } else {
        "srcsrv_indexer=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Index {
            source,
            pdbs,
            tools,
            backup,
        } => {
            let config = cli::load_config(cli.config.as_deref(), &tools, Some(&backup))?;
            cli::index(&source, &pdbs, &config)?;
        }
        Commands::Render {
            source,
            paths,
            tools,
            backup,
        } => {
            let config = cli::load_config(cli.config.as_deref(), &tools, Some(&backup))?;
            cli::render(&source, &paths, &config)?;
        }
        Commands::Status { file, tools } => {
            let config = cli::load_config(cli.config.as_deref(), &tools, None)?;
            cli::status(&file, &config)?;
        }
    }

    Ok(())
}
