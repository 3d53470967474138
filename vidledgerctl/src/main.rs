//! `vidledgerctl`: sync, inspect and report on the local upload catalog.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidledger_config::{
    Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides,
};
use vidledger_core::SyncRunner;

mod report;

#[derive(Parser)]
#[command(
    name = "vidledgerctl",
    version,
    about = "Keep a local catalog of a channel's uploads in sync with YouTube"
)]
struct Cli {
    /// TOML config file (default: $VIDLEDGER_CONFIG_PATH, vidledger.toml
    /// or config/vidledger.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Env file loaded before reading the environment (default: .env)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the uploads listing, merge new entries and fill in durations
    Sync(SyncArgs),
    /// List livestreams in the catalog, newest first
    Report {
        #[command(flatten)]
        catalog: CatalogArg,
        /// Also list non-livestream entries as skipped
        #[arg(long)]
        all: bool,
    },
    /// Show how many entries still lack a duration
    Pending {
        #[command(flatten)]
        catalog: CatalogArg,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

#[derive(Args)]
struct CatalogArg {
    /// Catalog file to use instead of the configured one
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args)]
struct SyncArgs {
    #[command(flatten)]
    catalog: CatalogArg,
    /// Playlist to walk (default: uploads of the authenticated channel)
    #[arg(long)]
    playlist: Option<String>,
    /// Items requested per listing page (1-50)
    #[arg(long)]
    page_size: Option<u32>,
    /// Duration batches of up to 50 ids per run
    #[arg(long)]
    max_batches: Option<usize>,
    /// Stop after the first page with nothing new (may miss uploads)
    #[arg(long)]
    early_stop: bool,
    /// Fail instead of starting an empty catalog when the file is missing
    #[arg(long)]
    require_catalog: bool,
}

impl Command {
    fn overrides(&self) -> ConfigOverrides {
        match self {
            Command::Sync(args) => ConfigOverrides {
                catalog_path: args.catalog.catalog.clone(),
                playlist_id: args.playlist.clone(),
                page_size: args.page_size,
                max_batches: args.max_batches,
                early_stop: args.early_stop,
                require_catalog: args.require_catalog,
            },
            Command::Report { catalog, .. } | Command::Pending { catalog } => {
                ConfigOverrides {
                    catalog_path: catalog.catalog.clone(),
                    ..ConfigOverrides::default()
                }
            }
            Command::Config => ConfigOverrides::default(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loading reads the env file, so RUST_LOG set there is seen below.
    let loader = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config.clone(),
        env_file: cli.env_file.clone(),
    })
    .overrides(cli.command.overrides());
    let ConfigLoad { config, warnings } =
        loader.load().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                |_| "vidledger_core=info,vidledger_config=warn,vidledgerctl=info".into(),
            ),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    for warning in &warnings {
        match &warning.hint {
            Some(hint) => warn!("{} (hint: {hint})", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    match cli.command {
        Command::Sync(_) => run_sync(&config, cli.json).await,
        Command::Report { all, .. } => run_report(&config, all, cli.json),
        Command::Pending { .. } => run_pending(&config, cli.json),
        Command::Config => show_config(&config, cli.json),
    }
}

async fn run_sync(config: &Config, json: bool) -> Result<()> {
    let provider = Arc::new(
        config
            .youtube_provider()
            .context("cannot talk to YouTube")?,
    );
    let runner = SyncRunner::new(
        config.catalog_store(),
        provider.clone(),
        provider,
        config.run_options(),
    );

    let summary = runner.run().await.with_context(|| {
        format!("sync of {} failed", config.catalog_path.display())
    })?;

    if json {
        print_json(&summary)
    } else {
        println!("{}", report::render_summary(&summary));
        Ok(())
    }
}

fn run_report(config: &Config, all: bool, json: bool) -> Result<()> {
    let catalog = load_catalog(config)?;
    if json {
        let lines: Vec<_> = report::report_entries(&catalog, all)
            .into_iter()
            .map(|(_, line)| line)
            .collect();
        return print_json(&lines);
    }

    let rendered = report::render_report(&catalog, all);
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

fn run_pending(config: &Config, json: bool) -> Result<()> {
    let catalog = load_catalog(config)?;
    let summary = report::pending_summary(&catalog, config.max_batches);
    if json {
        print_json(&summary)
    } else {
        println!("{}", report::render_pending(&summary));
        Ok(())
    }
}

fn show_config(config: &Config, json: bool) -> Result<()> {
    let redacted = config.redacted();
    if json {
        return print_json(&redacted);
    }
    if let Some(path) = &config.metadata.config_path {
        println!("# loaded from {}", path.display());
    }
    let rendered = toml::to_string_pretty(&redacted)
        .context("failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}

fn load_catalog(config: &Config) -> Result<vidledger_core::model::Catalog> {
    config.catalog_store().load().with_context(|| {
        format!(
            "cannot read catalog {}; run `vidledgerctl sync` first",
            config.catalog_path.display()
        )
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to encode JSON")?;
    println!("{rendered}");
    Ok(())
}
