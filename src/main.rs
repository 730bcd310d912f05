use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use feedview::app::Controller;
use feedview::config::Config;
use feedview::feed::parse_feed;
use feedview::i18n::Catalog;
use feedview::view::Page;

/// Get the config directory path (~/.config/feedview/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedview"))
}

#[derive(Parser, Debug)]
#[command(name = "feedview", about = "RSS aggregator: parse feeds and render them as HTML")]
struct Args {
    /// Config file (defaults to ~/.config/feedview/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a local RSS file and print it as JSON
    Parse {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Subscribe to feeds and print the rendered page
    Watch {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Keep polling at the configured interval, reprinting on new posts
        #[arg(long)]
        refresh: bool,

        /// Stop after this many refresh rounds
        #[arg(long, value_name = "N", requires = "refresh")]
        rounds: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    match args.command {
        Command::Parse { file } => parse_file(&file).await,
        Command::Watch {
            urls,
            refresh,
            rounds,
        } => watch(&config, &urls, refresh, rounds).await,
    }
}

async fn parse_file(path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document =
        parse_feed(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn watch(config: &Config, urls: &[String], refresh: bool, rounds: Option<usize>) -> Result<()> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::english(),
    };

    let page = Page::with_catalog(&catalog);
    let mut controller = Controller::new(config, page.handles.clone(), catalog)
        .context("Failed to create HTTP client")?;

    for url in urls {
        if let Err(e) = controller.submit(url).await {
            eprintln!("{}: {} ({})", url, page.handles.feedback.text_content(), e);
        }
    }
    println!("{}", page.root.outer_html());

    if !refresh {
        return Ok(());
    }

    let mut interval = tokio::time::interval(config.refresh_interval());
    // The first tick completes immediately; the initial load already happened.
    interval.tick().await;

    let mut completed = 0usize;
    loop {
        if rounds.is_some_and(|limit| completed >= limit) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {
                let added = controller.refresh().await;
                completed += 1;
                if added > 0 {
                    tracing::info!(added = added, round = completed, "New posts");
                    println!("{}", page.root.outer_html());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping refresh loop");
                break;
            }
        }
    }

    Ok(())
}
