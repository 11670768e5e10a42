//! `jar-descriptions` binary: runs the sync pipeline once and exits.

use anyhow::Context;
use clap::{Parser, Subcommand};
use descriptions_lib::pipeline::{Pipeline, Stage};
use descriptions_lib::tools::{GitPublisher, Publisher};
use descriptions_lib::SyncConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "jar-descriptions")]
#[command(about = "Sync Minecraft jar descriptions with the upstream version metadata")]
struct Args {
    /// Commit and push the working tree afterwards if it has changes
    #[arg(long)]
    push: bool,

    /// Repository root (overrides JAR_DESCRIPTIONS_ROOT)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run every stage (default)
    Update,
    /// Pull the descriptor mirror and update meta.json
    Meta,
    /// Download and convert changed jars into jars.json
    Jars,
    /// Rebuild index.json from jars.json
    Index,
}

impl Command {
    fn stage(self) -> Stage {
        match self {
            Command::Update => Stage::All,
            Command::Meta => Stage::Meta,
            Command::Jars => Stage::Artifacts,
            Command::Index => Stage::Index,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = SyncConfig::from_env();
    if let Some(root) = args.root {
        config.root_dir = root;
    }
    let config = Arc::new(config);
    log::info!("Syncing repository at {:?}", config.root_dir);

    let pipeline = Pipeline::from_config(config.clone()).context("Failed to set up pipeline")?;
    let publisher = args.push.then(|| GitPublisher::from_config(&config));

    let stage = args.command.unwrap_or(Command::Update).stage();
    pipeline
        .execute(stage, publisher.as_ref().map(|p| p as &dyn Publisher))
        .await
        .with_context(|| format!("{:?} failed", stage))?;

    Ok(())
}
