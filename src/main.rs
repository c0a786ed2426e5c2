use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use colorchill::cli::Args;
use colorchill::pipeline::{DefaultImageLoader, KmeansSwatchSource, Orchestrator, PipelineState};
use colorchill::report::render_text;
use colorchill::storage::{FileStore, KeyValueStore, MemoryStore};
use colorchill::tui;

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "colorchill=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if args.no_history {
        run(&args, MemoryStore::new())
    } else {
        let store = match &args.history_file {
            Some(path) => FileStore::new(path),
            None => FileStore::default_location().context("no default history location")?,
        };
        run(&args, store)
    }
}

fn run<St: KeyValueStore>(args: &Args, store: St) -> Result<()> {
    let config = args.pipeline_config();
    config
        .extract
        .resolve()
        .context("invalid extraction options")?;

    let loader = DefaultImageLoader::new().context("failed to set up image loader")?;
    let mut orchestrator = Orchestrator::new(config, KmeansSwatchSource, store);
    let request = orchestrator.submit_image(args.image.as_deref());

    if args.tui {
        return tui::run(&mut orchestrator, Arc::new(loader), request);
    }

    orchestrator.run(&loader, request);
    for notification in orchestrator.take_notifications() {
        eprintln!("colorchill: {notification}");
    }
    let state = orchestrator.snapshot();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("failed to encode state")?
        );
    } else if args.preview {
        tui::preview(&state)?;
    } else {
        print!("{}", render_text(&state));
    }

    exit_status(&state)
}

/// Fail only when no accent could be produced at all.
fn exit_status(state: &PipelineState) -> Result<()> {
    if state.accent_default.is_some() {
        return Ok(());
    }
    match &state.last_error {
        Some(error) => bail!("{error}"),
        None => bail!("no colors could be extracted from {}", state.image_address),
    }
}
