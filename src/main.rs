//!
//! # markerlink
//!
//! Runs the tracker against the configured detection source and hands every chain
//! solution to a sink.
//!

#![deny(unused_must_use)]

use markerlink::{
    Pipeline,
    sinks::{JsonLinesSink, LogSink, RenderSink},
    sources::ConfiguredSource,
};
use markerlink_core::prelude::*;
use mimalloc::MiMalloc;
use std::{error::Error, path::PathBuf};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

// mimalloc is an excellent general purpose allocator
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Places we look for a config file when none is given on the command line
const CONFIG_PATHS: [&str; 2] = ["/etc/markerlink.toml", "./markerlink.toml"];

fn load_config() -> Config {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| {
            CONFIG_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists())
        });

    let Some(path) = path else {
        info!("no config file found, using defaults");
        return Config::default();
    };

    trace!("loading config from '{path:?}'");
    match Config::load(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            // If all else fails, we'll just use a default configuration
            warn!("couldn't load config from '{path:?}' ({err}), using defaults");
            Config::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // Set up logging
    let filter = EnvFilter::from_default_env();
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(layer).init();

    info!("starting up...");

    let cfg = load_config();
    if let Some(name) = &cfg.device_name {
        info!("device name: {name}");
    }

    let source = ConfiguredSource::from_config(&cfg).await?;
    let sink: Box<dyn RenderSink> = if cfg.output.json {
        Box::new(JsonLinesSink::new(std::io::stdout()).with_device(cfg.device_name.clone()))
    } else {
        Box::new(LogSink)
    };

    let mut pipeline = Pipeline::from_config(&cfg, source, sink)?;

    // Run until ctrl+c
    let stats = pipeline
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("failed to listen for ctrl+c: {err}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        "stopped after {} detection frames ({} failed) and {} renders",
        stats.frames, stats.errors, stats.renders
    );

    Ok(())
}
