// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Context as _;
use structopt::StructOpt;
use tokio::runtime;
use tokio::signal;
use tokio::time::{self, Duration};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

mod error;
mod frame;
mod image_buffer;
mod pipeline;
mod receiver;
mod render;
mod settings;
mod sink;
mod temperature;
mod util;

use crate::pipeline::Pipeline;
use crate::settings::{Args, Settings};

/// How long the frame receiver gets to notice a shutdown request.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let mut pipeline = Pipeline::new(settings)
        .await
        .context("Error creating pipeline")?;
    tokio::select! {
        res = &mut pipeline => return res,
        res = signal::ctrl_c() => {
            res.context("Unable to listen for Ctrl-C")?;
            info!("Interrupted, shutting down");
        }
    }
    if let Err(err) = pipeline.shutdown() {
        warn!(%err, "Unable to stop frame receiver");
        return Ok(());
    }
    // A receiver blocked on the transport only sees the request once the read returns.
    match time::timeout(SHUTDOWN_GRACE, pipeline).await {
        Ok(res) => res,
        Err(_) => {
            warn!("Frame receiver still busy, abandoning it");
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::from_args();
    let settings = Settings::from_path(&args.config_path)?;
    info!(config = %args.config_path.display(), "Starting up");
    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Unable to start async runtime")?;
    let res = runtime.block_on(run(settings));
    // Don't wait on a receiver thread stuck in a blocking read.
    runtime.shutdown_timeout(Duration::from_millis(100));
    res
}
