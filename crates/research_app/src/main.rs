//! `research-watch`: follows one research job in the terminal.

mod config;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use research_core::{JobId, Phase};
use research_engine::{HttpResearchApi, SessionHandle};
use watch_logging::{watch_info, LogDestination};

use crate::config::WatchConfig;
use crate::render::TerminalRenderer;

#[derive(Debug, Parser)]
#[command(name = "research-watch", about = "Follow a research job's progress and activity")]
struct Cli {
    /// Project (job) identifier to observe.
    project: String,

    /// RON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    base_url: Option<String>,

    /// WebSocket base, when the activity feed is served elsewhere.
    #[arg(long)]
    push_url: Option<String>,

    /// Ask the executor to start the job after attaching.
    #[arg(long, conflicts_with = "stop")]
    start: bool,

    #[arg(long, requires = "start")]
    model: Option<String>,

    #[arg(long)]
    project_dir: Option<String>,

    /// Ask the executor to stop the job after attaching.
    #[arg(long)]
    stop: bool,

    #[arg(long)]
    log_file: Option<PathBuf>,

    #[arg(long)]
    log_level: Option<String>,

    /// Exit once the job reports completion.
    #[arg(long)]
    exit_on_complete: bool,
}

impl Cli {
    fn watch_config(&self) -> anyhow::Result<WatchConfig> {
        let mut config = match &self.config {
            Some(path) => WatchConfig::load(path)?,
            None => WatchConfig::default(),
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(push_url) = &self.push_url {
            config.push_base_url = Some(push_url.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.watch_config()?;

    // Without a log file, log lines interleave with the rendered view.
    let destination = match &config.log_file {
        Some(path) => LogDestination::File(path.clone()),
        None => LogDestination::Terminal,
    };
    if !watch_logging::initialize(&destination, config.log_level()?) {
        eprintln!("research-watch: logging disabled");
    }

    let engine = config.engine_config(cli.project_dir.clone())?;
    let api = HttpResearchApi::new(engine.clone()).context("building HTTP client")?;
    let session = SessionHandle::spawn(Arc::new(api), engine);
    let mut views = session.subscribe();

    let job_id = JobId::new(cli.project.clone());
    watch_info!("Watching {}", job_id);
    session.attach(job_id).await?;
    if cli.start {
        session.start_job(cli.model.clone())?;
    } else if cli.stop {
        session.stop_job()?;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut renderer = TerminalRenderer::new();
    loop {
        let view = views.borrow_and_update().clone();
        for line in renderer.render(&view) {
            println!("{line}");
        }
        if cli.exit_on_complete && view.finalized && view.phase == Phase::Complete {
            break;
        }

        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    session.detach().await?;
    session.shutdown().await;
    Ok(())
}
