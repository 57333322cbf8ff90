mod config;
mod host;
mod presenter;
mod script;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use config::HostConfig;
use host::Host;
use script::Script;

#[derive(Parser)]
#[command(name = "tandem-host")]
#[command(about = "Headless state-authority host playing a scripted two-player session")]
struct Args {
    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 30, help = "Presentation passes per second")]
    present_rate: u32,

    #[arg(short, long, default_value_t = 30.0, help = "Countdown length in seconds")]
    countdown: f32,

    #[arg(short, long, default_value_t = 20.0, help = "Stop after this many seconds")]
    duration: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = HostConfig {
        present_rate: args.present_rate,
        duration_secs: args.duration,
        ..Default::default()
    };
    config.simulation.tick_rate = args.tick_rate;
    config.simulation.countdown_secs = args.countdown;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(config))
}

async fn run_session(config: HostConfig) -> Result<()> {
    let (host, scene) = Host::new(&config)?;
    log::info!(
        "host started at {} Hz, crate {}, {} canvases",
        config.simulation.tick_rate,
        scene.crate_id,
        scene.canvases.len()
    );

    let (outbox, inbox) = mpsc::channel(256);
    let tick = Duration::from_secs_f32(config.simulation.dt());
    let paint_wait = Duration::from_secs_f32(config.simulation.paint.delay_secs) + tick * 4;
    let script = tokio::spawn(Script::new(outbox, scene, tick, paint_wait).play());

    host::run(host, inbox, &config).await?;

    script.abort();
    match script.await {
        Ok(Err(e)) => log::warn!("script stopped early: {}", e),
        Err(e) if !e.is_cancelled() => log::warn!("script task failed: {}", e),
        _ => {}
    }

    log::info!("host shutting down");
    Ok(())
}
