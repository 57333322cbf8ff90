use std::time::Duration;

use anyhow::Result;
use glam::Vec3;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use tandem::{
    Dispatch, GameEvent, PhysicsWorld, Reconciler, Simulation, TickReport, Transform,
};

use crate::config::HostConfig;
use crate::presenter::LogPresenter;
use crate::script::{HostMessage, Scene};

pub const HOST_NODE: tandem::NodeId = tandem::NodeId(0);

/// The state-authority node plus its own presentation layer.
pub struct Host {
    sim: Simulation<PhysicsWorld>,
    reconciler: Reconciler,
    presenter: LogPresenter,
}

impl Host {
    pub fn new(config: &HostConfig) -> Result<(Self, Scene)> {
        let simulation = config.simulation.clone();
        let physics = PhysicsWorld::new(simulation.tick_rate);
        let mut sim = Simulation::new(HOST_NODE, simulation, physics);

        sim.physics_mut().add_ground(0.0, 20.0);
        sim.physics_mut()
            .add_static_box(Vec3::new(0.0, 1.0, 12.0), Vec3::new(6.0, 1.0, 0.2));

        let crate_pos = Vec3::new(0.0, 0.5, 3.0);
        let crate_id = sim.spawn_carryable(Transform::from_translation(crate_pos))?;
        sim.physics_mut()
            .add_carryable_box(crate_id, crate_pos, Vec3::splat(0.4), 2.0);

        let mut canvases = Vec::with_capacity(config.canvas_count);
        for i in 0..config.canvas_count {
            let pos = Vec3::new(-4.5 + 3.0 * i as f32, 1.5, 11.0);
            canvases.push(sim.spawn_paintable(Transform::from_translation(pos))?);
        }
        sim.spawn_timer()?;

        let host = Self {
            sim,
            reconciler: Reconciler::new(),
            presenter: LogPresenter::default(),
        };
        Ok((host, Scene { crate_id, canvases }))
    }

    pub fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::Join { node, reply } => {
                let _ = reply.send(self.sim.join(node));
            }
            HostMessage::Issue(command) => match self.sim.issue(command) {
                Ok(Dispatch::Queued) => {}
                Ok(Dispatch::Ignored) => {
                    log::debug!("{} for {} ignored", command.kind.name(), command.target)
                }
                Err(e) => log::warn!("{} refused: {}", command.kind.name(), e),
            },
            HostMessage::Input { source, direction } => {
                if let Err(e) = self.sim.submit_input(source, direction) {
                    log::warn!("input from {} refused: {}", source.node, e);
                }
            }
            HostMessage::Paint { source, target } => {
                match self.sim.request_paint(source, target) {
                    Ok(Some(due)) => log::info!("{} paints {} at tick {}", source.entity, target, due),
                    Ok(None) => log::debug!("{} cannot paint right now", source.entity),
                    Err(e) => log::warn!("paint from {} refused: {}", source.node, e),
                }
            }
        }
    }

    /// Runs the ticks `delta` seconds of wall time cover, then reports
    /// the events they produced.
    pub fn advance(&mut self, delta: f32) -> Vec<TickReport> {
        let reports = self.sim.update(delta);
        for report in reports.iter().filter(|r| r.applied + r.rejected > 0) {
            log::debug!(
                "tick {}: {} applied, {} rejected, {} committed",
                report.tick,
                report.applied,
                report.rejected,
                report.committed
            );
        }

        for pending in self.sim.drain_events() {
            match pending.event {
                GameEvent::Victory { count } => {
                    log::info!("tick {}: victory with {} paints", pending.tick, count)
                }
                GameEvent::Defeat => log::info!("tick {}: time ran out", pending.tick),
                event => log::info!("tick {}: {:?}", pending.tick, event),
            }
        }
        reports
    }

    pub fn present(&mut self) -> usize {
        self.reconciler
            .run(&self.sim.world().properties, &mut self.presenter)
    }

    pub fn is_finished(&self) -> bool {
        !self.sim.session().is_active()
    }
}

/// Drives ticks and presentation on their own cadences until the session
/// ends or `duration_secs` passes.
pub async fn run(mut host: Host, mut inbox: mpsc::Receiver<HostMessage>, config: &HostConfig) -> Result<()> {
    let mut ticks = time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.simulation.tick_rate.max(1)),
    ));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut frames = time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.present_rate.max(1)),
    ));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_tick = Instant::now();
    let deadline = time::sleep(Duration::from_secs_f32(config.duration_secs.max(0.0)));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            Some(message) = inbox.recv() => host.handle(message),
            now = ticks.tick() => {
                host.advance((now - last_tick).as_secs_f32());
                last_tick = now;
                if host.is_finished() {
                    break;
                }
            }
            _ = frames.tick() => {
                host.present();
            }
            _ = &mut deadline => {
                log::info!("duration elapsed");
                break;
            }
        }
    }

    host.present();
    log::info!(
        "session over: {:?}, {} paints, {} values presented",
        host.sim.session().outcome(),
        host.sim.session().paint_count(),
        host.presenter.applied()
    );
    Ok(())
}
