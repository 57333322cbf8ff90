use std::time::Duration;

use anyhow::{Result, anyhow};
use glam::Vec3;
use tokio::sync::{mpsc, oneshot};
use tokio::time;

use tandem::{Command, CommandSource, EntityId, NodeId};

pub const ALICE: NodeId = NodeId(1);
pub const BOB: NodeId = NodeId(2);

/// What a participant node sends to the host over the ordered channel.
#[derive(Debug)]
pub enum HostMessage {
    Join {
        node: NodeId,
        reply: oneshot::Sender<tandem::Result<EntityId>>,
    },
    Issue(Command),
    Input {
        source: CommandSource,
        direction: Vec3,
    },
    Paint {
        source: CommandSource,
        target: EntityId,
    },
}

/// Entities the host spawned before any participant joined.
#[derive(Debug, Clone)]
pub struct Scene {
    pub crate_id: EntityId,
    pub canvases: Vec<EntityId>,
}

/// A canned two-participant session: carry and push the crate, then paint
/// every canvas.
pub struct Script {
    outbox: mpsc::Sender<HostMessage>,
    scene: Scene,
    tick: Duration,
    paint_wait: Duration,
    push_ticks: u32,
}

impl Script {
    pub fn new(outbox: mpsc::Sender<HostMessage>, scene: Scene, tick: Duration, paint_wait: Duration) -> Self {
        Self {
            outbox,
            scene,
            tick,
            paint_wait,
            push_ticks: 45,
        }
    }

    pub async fn play(self) -> Result<()> {
        let alice = self.join(ALICE).await?;
        let bob = self.join(BOB).await?;
        let alice_source = CommandSource {
            node: ALICE,
            entity: alice,
        };
        let bob_source = CommandSource {
            node: BOB,
            entity: bob,
        };

        // bob asks second and loses the race
        self.send(HostMessage::Issue(Command::start_carry(ALICE, self.scene.crate_id, alice)))
            .await?;
        self.send(HostMessage::Issue(Command::start_carry(BOB, self.scene.crate_id, bob)))
            .await?;
        time::sleep(self.tick * 2).await;

        for _ in 0..self.push_ticks {
            self.send(HostMessage::Input {
                source: alice_source,
                direction: Vec3::Z,
            })
            .await?;
            self.send(HostMessage::Issue(Command::move_claimed(
                ALICE,
                alice,
                self.scene.crate_id,
                Vec3::Z,
            )))
            .await?;
            time::sleep(self.tick).await;
        }

        self.send(HostMessage::Issue(Command::stop_carry(ALICE, alice, self.scene.crate_id)))
            .await?;
        // already free, ignored
        self.send(HostMessage::Issue(Command::stop_carry(ALICE, alice, self.scene.crate_id)))
            .await?;
        time::sleep(self.tick * 2).await;

        for pair in self.scene.canvases.chunks(2) {
            for (canvas, source) in pair.iter().zip([alice_source, bob_source]) {
                self.send(HostMessage::Paint {
                    source,
                    target: *canvas,
                })
                .await?;
            }
            time::sleep(self.paint_wait).await;
        }

        log::info!("script finished");
        Ok(())
    }

    async fn join(&self, node: NodeId) -> Result<EntityId> {
        let (reply, response) = oneshot::channel();
        self.send(HostMessage::Join { node, reply }).await?;
        Ok(response.await??)
    }

    async fn send(&self, message: HostMessage) -> Result<()> {
        self.outbox
            .send(message)
            .await
            .map_err(|_| anyhow!("host stopped listening"))
    }
}
