use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::player::MovementKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarryConfig {
    /// Target offset in the carrier's local space while claimed.
    pub local_offset: Vec3,
    pub move_speed: f32,
    /// Clearance kept between a pushed object and blocking geometry.
    pub obstruction_skin: f32,
    pub carrier_speed_multiplier: f32,
}

impl Default for CarryConfig {
    fn default() -> Self {
        Self {
            local_offset: Vec3::new(0.0, 0.9, 1.0),
            move_speed: 3.0,
            obstruction_skin: 0.5,
            carrier_speed_multiplier: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaintConfig {
    pub max_index: i32,
    pub delay_secs: f32,
    pub required_count: u32,
}

impl Default for PaintConfig {
    fn default() -> Self {
        Self {
            max_index: 4,
            delay_secs: 0.5,
            required_count: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub max_participants: usize,
    pub movement: MovementKind,
    pub move_speed: f32,
    pub spawn_position: Vec3,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            max_participants: 2,
            movement: MovementKind::Extended,
            move_speed: 5.0,
            spawn_position: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub tick_rate: u32,
    pub countdown_secs: f32,
    pub event_capacity: usize,
    pub carry: CarryConfig,
    pub paint: PaintConfig,
    pub participants: ParticipantConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            countdown_secs: 10.0,
            event_capacity: 256,
            carry: CarryConfig::default(),
            paint: PaintConfig::default(),
            participants: ParticipantConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Whole ticks to wait before a paint lands, at least one.
    pub fn paint_delay_ticks(&self) -> u32 {
        ((self.paint.delay_secs * self.tick_rate.max(1) as f32).ceil() as u32).max(1)
    }
}
