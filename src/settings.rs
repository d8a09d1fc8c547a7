//! Tunable physics parameters
//!
//! Persisted as JSON and applied to a live context/ball pair between
//! throws. Unknown or missing fields fall back to the defaults, so saved
//! settings survive additions to this struct.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::{Ball, SimContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gravity: f32,
    pub wind: Vec2,
    pub air_density: f32,
    pub ball_radius: f32,
    pub ball_mass: f32,
    pub roll_resistance: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            wind: Vec2::ZERO,
            air_density: AIR_DENSITY,
            ball_radius: BALL_RADIUS,
            ball_mass: BALL_MASS,
            roll_resistance: ROLL_RESISTANCE,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Push these values into a context/ball pair. The drag factor depends
    /// on radius, mass, and air density, so it is recomputed afterwards.
    pub fn apply(&self, ctx: &mut SimContext, ball: &mut Ball) {
        ctx.gravity = self.gravity;
        ctx.wind = self.wind;
        ctx.air_density = self.air_density;
        ball.radius = self.ball_radius;
        ball.mass = self.ball_mass;
        ball.roll_resistance = self.roll_resistance;
        ball.recalculate_drag(self.air_density);
    }
}
