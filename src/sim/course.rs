//! Demo course layout
//!
//! Two ground blocks separated by a hole, an obstacle block on the left
//! ground, and a catapult platform whose collider is only added after the
//! ball has launched off it.

use glam::Vec2;

use super::geometry::TerrainPolygon;
use super::state::{Ball, SimContext};

/// Hole gap in the ground line, between the two ground blocks
pub const HOLE_LEFT: f32 = -1.0;
pub const HOLE_RIGHT: f32 = 1.0;

/// Where the ball sits on the catapult before launch
pub const LAUNCH_POSITION: Vec2 = Vec2::new(-10.5, 1.0);

/// The installed demo terrain, by polygon id.
#[derive(Debug)]
pub struct Course {
    pub left_ground: u32,
    pub right_ground: u32,
    pub obstacle: u32,
    catapult: Option<u32>,
}

impl Course {
    /// Add the fixed course polygons to the context. The catapult platform
    /// is deliberately left out; see [`Course::activate_catapult`].
    pub fn install(ctx: &mut SimContext) -> Self {
        let left_ground =
            ctx.add_terrain(TerrainPolygon::rect(Vec2::new(-12.0, -3.0), Vec2::new(HOLE_LEFT, 0.0)));
        let right_ground =
            ctx.add_terrain(TerrainPolygon::rect(Vec2::new(HOLE_RIGHT, -3.0), Vec2::new(12.0, 0.0)));
        let obstacle =
            ctx.add_terrain(TerrainPolygon::rect(Vec2::new(-6.0, 0.0), Vec2::new(-5.0, 1.0)));
        Self {
            left_ground,
            right_ground,
            obstacle,
            catapult: None,
        }
    }

    /// Make the catapult body solid. Its collider stays out of the terrain
    /// set while the ball is still seated on it, so the launch does not
    /// immediately collide with the platform itself; the driver calls this
    /// once the ball has cleared it. Returns false if already active.
    pub fn activate_catapult(&mut self, ctx: &mut SimContext) -> bool {
        if self.catapult.is_some() {
            return false;
        }
        self.catapult = Some(ctx.add_terrain(TerrainPolygon::rect(
            Vec2::new(-11.0, 0.0),
            Vec2::new(-10.0, 0.6),
        )));
        true
    }

    pub fn catapult_active(&self) -> bool {
        self.catapult.is_some()
    }

    /// Whether the ball has cleared the catapult platform's footprint
    pub fn ball_clear_of_catapult(&self, ball: &Ball) -> bool {
        ball.position.x > -10.0 + ball.radius || ball.position.y > 0.6 + 2.0 * ball.radius
    }

    /// "Landed in hole": ball center inside the gap, below the ground line
    /// by at least its radius.
    pub fn in_hole(&self, ball: &Ball) -> bool {
        ball.position.y < -ball.radius
            && ball.position.x > HOLE_LEFT
            && ball.position.x < HOLE_RIGHT
    }
}
