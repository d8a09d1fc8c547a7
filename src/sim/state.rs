//! Ball state and the simulation context
//!
//! The context owns everything the physics reads from the outside world:
//! gravity, wind, air density, and the active terrain set. A single
//! writer mutates it between frames; `simulate` only ever borrows it.

use glam::Vec2;

use crate::consts::*;

use super::collision::Contact;
use super::geometry::{Segment, TerrainPolygon};

/// Whether the simulation is still healthy. Error is permanent: the ball
/// freezes, and callers poll this after each `simulate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimStatus {
    #[default]
    Running,
    Error,
}

/// The segment a rolling ball rests on. Carries a copy of the segment so
/// that terrain removed between frames degrades to going airborne rather
/// than dangling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundRef {
    pub polygon_id: u32,
    pub segment_index: usize,
    pub segment: Segment,
}

impl GroundRef {
    pub fn new(polygon: &TerrainPolygon, segment_index: usize) -> Option<Self> {
        polygon.segments.get(segment_index).map(|seg| Self {
            polygon_id: polygon.id,
            segment_index,
            segment: *seg,
        })
    }
}

/// Contact state of the ball.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BallMode {
    #[default]
    Airborne,
    Rolling(GroundRef),
}

/// Externally-owned world state, passed by reference into `simulate`.
#[derive(Debug, Clone)]
pub struct SimContext {
    pub gravity: f32,
    pub wind: Vec2,
    pub air_density: f32,
    terrain: Vec<TerrainPolygon>,
    next_id: u32,
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SimContext {
    pub fn new() -> Self {
        Self {
            gravity: GRAVITY,
            wind: Vec2::ZERO,
            air_density: AIR_DENSITY,
            terrain: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a polygon to the active set, returning its stable id. Order of
    /// insertion matters: later polygons win exact detection ties.
    pub fn add_terrain(&mut self, mut polygon: TerrainPolygon) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        polygon.id = id;
        self.terrain.push(polygon);
        id
    }

    /// Remove a polygon by id; returns whether one was removed. Only call
    /// between frames.
    pub fn remove_terrain(&mut self, id: u32) -> bool {
        let before = self.terrain.len();
        self.terrain.retain(|p| p.id != id);
        self.terrain.len() != before
    }

    pub fn terrain(&self) -> &[TerrainPolygon] {
        &self.terrain
    }

    pub fn polygon(&self, id: u32) -> Option<&TerrainPolygon> {
        self.terrain.iter().find(|p| p.id == id)
    }
}

/// The simulated ball: a circle with mass, drag, and roll resistance.
///
/// `radius`, `mass` and `roll_resistance` are plain fields; call
/// [`Ball::recalculate_drag`] after changing radius, mass, or the
/// context's air density.
#[derive(Debug, Clone)]
pub struct Ball {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub mass: f32,
    pub roll_resistance: f32,
    drag_factor: f32,
    mode: BallMode,
    status: SimStatus,
    last_contact: Option<Contact>,
}

impl Ball {
    pub fn new(position: Vec2) -> Self {
        let mut ball = Self {
            position,
            velocity: Vec2::ZERO,
            radius: BALL_RADIUS,
            mass: BALL_MASS,
            roll_resistance: ROLL_RESISTANCE,
            drag_factor: 0.0,
            mode: BallMode::Airborne,
            status: SimStatus::Running,
            last_contact: None,
        };
        ball.recalculate_drag(AIR_DENSITY);
        ball
    }

    /// Recompute the drag factor from radius, mass and air density:
    /// `(0.47 · ρ · π · r²) / (2 · m)`.
    pub fn recalculate_drag(&mut self, air_density: f32) {
        self.drag_factor = DRAG_COEFFICIENT * air_density * std::f32::consts::PI * self.radius
            * self.radius
            / (2.0 * self.mass);
    }

    pub fn drag_factor(&self) -> f32 {
        self.drag_factor
    }

    pub fn mode(&self) -> BallMode {
        self.mode
    }

    pub fn is_rolling(&self) -> bool {
        matches!(self.mode, BallMode::Rolling(_))
    }

    pub fn ground(&self) -> Option<&GroundRef> {
        match &self.mode {
            BallMode::Rolling(ground) => Some(ground),
            BallMode::Airborne => None,
        }
    }

    pub fn status(&self) -> SimStatus {
        self.status
    }

    /// The contact resolved during the most recent frame, if any
    pub fn last_contact(&self) -> Option<&Contact> {
        self.last_contact.as_ref()
    }

    pub(crate) fn set_mode(&mut self, mode: BallMode) {
        self.mode = mode;
    }

    pub(crate) fn mark_error(&mut self) {
        self.status = SimStatus::Error;
    }

    pub(crate) fn begin_frame(&mut self) {
        self.last_contact = None;
    }

    pub(crate) fn note_contact(&mut self, contact: Contact) {
        self.last_contact = Some(contact);
    }

    /// Velocity change from quadratic drag against the wind-relative
    /// velocity, plus gravity, over `delta` seconds.
    pub fn air_acceleration(&self, ctx: &SimContext, delta: f32) -> Vec2 {
        let rel = self.velocity - ctx.wind;
        let mut acc = rel * (-self.drag_factor * rel.length() * delta);
        acc.y -= ctx.gravity * delta;
        acc
    }

    /// Velocity change for a ball rolling on `segment` over `delta`
    /// seconds: gravity along the slope, rolling friction opposing motion
    /// (only once it can overcome static friction), and horizontal air
    /// drag.
    pub fn ground_acceleration(&self, segment: &Segment, ctx: &SimContext, delta: f32) -> Vec2 {
        let mut along = segment.direction.normalize_or_zero();
        if along.x < 0.0 {
            along = -along;
        }
        let (sin_t, cos_t) = (along.y, along.x);
        let friction = ctx.gravity * self.roll_resistance * cos_t;
        let mut rate = -ctx.gravity * sin_t;
        if self.velocity.x.abs() > friction * delta {
            rate -= self.velocity.dot(along).signum() * friction;
        }
        let mut acc = along * (rate * delta);
        let rel = self.velocity - ctx.wind;
        acc.x -= self.drag_factor * rel.length() * rel.x * delta;
        acc
    }

    /// Ground velocity update that never overshoots past a stop: when the
    /// change is at least as large as the current speed, the ball stops
    /// instead of reversing.
    pub(crate) fn apply_ground_acceleration(&mut self, acc: Vec2) {
        if acc.length_squared() >= self.velocity.length_squared() {
            self.velocity = Vec2::ZERO;
        } else {
            self.velocity += acc;
        }
    }
}
