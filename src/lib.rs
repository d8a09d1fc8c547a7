//! Springshot - a ball launched from a spring catapult across 2D terrain
//!
//! Core modules:
//! - `sim`: deterministic physics (collision geometry, reflection/rolling
//!   engine, frame simulation driver)
//! - `settings`: tunable physics parameters

pub mod settings;
pub mod sim;

pub use settings::Settings;

/// Physics constants and defaults
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;

    /// Distance below which two surfaces are considered touching rather
    /// than penetrating. Boundary comparisons go through this instead of
    /// exact equality.
    pub const COLLISION_THRESHOLD: f32 = 0.001;
    /// Normal speed below which a reflecting ball stops bouncing and rolls
    pub const BOUNCE_THRESHOLD: f32 = 0.1;
    /// Fraction of the normal velocity component lost on each bounce
    pub const BOUNCE_DAMPING: f32 = 0.2;
    /// Drag coefficient of a sphere
    pub const DRAG_COEFFICIENT: f32 = 0.47;
    /// Sub-step cap per frame; reaching it latches the Error state
    pub const MAX_SUBSTEPS: u32 = 100;

    /// Environment defaults (meters, seconds)
    pub const GRAVITY: f32 = 9.81;
    pub const AIR_DENSITY: f32 = 1.293;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 0.2;
    pub const BALL_MASS: f32 = 0.1;
    pub const ROLL_RESISTANCE: f32 = 0.05;
}
