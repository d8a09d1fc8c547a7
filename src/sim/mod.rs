//! Deterministic ball/terrain simulation
//!
//! All physics lives here. This module must stay pure and deterministic:
//! - Fixed or caller-supplied timestep only
//! - No rendering or platform dependencies
//! - Terrain is mutated between frames only, never during `simulate`

pub mod collision;
pub mod course;
pub mod geometry;
pub mod state;
pub mod tick;

pub use collision::{Contact, ContactSurface, detect, reflect};
pub use course::Course;
pub use geometry::{Corner, HorizontalSide, Segment, TerrainPolygon, VerticalSide};
pub use state::{Ball, BallMode, GroundRef, SimContext, SimStatus};
pub use tick::simulate;
