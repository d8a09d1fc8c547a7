//! Terrain geometry: oriented boundary segments and convex corners
//!
//! Terrain outlines wind counter-clockwise (y up), so a segment's outward
//! normal is its direction rotated -90° and unit-scaled. Under this
//! convention every walkable top face has a direction with negative x.

use glam::Vec2;

use crate::consts::COLLISION_THRESHOLD;

/// One oriented boundary edge of a terrain outline.
///
/// Immutable once constructed. The supporting line is `normal · p =
/// distance`; the two border half-planes (orthogonal to `direction`)
/// bound the segment's finite extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
    /// `end - start`, not normalized
    pub direction: Vec2,
    /// Unit normal pointing away from the solid side
    pub normal: Vec2,
    /// Signed offset of the supporting line from the origin, along `normal`
    pub distance: f32,
    pub start_border_normal: Vec2,
    pub start_border_distance: f32,
    pub end_border_normal: Vec2,
    pub end_border_distance: f32,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        let direction = end - start;
        debug_assert!(direction.length_squared() > 0.0, "zero-length segment");
        let along = direction.normalize_or_zero();
        let normal = Vec2::new(along.y, -along.x);
        Self {
            start,
            end,
            direction,
            normal,
            distance: normal.dot(start),
            start_border_normal: -along,
            start_border_distance: (-along).dot(start),
            end_border_normal: along,
            end_border_distance: along.dot(end),
        }
    }

    /// Penetration of a circle past this segment's finite edge, in length
    /// units. Zero means no collision: either the surface has not been
    /// crossed, or the center is outside the segment's span (inflated by
    /// the radius) and only the infinite line would be hit.
    pub fn penetration(&self, center: Vec2, radius: f32) -> f32 {
        let depth = self.distance - center.dot(self.normal) + radius;
        if depth <= 0.0 {
            return 0.0;
        }
        if self.start_overrun(center) > radius || self.end_overrun(center) > radius {
            return 0.0;
        }
        depth
    }

    /// Signed distance of a point beyond the start border plane
    #[inline]
    pub fn start_overrun(&self, p: Vec2) -> f32 {
        self.start_border_normal.dot(p) - self.start_border_distance
    }

    /// Signed distance of a point beyond the end border plane
    #[inline]
    pub fn end_overrun(&self, p: Vec2) -> f32 {
        self.end_border_normal.dot(p) - self.end_border_distance
    }

    /// True for exactly vertical faces (walls)
    #[inline]
    pub fn is_vertical(&self) -> bool {
        self.direction.x == 0.0
    }
}

/// Which side of its polygon a corner sits on, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalSide {
    Left,
    Mid,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalSide {
    Bottom,
    Mid,
    Top,
}

/// A convex vertex joining two segments.
///
/// Suppresses false-positive segment collisions once the ball has cleared
/// the joint, and supplies the radial reflection normal when the ball
/// strikes the vertex itself. Concave joints need no corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub position: Vec2,
    pub horizontal: HorizontalSide,
    pub vertical: VerticalSide,
}

impl Corner {
    pub fn new(position: Vec2, horizontal: HorizontalSide, vertical: VerticalSide) -> Self {
        Self {
            position,
            horizontal,
            vertical,
        }
    }

    fn outside_horizontal(&self, p: Vec2) -> bool {
        match self.horizontal {
            HorizontalSide::Left => p.x <= self.position.x,
            HorizontalSide::Right => p.x >= self.position.x,
            HorizontalSide::Mid => true,
        }
    }

    fn outside_vertical(&self, p: Vec2) -> bool {
        match self.vertical {
            VerticalSide::Bottom => p.y <= self.position.y,
            VerticalSide::Top => p.y >= self.position.y,
            VerticalSide::Mid => true,
        }
    }

    /// Corner-overwrite predicate: the ball is unambiguously on the
    /// outside of the owning polygon relative to this corner, so the
    /// polygon contributes no collision this step. This is what lets a
    /// convex joint behave like a circular arc without arc geometry.
    pub fn clears(&self, center: Vec2, radius: f32) -> bool {
        center.distance(self.position) > radius - COLLISION_THRESHOLD
            && self.outside_horizontal(center)
            && self.outside_vertical(center)
    }
}

/// An ordered collection of segments plus corners forming one collidable
/// obstacle. Segments need not close into a loop; open polylines are
/// valid. Collision treats the outline as a convex solid: the ball is in
/// contact only while every segment reports penetration. The id is
/// assigned when the polygon joins a [`super::SimContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainPolygon {
    pub id: u32,
    pub segments: Vec<Segment>,
    pub corners: Vec<Corner>,
}

impl TerrainPolygon {
    pub fn new(segments: Vec<Segment>, corners: Vec<Corner>) -> Self {
        Self {
            id: 0,
            segments,
            corners,
        }
    }

    /// Axis-aligned solid rectangle, wound counter-clockwise, with convex
    /// corners at all four vertices.
    pub fn rect(min: Vec2, max: Vec2) -> Self {
        let bl = min;
        let br = Vec2::new(max.x, min.y);
        let tr = max;
        let tl = Vec2::new(min.x, max.y);
        Self::new(
            vec![
                Segment::new(bl, br),
                Segment::new(br, tr),
                Segment::new(tr, tl),
                Segment::new(tl, bl),
            ],
            vec![
                Corner::new(bl, HorizontalSide::Left, VerticalSide::Bottom),
                Corner::new(br, HorizontalSide::Right, VerticalSide::Bottom),
                Corner::new(tr, HorizontalSide::Right, VerticalSide::Top),
                Corner::new(tl, HorizontalSide::Left, VerticalSide::Top),
            ],
        )
    }

    /// The corner sitting at `point`, if any
    pub fn corner_at(&self, point: Vec2) -> Option<&Corner> {
        self.corners
            .iter()
            .find(|c| c.position.distance_squared(point) < 1e-8)
    }

    /// Whether any corner overwrite excludes the ball from this polygon
    pub fn clears_ball(&self, center: Vec2, radius: f32) -> bool {
        self.corners.iter().any(|c| c.clears(center, radius))
    }
}
