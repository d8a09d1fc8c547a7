//! Collision detection between the ball and the terrain set
//!
//! The tricky part: several segments and corners can report penetration in
//! the same sub-step, and the winner has to be the contact the ball would
//! have reached first. Candidates are ranked by correction time, the
//! estimated time at which penetration would reach zero if motion were
//! reversed.

use glam::Vec2;

use crate::consts::{BOUNCE_DAMPING, COLLISION_THRESHOLD};

use super::geometry::{Corner, Segment, TerrainPolygon};

/// Which piece of terrain the ball actually touched. Faces reflect across
/// the segment normal; vertices reflect radially, which is what makes a
/// convex joint behave like a rounded edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactSurface {
    Face(Segment),
    Vertex(Corner),
}

impl ContactSurface {
    pub fn as_face(&self) -> Option<&Segment> {
        match self {
            ContactSurface::Face(seg) => Some(seg),
            ContactSurface::Vertex(_) => None,
        }
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self, ContactSurface::Vertex(_))
    }

    /// True when the struck surface is an exactly vertical face
    pub fn is_vertical_face(&self) -> bool {
        matches!(self, ContactSurface::Face(seg) if seg.is_vertical())
    }
}

/// A resolved collision candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub polygon_id: u32,
    pub segment_index: usize,
    pub surface: ContactSurface,
    /// Reflection normal; blended when two polygons tie exactly
    pub normal: Vec2,
    pub depth: f32,
    /// Estimated sub-step time to undo the penetration along the approach
    /// direction; infinite when the ball is not closing on the surface
    pub correction_time: f32,
}

/// Scan the terrain set for the contact to resolve this sub-step.
///
/// Per polygon: a corner overwrite excludes the whole polygon (the ball
/// has already cleared that convex joint), and so does any segment the
/// ball has not crossed — a convex outline contains the ball only when
/// every face reports penetration, which is what keeps far faces of a
/// solid from colliding with a ball entirely outside it. Among the
/// remaining candidates the segment with the smallest correction time
/// wins. Across polygons the winner is the last polygon in iteration
/// order with the smallest correction time seen so far; an exact tie
/// blends the two normals, which handles a corner shared by abutting
/// terrain.
pub fn detect(
    center: Vec2,
    velocity: Vec2,
    radius: f32,
    terrain: &[TerrainPolygon],
) -> Option<Contact> {
    let mut best: Option<Contact> = None;
    for poly in terrain {
        if poly.clears_ball(center, radius) {
            continue;
        }
        let mut poly_best: Option<Contact> = None;
        for (index, seg) in poly.segments.iter().enumerate() {
            let depth = seg.penetration(center, radius);
            if depth <= COLLISION_THRESHOLD {
                // one clear face clears the whole convex outline
                poly_best = None;
                break;
            }
            let Some(candidate) = resolve_surface(poly, index, seg, center, velocity, radius, depth)
            else {
                continue;
            };
            match &poly_best {
                Some(b) if candidate.correction_time >= b.correction_time => {}
                _ => poly_best = Some(candidate),
            }
        }
        let Some(candidate) = poly_best else { continue };
        best = Some(match best {
            None => candidate,
            Some(b) if candidate.correction_time < b.correction_time => candidate,
            Some(b) if candidate.correction_time == b.correction_time => Contact {
                normal: (b.normal + candidate.normal).normalize_or_zero(),
                ..candidate
            },
            Some(b) => b,
        });
    }
    best
}

/// Decide whether a penetrating segment is really a face hit or a strike
/// on the vertex at one of its ends.
fn resolve_surface(
    poly: &TerrainPolygon,
    index: usize,
    seg: &Segment,
    center: Vec2,
    velocity: Vec2,
    radius: f32,
    line_depth: f32,
) -> Option<Contact> {
    for (overrun, endpoint) in [
        (seg.start_overrun(center), seg.start),
        (seg.end_overrun(center), seg.end),
    ] {
        if overrun < -COLLISION_THRESHOLD {
            continue;
        }
        // center at or past the border plane: the finite face ends here,
        // so the contact belongs to the corner if the polygon has one
        let Some(corner) = poly.corner_at(endpoint) else {
            continue;
        };
        let offset = center - corner.position;
        let dist = offset.length();
        let depth = radius - dist;
        if depth <= COLLISION_THRESHOLD {
            return None;
        }
        let normal = if dist > f32::EPSILON {
            offset / dist
        } else {
            seg.normal
        };
        return Some(Contact {
            polygon_id: poly.id,
            segment_index: index,
            surface: ContactSurface::Vertex(*corner),
            normal,
            depth,
            correction_time: correction_time(depth, velocity, normal),
        });
    }
    Some(Contact {
        polygon_id: poly.id,
        segment_index: index,
        surface: ContactSurface::Face(*seg),
        normal: seg.normal,
        depth: line_depth,
        correction_time: correction_time(line_depth, velocity, seg.normal),
    })
}

fn correction_time(depth: f32, velocity: Vec2, normal: Vec2) -> f32 {
    let closing = velocity.dot(-normal);
    if closing.abs() <= f32::EPSILON {
        f32::INFINITY
    } else {
        (depth / closing).abs()
    }
}

/// Mirror a velocity across a collision normal and bleed off bounce
/// energy: `v' = v - 2(v·n)n`, then the component along `n` is reduced
/// by [`BOUNCE_DAMPING`].
#[inline]
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    let mirrored = velocity - 2.0 * velocity.dot(normal) * normal;
    mirrored - mirrored.dot(normal) * normal * BOUNCE_DAMPING
}
