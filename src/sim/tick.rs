//! Frame simulation driver
//!
//! `simulate` advances a ball through one frame, sub-stepping around
//! discrete collision events. Each sub-step either corrects a penetration,
//! performs the reflection the previous sub-step queued, or walks a rolling
//! ball off the end of its ground segment. The loop is bounded by
//! `MAX_SUBSTEPS`; hitting the bound (or a non-finite ball state) latches
//! the Error status and freezes the ball.

use glam::Vec2;

use crate::consts::*;

use super::collision::{self, Contact, ContactSurface};
use super::state::{Ball, BallMode, GroundRef, SimContext, SimStatus};

/// Advance `ball` through `delta` seconds of simulated time.
pub fn simulate(ball: &mut Ball, ctx: &SimContext, delta: f32) {
    if ball.status() == SimStatus::Error || delta <= 0.0 {
        return;
    }
    ball.begin_frame();

    // One accel/integrate step for the whole frame; collisions are then
    // unwound sub-step by sub-step.
    match ball.mode() {
        BallMode::Airborne => {
            let acc = ball.air_acceleration(ctx, delta);
            ball.velocity += acc;
        }
        BallMode::Rolling(ground) => {
            let acc = ball.ground_acceleration(&ground.segment, ctx, delta);
            ball.velocity += acc;
        }
    }
    ball.position += ball.velocity * delta;

    let mut delta = delta;
    let mut correction = 0.0_f32;
    let mut prev_depth = f32::INFINITY;
    let mut pending: Option<Contact> = None;
    let mut substeps = 0u32;

    loop {
        if !ball.position.is_finite() || !ball.velocity.is_finite() {
            log::warn!(
                "non-finite ball state (pos {:?}, vel {:?}), halting simulation",
                ball.position,
                ball.velocity
            );
            ball.mark_error();
            return;
        }
        substeps += 1;
        if substeps > MAX_SUBSTEPS {
            log::warn!(
                "collision resolution did not converge at {:?}, halting simulation",
                ball.position
            );
            ball.mark_error();
            return;
        }

        match collision::detect(ball.position, ball.velocity, ball.radius, ctx.terrain()) {
            Some(hit) => {
                let on_own_segment = ball
                    .ground()
                    .is_some_and(|g| g.polygon_id == hit.polygon_id && g.segment_index == hit.segment_index);
                if on_own_segment || hit.depth > prev_depth || !hit.correction_time.is_finite() {
                    // The velocity-reversal correction is unusable (or made
                    // things worse last sub-step); push straight out.
                    ball.position += hit.normal * hit.depth;
                } else {
                    ball.position -= ball.velocity * hit.correction_time;
                }
                // only rewound time counts toward the reflection duration;
                // a pure normal-push with no closing velocity adds nothing
                if hit.correction_time.is_finite() {
                    correction = (correction + hit.correction_time).min(delta);
                }
                prev_depth = hit.depth;
                ball.note_contact(hit);
                pending = Some(hit);
            }
            None => {
                if let Some(hit) = pending.take() {
                    match ball.mode() {
                        BallMode::Airborne => reflect_in_air(ball, &hit, ctx, correction),
                        BallMode::Rolling(ground) => {
                            reflect_rolling(ball, &ground, &hit, ctx, correction)
                        }
                    }
                    // The reflected slice still has to be simulated.
                    delta = correction;
                    correction = 0.0;
                    prev_depth = f32::INFINITY;
                    continue;
                }
                if let Some(ground) = ball.ground().copied() {
                    if off_ground(ball, &ground, ctx) {
                        delta = fall_off_ground(ball, &ground, ctx, delta);
                        correction = 0.0;
                        prev_depth = f32::INFINITY;
                        continue;
                    }
                }
                break;
            }
        }
    }
}

/// Bounce an airborne ball off the surface it just struck, or settle it
/// into rolling when the bounce has died down and the surface is walkable.
fn reflect_in_air(ball: &mut Ball, hit: &Contact, ctx: &SimContext, spent: f32) {
    let acc = ball.air_acceleration(ctx, spent);
    ball.velocity -= acc;
    ball.velocity = collision::reflect(ball.velocity, hit.normal);

    if let ContactSurface::Face(seg) = hit.surface {
        if ball.velocity.dot(hit.normal).abs() < BOUNCE_THRESHOLD && seg.direction.x < 0.0 {
            let lift = seg.distance - ball.position.dot(seg.normal) + ball.radius;
            ball.position += seg.normal * lift;
            let ground = GroundRef {
                polygon_id: hit.polygon_id,
                segment_index: hit.segment_index,
                segment: seg,
            };
            ball.set_mode(BallMode::Rolling(ground));
            ground_bounce(ball, &ground, hit, ctx, spent);
            return;
        }
    }

    let acc = ball.air_acceleration(ctx, spent);
    add_reflection_acceleration(ball, acc, hit.surface.is_vertical_face());
    ball.position += ball.velocity * spent;
}

/// Bounce a rolling ball off whatever it ran into.
fn reflect_rolling(ball: &mut Ball, ground: &GroundRef, hit: &Contact, ctx: &SimContext, spent: f32) {
    let acc = ball.ground_acceleration(&ground.segment, ctx, spent);
    ball.velocity -= acc;
    ground_bounce(ball, ground, hit, ctx, spent);
}

/// Redirect velocity for a ball in ground contact: along the slope when the
/// struck surface has a definite horizontal sense, reversed outright for
/// walls and vertices. Ground acceleration over the reflected slice is
/// applied with a stop clamp so the ball never overshoots past zero into
/// the surface.
fn ground_bounce(ball: &mut Ball, ground: &GroundRef, hit: &Contact, ctx: &SimContext, spent: f32) {
    match hit.surface {
        ContactSurface::Face(seg) if seg.direction.x != 0.0 => {
            let mut along = ground.segment.direction.normalize_or_zero();
            if along.x < 0.0 {
                along = -along;
            }
            let sign = if ball.velocity.x != 0.0 {
                ball.velocity.x.signum()
            } else if along.y != 0.0 {
                // struck while moving purely vertically: head downhill
                -along.y.signum()
            } else {
                0.0
            };
            ball.velocity = along * (sign * ball.velocity.length());
        }
        _ => ball.velocity = -ball.velocity,
    }
    let acc = ball.ground_acceleration(&ground.segment, ctx, spent);
    ball.apply_ground_acceleration(acc);
    ball.position += ball.velocity * spent;
}

/// Post-reflection acceleration clamp: an axis is only accelerated if the
/// change is smaller than the velocity already on that axis, otherwise the
/// axis is zeroed instead of sign-flipping from float error. Against an
/// exactly vertical wall the y axis accumulates regardless, so a pressed
/// ball still slides down.
fn add_reflection_acceleration(ball: &mut Ball, acc: Vec2, vertical_hit: bool) {
    if acc.x.abs() < ball.velocity.x.abs() {
        ball.velocity.x += acc.x;
    } else {
        ball.velocity.x = 0.0;
    }
    if acc.y.abs() < ball.velocity.y.abs() {
        ball.velocity.y += acc.y;
    } else if vertical_hit {
        ball.velocity.y = acc.y;
    } else {
        ball.velocity.y = 0.0;
    }
}

/// Whether a rolling ball has left its ground segment: past either border
/// by more than a radius, the owning polygon is gone, or a corner
/// overwrite now excludes it.
fn off_ground(ball: &Ball, ground: &GroundRef, ctx: &SimContext) -> bool {
    let seg = &ground.segment;
    if seg.start_overrun(ball.position) > ball.radius || seg.end_overrun(ball.position) > ball.radius {
        return true;
    }
    match ctx.polygon(ground.polygon_id) {
        None => true,
        Some(poly) => poly.clears_ball(ball.position, ball.radius),
    }
}

/// Release a rolling ball at the lip of its ground segment: rewind to the
/// instant the center crossed the border, swap the rewound slice's ground
/// acceleration for air acceleration, and replay it in free flight.
/// Returns the replayed duration (the effective delta for the next
/// sub-step).
fn fall_off_ground(ball: &mut Ball, ground: &GroundRef, ctx: &SimContext, delta: f32) -> f32 {
    let seg = &ground.segment;
    let start = seg.start_overrun(ball.position);
    let end = seg.end_overrun(ball.position);
    let (overrun, border_normal) = if start >= end {
        (start, seg.start_border_normal)
    } else {
        (end, seg.end_border_normal)
    };

    ball.set_mode(BallMode::Airborne);
    let outward_speed = border_normal.dot(ball.velocity);
    if outward_speed <= f32::EPSILON {
        return 0.0;
    }
    let spent = (overrun / outward_speed).clamp(0.0, delta);
    if spent <= 0.0 {
        return 0.0;
    }
    ball.position -= ball.velocity * spent;
    let acc = ball.ground_acceleration(seg, ctx, spent);
    ball.velocity -= acc;
    let acc = ball.air_acceleration(ctx, spent);
    ball.velocity += acc;
    ball.position += ball.velocity * spent;
    spent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::{Segment, TerrainPolygon};
    use proptest::prelude::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    /// Context with one solid rectangle, returning the id.
    fn ctx_with_rect(min: Vec2, max: Vec2) -> (SimContext, u32) {
        let mut ctx = SimContext::new();
        let id = ctx.add_terrain(TerrainPolygon::rect(min, max));
        (ctx, id)
    }

    /// Put the ball on the rectangle's top face (segment index 2).
    fn rest_on_top(ctx: &SimContext, id: u32, x: f32) -> Ball {
        let poly = ctx.polygon(id).unwrap();
        let seg = poly.segments[2];
        let mut ball = Ball::new(v(x, seg.start.y + BALL_RADIUS));
        ball.set_mode(BallMode::Rolling(GroundRef::new(poly, 2).unwrap()));
        ball
    }

    #[test]
    fn test_free_fall_integrates_gravity() {
        let ctx = SimContext::new();
        let mut ball = Ball::new(v(0.0, 5.0));
        simulate(&mut ball, &ctx, SIM_DT);
        assert!((ball.velocity.y + GRAVITY * SIM_DT).abs() < 1e-6);
        assert!(ball.position.y < 5.0);
        assert_eq!(ball.status(), SimStatus::Running);
    }

    #[test]
    fn test_resting_ball_stays_put() {
        let (ctx, id) = ctx_with_rect(v(-2.0, -1.0), v(2.0, 0.0));
        let mut ball = rest_on_top(&ctx, id, 0.0);
        let pos = ball.position;
        for delta in [SIM_DT, 1.0 / 30.0, 0.25] {
            for _ in 0..100 {
                simulate(&mut ball, &ctx, delta);
            }
        }
        assert_eq!(ball.velocity, Vec2::ZERO);
        assert_eq!(ball.position, pos);
        assert!(ball.is_rolling());
    }

    #[test]
    fn test_drop_settles_into_rolling() {
        let (ctx, _) = ctx_with_rect(v(-2.0, -1.0), v(2.0, 0.0));
        let mut ball = Ball::new(v(0.0, 0.5));
        for _ in 0..600 {
            simulate(&mut ball, &ctx, SIM_DT);
        }
        assert_eq!(ball.status(), SimStatus::Running);
        assert!(ball.is_rolling());
        assert!(ball.velocity.length() < 0.05);
        assert!((ball.position.y - BALL_RADIUS).abs() < 0.01);
    }

    #[test]
    fn test_no_tunneling_through_floor() {
        let (ctx, _) = ctx_with_rect(v(-2.0, -1.0), v(2.0, 0.0));
        let mut ball = Ball::new(v(0.0, 0.21));
        ball.velocity = v(0.0, -5.0);
        for _ in 0..240 {
            simulate(&mut ball, &ctx, SIM_DT);
            assert!(
                ball.position.y >= BALL_RADIUS - 2.0 * COLLISION_THRESHOLD,
                "penetrated floor: y = {}",
                ball.position.y
            );
        }
    }

    #[test]
    fn test_bounce_loses_energy() {
        let (ctx, _) = ctx_with_rect(v(-2.0, -1.0), v(2.0, 0.0));
        let mut ball = Ball::new(v(0.0, 1.0));
        let mut bounced = false;
        for _ in 0..240 {
            let before = ball.velocity.length();
            simulate(&mut ball, &ctx, SIM_DT);
            if ball.last_contact().is_some() {
                assert!(ball.velocity.length() <= before);
                assert!(ball.velocity.y > 0.0, "should rebound upward");
                bounced = true;
                break;
            }
        }
        assert!(bounced);
    }

    // Ball resting right of a ledge, rolled leftward: it must cross the
    // corner, drop off, and never rise above the ground line.
    #[test]
    fn test_roll_off_left_edge() {
        let (ctx, id) = ctx_with_rect(v(1.0, -3.0), v(12.0, 0.0));
        let mut ball = rest_on_top(&ctx, id, 2.0);
        ball.velocity = v(-1.5, 0.0);

        let mut released_at = None;
        for _ in 0..600 {
            simulate(&mut ball, &ctx, SIM_DT);
            assert_eq!(ball.status(), SimStatus::Running);
            assert!(ball.position.y <= BALL_RADIUS + 1e-3);
            if released_at.is_none() && !ball.is_rolling() {
                released_at = Some(ball.position);
            }
        }
        let released_at = released_at.expect("ball never left the ledge");
        assert!(released_at.x <= 1.0 + 0.02);
        assert!(ball.position.y < -0.5, "ball should have fallen into the gap");
    }

    // Ball dropped straight onto a convex corner: the first contact must be
    // the vertex, reflecting radially, not either adjoining face.
    #[test]
    fn test_drop_onto_corner_hits_vertex() {
        let (ctx, _) = ctx_with_rect(v(-12.0, -3.0), v(-1.0, 0.0));
        let mut ball = Ball::new(v(-1.0, 5.0));

        let mut first = None;
        for _ in 0..600 {
            simulate(&mut ball, &ctx, SIM_DT);
            if let Some(contact) = ball.last_contact() {
                first = Some(*contact);
                break;
            }
        }
        let first = first.expect("ball never touched the terrain");
        assert!(first.surface.is_vertex());
        assert!((first.normal - v(0.0, 1.0)).length() < 1e-3);
        assert!(ball.velocity.y > 0.0);
    }

    // Ball blown hard against a block's vertical face: it must end up at
    // rest pressed against the wall without ever penetrating it.
    #[test]
    fn test_wind_presses_ball_against_wall() {
        let mut ctx = SimContext::new();
        ctx.wind = v(-10.0, 0.0);
        let ground = ctx.add_terrain(TerrainPolygon::rect(v(-12.0, -3.0), v(-1.0, 0.0)));
        ctx.add_terrain(TerrainPolygon::rect(v(-6.0, 0.0), v(-5.0, 1.0)));
        let mut ball = rest_on_top(&ctx, ground, -3.0);
        ball.velocity = v(-10.0, 0.0);

        let wall_limit = -5.0 + BALL_RADIUS - 2.0 * COLLISION_THRESHOLD;
        for _ in 0..1200 {
            simulate(&mut ball, &ctx, SIM_DT);
            assert_eq!(ball.status(), SimStatus::Running);
            assert!(
                ball.position.x >= wall_limit,
                "penetrated wall: x = {}",
                ball.position.x
            );
        }
        assert!(ball.is_rolling());
        assert!(ball.velocity.length() < 1e-3);
        assert!((ball.position.x - (-4.8)).abs() < 0.01, "x = {}", ball.position.x);
    }

    // Sliding parallel to a wall it overlaps, the ball has no closing
    // velocity: resolution must push it out along the normal without
    // replaying the slide, so it ends level with a free-falling twin.
    #[test]
    fn test_grazing_push_out_does_not_resimulate_time() {
        let mut ctx = SimContext::new();
        ctx.add_terrain(TerrainPolygon::new(
            vec![Segment::new(v(0.0, -5.0), v(0.0, 5.0))],
            vec![],
        ));
        let mut ball = Ball::new(v(0.1, 0.0));
        ball.velocity = v(0.0, -5.0);
        let mut twin = Ball::new(v(10.0, 0.0));
        twin.velocity = v(0.0, -5.0);

        simulate(&mut ball, &ctx, SIM_DT);
        simulate(&mut twin, &ctx, SIM_DT);

        assert_eq!(ball.status(), SimStatus::Running);
        assert!(ball.position.x >= 0.2 - 1e-4, "x = {}", ball.position.x);
        assert!((ball.position.y - twin.position.y).abs() < 1e-5);
    }

    #[test]
    fn test_nan_velocity_latches_error() {
        let (ctx, _) = ctx_with_rect(v(-2.0, -1.0), v(2.0, 0.0));
        let mut ball = Ball::new(v(0.0, 1.0));
        ball.velocity = v(f32::NAN, 0.0);
        simulate(&mut ball, &ctx, SIM_DT);
        assert_eq!(ball.status(), SimStatus::Error);
    }

    // A ball wedged exactly between two opposing faces produces tied
    // candidates whose blended normal is zero; resolution cannot make
    // progress and must hit the sub-step cap.
    #[test]
    fn test_wedged_ball_hits_substep_cap() {
        let mut ctx = SimContext::new();
        ctx.add_terrain(TerrainPolygon::new(
            vec![Segment::new(v(0.0, -1.0), v(0.0, 0.0))],
            vec![],
        ));
        ctx.add_terrain(TerrainPolygon::new(
            vec![Segment::new(v(0.1, 0.0), v(0.1, -1.0))],
            vec![],
        ));
        let mut ball = Ball::new(v(0.05, -0.5));
        simulate(&mut ball, &ctx, SIM_DT);
        assert_eq!(ball.status(), SimStatus::Error);
    }

    #[test]
    fn test_error_state_freezes_ball() {
        let mut ctx = SimContext::new();
        ctx.add_terrain(TerrainPolygon::new(
            vec![Segment::new(v(0.0, -1.0), v(0.0, 0.0))],
            vec![],
        ));
        ctx.add_terrain(TerrainPolygon::new(
            vec![Segment::new(v(0.1, 0.0), v(0.1, -1.0))],
            vec![],
        ));
        let mut ball = Ball::new(v(0.05, -0.5));
        simulate(&mut ball, &ctx, SIM_DT);
        assert_eq!(ball.status(), SimStatus::Error);

        let pos = ball.position;
        let vel = ball.velocity;
        for _ in 0..10 {
            simulate(&mut ball, &ctx, SIM_DT);
        }
        assert_eq!(ball.position, pos);
        assert_eq!(ball.velocity, vel);
    }

    /// Distance rolled on flat ground before speed drops below 0.02 m/s.
    fn roll_distance(speed: f32, resistance: f32) -> f32 {
        let (ctx, id) = ctx_with_rect(v(-50.0, -1.0), v(50.0, 0.0));
        let mut ball = rest_on_top(&ctx, id, 0.0);
        ball.roll_resistance = resistance;
        ball.velocity = v(speed, 0.0);
        let start = ball.position.x;
        for _ in 0..6000 {
            simulate(&mut ball, &ctx, SIM_DT);
            if ball.velocity.x.abs() < 0.02 {
                break;
            }
        }
        ball.position.x - start
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_roll_resistance_monotonic(
            speed in 0.5_f32..4.0,
            low in 0.02_f32..0.1,
            extra in 0.01_f32..0.1,
        ) {
            let far = roll_distance(speed, low);
            let near = roll_distance(speed, low + extra);
            prop_assert!(near <= far + 1e-3, "near {near} > far {far}");
        }
    }
}
