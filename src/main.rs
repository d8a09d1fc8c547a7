//! Springshot headless demo
//!
//! Launches one ball from the catapult across the demo course and logs
//! where it ends up. Wind is drawn from a seeded RNG so runs are
//! reproducible; pass a seed as the first argument.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use springshot::Settings;
use springshot::consts::SIM_DT;
use springshot::sim::{self, Ball, Course, SimStatus, course};

const LAUNCH_SPEED: f32 = 11.0;
const LAUNCH_ANGLE: f32 = std::f32::consts::FRAC_PI_4;
const MAX_FLIGHT_SECS: f32 = 30.0;

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(7);
    let mut rng = Pcg32::seed_from_u64(seed);

    let mut settings = Settings::default();
    settings.wind = Vec2::new(rng.random_range(-4.0..4.0), 0.0);

    let mut ctx = sim::SimContext::new();
    let mut course = Course::install(&mut ctx);
    let mut ball = Ball::new(course::LAUNCH_POSITION);
    settings.apply(&mut ctx, &mut ball);

    ball.velocity = Vec2::new(LAUNCH_ANGLE.cos(), LAUNCH_ANGLE.sin()) * LAUNCH_SPEED;
    log::info!(
        "seed {seed}: launch from {:?} at {:?}, wind {:?}",
        ball.position,
        ball.velocity,
        ctx.wind
    );

    let mut calm_frames = 0u32;
    let frames = (MAX_FLIGHT_SECS / SIM_DT) as u32;
    for frame in 0..frames {
        sim::simulate(&mut ball, &ctx, SIM_DT);

        // The platform only becomes solid once the ball is clear of it.
        if !course.catapult_active() && course.ball_clear_of_catapult(&ball) {
            course.activate_catapult(&mut ctx);
            log::debug!("catapult platform armed as a collider");
        }

        if ball.status() == SimStatus::Error {
            log::error!("simulation diverged at frame {frame}");
            return;
        }
        if course.in_hole(&ball) {
            log::info!("in the hole after {:.2} s", frame as f32 * SIM_DT);
            return;
        }
        if ball.is_rolling() && ball.velocity.length() < 0.005 {
            calm_frames += 1;
            if calm_frames > 60 {
                log::info!("ball came to rest at {:?}", ball.position);
                return;
            }
        } else {
            calm_frames = 0;
        }
        if ball.position.y < -20.0 {
            log::info!("ball fell out of the world at x = {:.2}", ball.position.x);
            return;
        }
    }
    log::info!("time limit reached; ball at {:?}", ball.position);
}
