use crate::domain::state::{Ball, Paddle, Rally, Role, Side};
use crate::domain::tuning::{BallTuning, Court};
use rand::Rng;

// Upper bound on sub-steps per tick; only reachable with absurd dt values.
const MAX_SUBSTEPS: u32 = 64;

/// Result of advancing the rally by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub rally: Rally,
    /// Role that scored this tick, if any.
    pub goal: Option<Role>,
}

/// Moves every occupied paddle to its latched target, clamped to the court.
pub fn apply_paddle_targets(rally: &mut Rally, court: &Court) {
    for paddle in [rally.left.as_mut(), rally.right.as_mut()]
        .into_iter()
        .flatten()
    {
        paddle.y = court.clamp_paddle_y(paddle.target_y);
    }
}

/// Advances paddles, ball and score by `dt` seconds.
///
/// The ball is sub-stepped so it never travels more than half a paddle thickness
/// per step, which keeps it from tunneling through a paddle at any speed up to
/// `tuning.max_speed`. Processing stops at the first goal.
pub fn advance<R: Rng>(
    mut rally: Rally,
    court: &Court,
    tuning: &BallTuning,
    dt: f32,
    rng: &mut R,
) -> StepOutcome {
    apply_paddle_targets(&mut rally, court);

    let travel = tuning.max_speed.max(rally.ball.speed()) * dt;
    let max_step = (court.paddle_width / 2.0).max(f32::EPSILON);
    let steps = ((travel / max_step).ceil() as u32).clamp(1, MAX_SUBSTEPS);
    let sub_dt = dt / steps as f32;

    for _ in 0..steps {
        let ball = &mut rally.ball;
        ball.x += ball.vx * sub_dt;
        ball.y += ball.vy * sub_dt;

        // Walls before paddles within the same step.
        resolve_walls(ball, court);
        for paddle in [rally.left, rally.right].into_iter().flatten() {
            if resolve_paddle(&mut rally.ball, &paddle, court, tuning) {
                break;
            }
        }

        if let Some(conceded) = conceding_side(&rally.ball, court) {
            let scorer = match conceded {
                Side::Left => {
                    rally.score.player2 += 1;
                    Role::Player2
                }
                Side::Right => {
                    rally.score.player1 += 1;
                    Role::Player1
                }
            };
            rally.ball = serve(court, tuning, conceded, rng);
            return StepOutcome {
                rally,
                goal: Some(scorer),
            };
        }
    }

    StepOutcome { rally, goal: None }
}

/// Places the ball at the court center moving toward `toward` at base speed,
/// at a random angle inside the serve cone.
pub fn serve<R: Rng>(court: &Court, tuning: &BallTuning, toward: Side, rng: &mut R) -> Ball {
    let (x, y) = court.center();
    let angle = if tuning.serve_angle > 0.0 {
        rng.gen_range(-tuning.serve_angle..=tuning.serve_angle)
    } else {
        0.0
    };
    let speed = tuning.base_speed.min(tuning.max_speed);
    let dir = match toward {
        Side::Left => -1.0,
        Side::Right => 1.0,
    };

    Ball {
        x,
        y,
        vx: dir * speed * angle.cos(),
        vy: speed * angle.sin(),
    }
}

fn resolve_walls(ball: &mut Ball, court: &Court) {
    let r = court.ball_radius;
    if ball.y - r <= 0.0 {
        ball.y = r;
        ball.vy = ball.vy.abs();
    } else if ball.y + r >= court.height {
        ball.y = court.height - r;
        ball.vy = -ball.vy.abs();
    }
}

// Returns true when the ball bounced off this paddle.
fn resolve_paddle(ball: &mut Ball, paddle: &Paddle, court: &Court, tuning: &BallTuning) -> bool {
    let r = court.ball_radius;
    let left = court.paddle_x(paddle.side);
    let right = left + court.paddle_width;

    // Only the face toward the court reflects; a ball already behind the paddle is a goal.
    let approaching = match paddle.side {
        Side::Left => ball.vx < 0.0 && ball.x >= left,
        Side::Right => ball.vx > 0.0 && ball.x <= right,
    };
    let overlaps_x = ball.x - r <= right && ball.x + r >= left;
    let overlaps_y = ball.y + r >= paddle.y && ball.y - r <= paddle.y + court.paddle_height;
    if !(approaching && overlaps_x && overlaps_y) {
        return false;
    }

    ball.vx = -ball.vx;
    ball.x = match paddle.side {
        Side::Left => right + r,
        Side::Right => left - r,
    };

    if tuning.paddle_deflection != 0.0 {
        let half = court.paddle_height / 2.0;
        let offset = ((ball.y - (paddle.y + half)) / half).clamp(-1.0, 1.0);
        ball.vy += offset * tuning.paddle_deflection;
    }
    clamp_speed(ball, tuning.max_speed);
    true
}

fn conceding_side(ball: &Ball, court: &Court) -> Option<Side> {
    let r = court.ball_radius;
    if ball.x - r < 0.0 {
        Some(Side::Left)
    } else if ball.x + r > court.width {
        Some(Side::Right)
    } else {
        None
    }
}

fn clamp_speed(ball: &mut Ball, max_speed: f32) {
    let speed = ball.speed();
    if speed > max_speed && speed > 0.0 {
        let scale = max_speed / speed;
        ball.vx *= scale;
        ball.vy *= scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Score;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const DT: f32 = 1.0 / 60.0;

    fn rally_with(ball: Ball, left_y: Option<f32>, right_y: Option<f32>) -> Rally {
        Rally {
            ball,
            left: left_y.map(|y| Paddle::new(Side::Left, y)),
            right: right_y.map(|y| Paddle::new(Side::Right, y)),
            score: Score::default(),
        }
    }

    fn ball(x: f32, y: f32, vx: f32, vy: f32) -> Ball {
        Ball { x, y, vx, vy }
    }

    fn inside_paddle(ball: &Ball, paddle: &Paddle, court: &Court) -> bool {
        let left = court.paddle_x(paddle.side);
        ball.x > left
            && ball.x < left + court.paddle_width
            && ball.y > paddle.y
            && ball.y < paddle.y + court.paddle_height
    }

    #[test]
    fn when_targets_are_out_of_range_then_paddles_stay_on_court() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(7);

        for target in [-1_000.0, -0.5, 0.0, 150.0, 299.9, 300.0, 301.0, 1e9] {
            let mut rally = rally_with(ball(400.0, 200.0, 0.0, 0.0), Some(0.0), Some(0.0));
            if let Some(paddle) = rally.left.as_mut() {
                paddle.target_y = target;
            }
            if let Some(paddle) = rally.right.as_mut() {
                paddle.target_y = -target;
            }

            let out = advance(rally, &court, &tuning, DT, &mut rng).rally;
            for paddle in [out.left, out.right].into_iter().flatten() {
                assert!(paddle.y >= 0.0, "target {target} gave {}", paddle.y);
                assert!(paddle.y <= court.height - court.paddle_height);
            }
        }
    }

    #[test]
    fn when_nothing_is_hit_then_ball_integrates_linearly() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(400.0, 200.0, 240.0, -120.0), None, None);

        let out = advance(rally, &court, &tuning, DT, &mut rng);

        assert!(out.goal.is_none());
        assert!((out.rally.ball.x - 404.0).abs() < 1e-3);
        assert!((out.rally.ball.y - 198.0).abs() < 1e-3);
    }

    #[test]
    fn when_ball_hits_top_wall_then_vy_reflects_and_ball_stays_inside() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(400.0, 8.0, 0.0, -240.0), None, None);

        let out = advance(rally, &court, &tuning, DT, &mut rng).rally;

        assert_eq!(out.ball.vy, 240.0);
        assert!(out.ball.y - court.ball_radius >= 0.0);
    }

    #[test]
    fn when_ball_hits_bottom_wall_then_vy_reflects() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(400.0, 392.0, 0.0, 240.0), None, None);

        let out = advance(rally, &court, &tuning, DT, &mut rng).rally;

        assert_eq!(out.ball.vy, -240.0);
        assert!(out.ball.y + court.ball_radius <= court.height);
    }

    #[test]
    fn when_ball_meets_left_paddle_then_vx_flips_and_ball_is_pushed_out() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(30.0, 200.0, -300.0, 0.0), Some(150.0), None);

        let out = advance(rally, &court, &tuning, DT, &mut rng);

        assert!(out.goal.is_none());
        assert_eq!(out.rally.ball.vx, 300.0);
        assert!(out.rally.ball.x - court.ball_radius >= 20.0);
    }

    #[test]
    fn when_ball_meets_right_paddle_then_vx_flips() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(770.0, 200.0, 300.0, 0.0), None, Some(150.0));

        let out = advance(rally, &court, &tuning, DT, &mut rng);

        assert!(out.goal.is_none());
        assert_eq!(out.rally.ball.vx, -300.0);
        assert!(out.rally.ball.x + court.ball_radius <= 780.0);
    }

    #[test]
    fn when_ball_moves_at_max_speed_then_it_never_tunnels_through_a_paddle() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut rally = rally_with(
            ball(400.0, 200.0, -tuning.max_speed, 0.0),
            Some(150.0),
            None,
        );

        let mut bounced = false;
        for _ in 0..120 {
            let out = advance(rally, &court, &tuning, DT, &mut rng);
            assert!(out.goal.is_none(), "ball tunneled through the paddle");
            let paddle = out.rally.left.expect("left paddle");
            assert!(!inside_paddle(&out.rally.ball, &paddle, &court));
            rally = out.rally;
            if rally.ball.vx > 0.0 {
                bounced = true;
                break;
            }
        }
        assert!(bounced);
    }

    #[test]
    fn when_ball_is_already_behind_paddle_then_it_scores_instead_of_bouncing() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(8.0, 200.0, -300.0, 0.0), Some(150.0), None);

        let out = advance(rally, &court, &tuning, DT, &mut rng);

        assert_eq!(out.goal, Some(Role::Player2));
    }

    #[test]
    fn when_ball_crosses_left_edge_then_player2_scores_and_ball_serves_from_center() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(11);
        let rally = rally_with(ball(8.0, 200.0, -300.0, 0.0), None, Some(150.0));

        let out = advance(rally, &court, &tuning, DT, &mut rng);

        assert_eq!(out.goal, Some(Role::Player2));
        assert_eq!(out.rally.score, Score { player1: 0, player2: 1 });
        assert_eq!((out.rally.ball.x, out.rally.ball.y), (400.0, 200.0));
        assert!(out.rally.ball.vx < 0.0, "serve heads toward the conceding side");
        assert!((out.rally.ball.speed() - tuning.base_speed).abs() < 1e-2);
        // Paddles are untouched by a goal.
        assert_eq!(out.rally.right.map(|p| p.y), Some(150.0));
    }

    #[test]
    fn when_ball_crosses_right_edge_then_player1_scores() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(12);
        let rally = rally_with(ball(792.0, 50.0, 300.0, 60.0), None, None);

        let out = advance(rally, &court, &tuning, DT, &mut rng);

        assert_eq!(out.goal, Some(Role::Player1));
        assert_eq!(out.rally.score, Score { player1: 1, player2: 0 });
        assert_eq!((out.rally.ball.x, out.rally.ball.y), (400.0, 200.0));
        assert!(out.rally.ball.vx > 0.0);
    }

    #[test]
    fn when_deflection_is_enabled_then_off_center_hits_angle_the_return() {
        let court = Court::default();
        let tuning = BallTuning {
            paddle_deflection: 200.0,
            ..BallTuning::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(30.0, 240.0, -300.0, 0.0), Some(150.0), None);

        let out = advance(rally, &court, &tuning, DT, &mut rng).rally;

        assert!(out.ball.vx > 0.0);
        assert!(out.ball.vy > 0.0, "lower-half hit returns downward");
    }

    #[test]
    fn when_deflection_would_exceed_max_speed_then_speed_is_capped() {
        let court = Court::default();
        let tuning = BallTuning {
            paddle_deflection: 400.0,
            ..BallTuning::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let rally = rally_with(ball(30.0, 240.0, -890.0, 0.0), Some(150.0), None);

        let out = advance(rally, &court, &tuning, DT, &mut rng).rally;

        assert!(out.ball.speed() <= tuning.max_speed + 1e-2);
    }

    #[test]
    fn when_serving_then_direction_stays_inside_the_cone() {
        let court = Court::default();
        let tuning = BallTuning::default();
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..200 {
            let ball = serve(&court, &tuning, Side::Right, &mut rng);
            assert!(ball.vx > 0.0);
            let angle = (ball.vy / ball.vx).atan().abs();
            assert!(angle <= tuning.serve_angle + 1e-4);
        }
    }
}
