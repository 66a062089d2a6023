//! Gameplay tuning for the court and the ball.
//!
//! Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

use crate::domain::state::Side;

/// Fixed court geometry in pixels. Origin is the top-left corner, y grows downward.
#[derive(Debug, Clone, Copy)]
pub struct Court {
    pub width: f32,
    pub height: f32,

    pub paddle_width: f32,
    pub paddle_height: f32,

    /// Gap between a side wall and the back of the paddle on that side.
    pub paddle_inset: f32,

    pub ball_radius: f32,
}

impl Default for Court {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            paddle_width: 10.0,
            paddle_height: 100.0,
            paddle_inset: 10.0,
            ball_radius: 7.0,
        }
    }
}

impl Court {
    /// Left edge of the paddle rectangle for the given side.
    pub fn paddle_x(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.paddle_inset,
            Side::Right => self.width - self.paddle_inset - self.paddle_width,
        }
    }

    /// Clamp a requested paddle top edge into `0..=height - paddle_height`.
    /// Non-finite requests collapse to the top of the court.
    pub fn clamp_paddle_y(&self, y: f32) -> f32 {
        if !y.is_finite() {
            return 0.0;
        }
        y.clamp(0.0, self.height - self.paddle_height)
    }

    /// Centered paddle position used when a player takes a slot.
    pub fn paddle_start_y(&self) -> f32 {
        self.height / 2.0 - self.paddle_height / 2.0
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BallTuning {
    /// Serve speed in pixels per second.
    pub base_speed: f32,

    /// Hard cap on speed magnitude after any collision response.
    pub max_speed: f32,

    /// Half-width of the serve cone in radians, measured from the horizontal.
    pub serve_angle: f32,

    /// Vertical speed added per unit of hit offset from the paddle center
    /// (offset normalized to -1..=1). Zero keeps pure horizontal reflection.
    pub paddle_deflection: f32,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            base_speed: 340.0,
            max_speed: 900.0,
            serve_angle: std::f32::consts::FRAC_PI_4,
            paddle_deflection: 0.0,
        }
    }
}
