use crate::config::SpiderConfig;
use crate::geom::Point;
use crate::lattice::Foothold;

pub const LEG_COUNT: usize = 8;

#[inline]
pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Height of the foot above the ground at step progress `t`.
#[inline]
pub fn lift(t: f32, height: f32) -> f32 {
    4.0 * t * (1.0 - t) * height
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepMotion {
    pub step_speed: f32,
    pub lift_height: f32,
    pub idle_smoothing: f32,
}

impl StepMotion {
    pub fn from_config(cfg: &SpiderConfig) -> Self {
        Self {
            step_speed: cfg.step_speed,
            lift_height: cfg.lift_height,
            idle_smoothing: cfg.idle_smoothing,
        }
    }
}

/// One leg. `stepping` and `planted` are never both set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegState {
    pub target: Option<Foothold>,
    pub current: Point,
    pub previous: Point,
    pub stepping: bool,
    pub step_progress: f32,
    pub planted: bool,
}

impl LegState {
    pub fn new(at: Point) -> Self {
        Self {
            target: None,
            current: at,
            previous: at,
            stepping: false,
            step_progress: 0.0,
            planted: false,
        }
    }

    pub fn begin_step(&mut self, to: Foothold) {
        self.previous = self.current;
        self.target = Some(to);
        self.stepping = true;
        self.step_progress = 0.0;
        self.planted = false;
    }

    /// Advance one frame. Legs without a target drift toward `body`.
    pub fn advance(&mut self, body: Point, motion: &StepMotion) {
        let Some(target) = self.target else {
            self.current = self.current.lerp(body, motion.idle_smoothing);
            return;
        };
        if !self.stepping {
            return;
        }

        self.step_progress = (self.step_progress + motion.step_speed).min(1.0);
        let t = self.step_progress;
        if t >= 1.0 {
            self.current = target.pos;
            self.stepping = false;
            self.planted = true;
            return;
        }

        let ground = self.previous.lerp(target.pos, ease_in_out_quad(t));
        self.current = ground.offset(0.0, -lift(t, motion.lift_height));
    }

    pub fn target_dist_sq(&self, body: Point) -> Option<f32> {
        self.target.map(|fh| fh.pos.dist_sq(body))
    }
}
