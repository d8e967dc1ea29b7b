use crate::geom::Point;
use serde::{Deserialize, Serialize};

/// Internal integration step, independent of the frame rate.
const SUBSTEP: f32 = 1.0 / 240.0;
/// Longest stretch of wall time one `advance` will integrate.
const MAX_CARRY: f32 = 0.25;
const REST_DELTA: f32 = 0.5;
const REST_SPEED: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringParams {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            stiffness: 120.0,
            damping: 25.0,
            mass: 0.8,
        }
    }
}

/// Damped spring on one axis, integrated in fixed sub-steps.
#[derive(Clone, Debug)]
pub struct Spring {
    params: SpringParams,
    value: f32,
    velocity: f32,
    target: f32,
    carry: f32,
}

impl Spring {
    pub fn new(params: SpringParams, at: f32) -> Self {
        Self {
            params,
            value: at,
            velocity: 0.0,
            target: at,
            carry: 0.0,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn jump(&mut self, at: f32) {
        self.value = at;
        self.target = at;
        self.velocity = 0.0;
        self.carry = 0.0;
    }

    pub fn advance(&mut self, dt: f32) {
        self.carry = (self.carry + dt.max(0.0)).min(MAX_CARRY);
        let SpringParams {
            stiffness,
            damping,
            mass,
        } = self.params;
        while self.carry >= SUBSTEP {
            self.carry -= SUBSTEP;
            let force = -stiffness * (self.value - self.target) - damping * self.velocity;
            self.velocity += force / mass * SUBSTEP;
            self.value += self.velocity * SUBSTEP;
        }
        if self.is_at_rest() {
            self.value = self.target;
            self.velocity = 0.0;
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_at_rest(&self) -> bool {
        (self.value - self.target).abs() < REST_DELTA && self.velocity.abs() < REST_SPEED
    }
}

#[derive(Clone, Debug)]
pub struct Spring2 {
    x: Spring,
    y: Spring,
}

impl Spring2 {
    pub fn new(params: SpringParams, at: Point) -> Self {
        Self {
            x: Spring::new(params, at.x),
            y: Spring::new(params, at.y),
        }
    }

    pub fn set_target(&mut self, target: Point) {
        self.x.set_target(target.x);
        self.y.set_target(target.y);
    }

    pub fn jump(&mut self, at: Point) {
        self.x.jump(at.x);
        self.y.jump(at.y);
    }

    pub fn advance(&mut self, dt: f32) {
        self.x.advance(dt);
        self.y.advance(dt);
    }

    pub fn position(&self) -> Point {
        Point::new(self.x.value(), self.y.value())
    }

    pub fn target(&self) -> Point {
        Point::new(self.x.target(), self.y.target())
    }

    pub fn is_at_rest(&self) -> bool {
        self.x.is_at_rest() && self.y.is_at_rest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_on_target_without_overshoot() {
        let mut s = Spring::new(SpringParams::default(), 0.0);
        s.set_target(100.0);
        let mut prev = 0.0;
        for _ in 0..180 {
            s.advance(1.0 / 60.0);
            assert!(s.value() <= 100.0 + 1e-3);
            assert!(s.value() >= prev - 1e-4, "overdamped spring moves one way");
            prev = s.value();
        }
        assert!(s.is_at_rest());
        assert_eq!(s.value(), 100.0);
    }

    #[test]
    fn sub_step_remainder_carries_between_frames() {
        let mut s = Spring::new(SpringParams::default(), 0.0);
        s.set_target(50.0);
        s.advance(SUBSTEP * 0.6);
        assert_eq!(s.value(), 0.0);
        s.advance(SUBSTEP * 0.6);
        assert!(s.value() > 0.0);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let mut s = Spring::new(SpringParams::default(), 0.0);
        s.set_target(1000.0);
        s.advance(30.0);
        assert!(s.value() < 1000.0);
        assert!(!s.is_at_rest());
    }

    #[test]
    fn jump_lands_at_rest() {
        let mut s = Spring2::new(SpringParams::default(), Point::new(0.0, 0.0));
        s.set_target(Point::new(40.0, -40.0));
        s.advance(0.05);
        s.jump(Point::new(7.0, 9.0));
        assert_eq!(s.position(), Point::new(7.0, 9.0));
        assert!(s.is_at_rest());
        s.advance(1.0);
        assert_eq!(s.position(), Point::new(7.0, 9.0));
    }
}
