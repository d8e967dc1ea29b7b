use crate::config::SpiderConfig;
use crate::geom::Point;
use crate::leg::{LegState, LEG_COUNT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GaitPhase {
    #[default]
    A,
    B,
}

impl GaitPhase {
    pub fn flipped(self) -> Self {
        match self {
            GaitPhase::A => GaitPhase::B,
            GaitPhase::B => GaitPhase::A,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GaitPhase::A => "A",
            GaitPhase::B => "B",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LegMask(u8);

impl LegMask {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, leg: usize) {
        debug_assert!(leg < LEG_COUNT);
        self.0 |= 1 << leg;
    }

    pub fn contains(self, leg: usize) -> bool {
        leg < LEG_COUNT && self.0 & (1 << leg) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..LEG_COUNT).filter(move |&i| self.contains(i))
    }
}

/// Squared-distance bounds a planted foot must stay within.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepThresholds {
    pub far_sq: f32,
    pub near_sq: f32,
}

impl StepThresholds {
    pub fn from_config(cfg: &SpiderConfig) -> Self {
        Self {
            far_sq: cfg.step_far().powi(2),
            near_sq: cfg.step_near().powi(2),
        }
    }
}

pub fn needs_step(leg: &LegState, body: Point, th: &StepThresholds) -> bool {
    if leg.stepping {
        return false;
    }
    match leg.target_dist_sq(body) {
        None => true,
        Some(d) => d > th.far_sq || d < th.near_sq,
    }
}

#[derive(Clone, Debug)]
pub struct GaitScheduler {
    phase: GaitPhase,
    group_a: LegMask,
    group_b: LegMask,
    thresholds: StepThresholds,
}

impl GaitScheduler {
    pub fn new(cfg: &SpiderConfig) -> Self {
        let mut group_a = LegMask::empty();
        let mut group_b = LegMask::empty();
        for leg in 0..LEG_COUNT {
            match cfg.group_of(leg) {
                GaitPhase::A => group_a.insert(leg),
                GaitPhase::B => group_b.insert(leg),
            }
        }
        Self {
            phase: GaitPhase::A,
            group_a,
            group_b,
            thresholds: StepThresholds::from_config(cfg),
        }
    }

    pub fn phase(&self) -> GaitPhase {
        self.phase
    }

    fn group(&self, phase: GaitPhase) -> LegMask {
        match phase {
            GaitPhase::A => self.group_a,
            GaitPhase::B => self.group_b,
        }
    }

    fn due(&self, phase: GaitPhase, legs: &[LegState; LEG_COUNT], body: Point) -> LegMask {
        let mut out = LegMask::empty();
        for leg in self.group(phase).iter() {
            if needs_step(&legs[leg], body, &self.thresholds) {
                out.insert(leg);
            }
        }
        out
    }

    /// Legs that should start a step this frame. The active group goes first;
    /// the phase flips whenever either group is serviced.
    pub fn schedule(&mut self, legs: &[LegState; LEG_COUNT], body: Point) -> LegMask {
        let active = self.due(self.phase, legs, body);
        if !active.is_empty() {
            self.phase = self.phase.flipped();
            return active;
        }
        let inactive = self.due(self.phase.flipped(), legs, body);
        if !inactive.is_empty() {
            self.phase = self.phase.flipped();
        }
        inactive
    }
}
