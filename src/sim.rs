use crate::config::{ConfigError, SpiderConfig};
use crate::gait::{GaitPhase, GaitScheduler, LegMask};
use crate::geom::{GridKey, Point};
use crate::lattice::{CandidateBuffer, Lattice};
use crate::leg::{LegState, StepMotion, LEG_COUNT};
use crate::selector::{select_target, ClaimedSet, SelectorParams};
use crate::spring::Spring2;
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    pub pointer: Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct StepReport {
    pub scheduled: LegMask,
    /// Subset of `scheduled` that actually started a step.
    pub stepped: LegMask,
    pub phase: GaitPhase,
}

pub struct Simulation {
    cfg: SpiderConfig,
    lattice: Lattice,
    legs: [LegState; LEG_COUNT],
    gait: GaitScheduler,
    spring: Spring2,
    body: Point,
    heading: f32,
    pointer: Point,
    candidates: CandidateBuffer,
    claimed: ClaimedSet,
    active: BTreeSet<GridKey>,
    selector: SelectorParams,
    motion: StepMotion,
    frame: u64,
}

impl Simulation {
    pub fn new(cfg: SpiderConfig, width: f32, height: f32) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let lattice = Lattice::new(cfg.grid_spacing, width, height);
        let centre = Point::new(lattice.width / 2.0, lattice.height / 2.0);
        Ok(Self {
            legs: [LegState::new(centre); LEG_COUNT],
            gait: GaitScheduler::new(&cfg),
            spring: Spring2::new(cfg.spring, centre),
            body: centre,
            heading: 0.0,
            pointer: centre,
            candidates: CandidateBuffer::default(),
            claimed: ClaimedSet::new(),
            active: BTreeSet::new(),
            selector: SelectorParams::from_config(&cfg),
            motion: StepMotion::from_config(&cfg),
            frame: 0,
            lattice,
            cfg,
        })
    }

    /// New surface size. The pointer is re-centred and the body walks there.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.lattice = Lattice::new(self.cfg.grid_spacing, width, height);
        let centre = self.centre();
        self.pointer = centre;
        self.spring.set_target(centre);
    }

    /// Put the body (and every untargeted foot) at `at` without animating.
    pub fn place(&mut self, at: Point) {
        self.spring.jump(at);
        self.body = at;
        self.pointer = at;
        for leg in self.legs.iter_mut().filter(|l| l.target.is_none()) {
            leg.current = at;
            leg.previous = at;
        }
    }

    pub fn step(&mut self, input: &FrameInput, dt: f32) -> StepReport {
        self.frame += 1;
        self.pointer = input.pointer;
        self.spring.set_target(self.pointer);
        self.spring.advance(dt);
        self.body = self.spring.position();
        // Keep the last heading while the body sits on the pointer.
        if self.body.dist_sq(self.pointer) > 1e-6 {
            self.heading = self.body.angle_to(self.pointer);
        }

        let body = self.body;
        self.lattice.collect(
            body,
            self.cfg.leg_reach,
            self.cfg.candidate_exclusion(),
            &mut self.candidates,
        );

        self.claimed.reset(self.candidates.len());
        self.active.clear();
        for leg in &self.legs {
            let Some(fh) = leg.target else { continue };
            if !(leg.planted || leg.stepping) {
                continue;
            }
            self.active.insert(fh.key);
            if let Some(i) = self.candidates.position(fh.key) {
                self.claimed.claim(i);
            }
        }

        let scheduled = self.gait.schedule(&self.legs, body);
        let mut stepped = LegMask::empty();
        for leg in scheduled.iter() {
            let angle = self.heading + self.cfg.leg_angle_offsets[leg];
            let Some(i) = select_target(
                body,
                angle,
                self.candidates.as_slice(),
                &self.claimed,
                &self.selector,
            ) else {
                continue;
            };
            let fh = self.candidates.as_slice()[i];
            self.claimed.claim(i);
            self.active.insert(fh.key);
            self.legs[leg].begin_step(fh);
            stepped.insert(leg);
        }

        for leg in self.legs.iter_mut() {
            leg.advance(body, &self.motion);
        }

        StepReport {
            scheduled,
            stepped,
            phase: self.gait.phase(),
        }
    }

    fn centre(&self) -> Point {
        Point::new(self.lattice.width / 2.0, self.lattice.height / 2.0)
    }

    pub fn config(&self) -> &SpiderConfig {
        &self.cfg
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn legs(&self) -> &[LegState; LEG_COUNT] {
        &self.legs
    }

    pub fn body(&self) -> Point {
        self.body
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn phase(&self) -> GaitPhase {
        self.gait.phase()
    }

    pub fn candidates(&self) -> &CandidateBuffer {
        &self.candidates
    }

    /// Lattice points held or being reached for this frame.
    pub fn active(&self) -> &BTreeSet<GridKey> {
        &self.active
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Feet far enough from the body to be drawn, with their leg index.
    pub fn feet(&self) -> impl Iterator<Item = (usize, Point)> + '_ {
        let min_sq = self.cfg.foot_threshold().powi(2);
        let body = self.body;
        self.legs
            .iter()
            .enumerate()
            .map(|(i, leg)| (i, leg.current))
            .filter(move |(_, p)| p.dist_sq(body) > min_sq)
    }

    pub fn planted_count(&self) -> usize {
        self.legs.iter().filter(|l| l.planted).count()
    }

    pub fn stepping_count(&self) -> usize {
        self.legs.iter().filter(|l| l.stepping).count()
    }
}
