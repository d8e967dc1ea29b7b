use crate::config::SpiderConfig;
use crate::geom::{angle_diff, Point};
use crate::lattice::Foothold;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectorParams {
    pub reach: f32,
    pub min_separation: f32,
    pub ideal_reach: f32,
    pub cone_half_angle: f32,
    pub angular_penalty: f32,
}

impl SelectorParams {
    pub fn from_config(cfg: &SpiderConfig) -> Self {
        Self {
            reach: cfg.leg_reach,
            min_separation: cfg.min_separation(),
            ideal_reach: cfg.ideal_reach,
            cone_half_angle: cfg.cone_half_angle,
            angular_penalty: cfg.angular_penalty,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClaimedSet {
    flags: Vec<bool>,
}

impl ClaimedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unclaim everything and size for `len` candidates. Keeps the allocation.
    pub fn reset(&mut self, len: usize) {
        self.flags.clear();
        self.flags.resize(len, false);
    }

    pub fn claim(&mut self, index: usize) {
        if let Some(f) = self.flags.get_mut(index) {
            *f = true;
        }
    }

    pub fn is_claimed(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }
}

/// Best unclaimed candidate for a leg pointing along `preferred_angle`.
///
/// Lower score wins: distance to the ideal point `ideal_reach · reach` out
/// along the preferred angle, plus the angular deviation times the penalty.
/// Candidates outside `(min_separation², reach²]` or outside the cone are
/// skipped. The first of equally scored candidates wins.
pub fn select_target(
    body: Point,
    preferred_angle: f32,
    candidates: &[Foothold],
    claimed: &ClaimedSet,
    params: &SelectorParams,
) -> Option<usize> {
    let ideal = body.polar(preferred_angle, params.reach * params.ideal_reach);
    let min_sq = params.min_separation * params.min_separation;
    let max_sq = params.reach * params.reach;

    let mut best: Option<(usize, f32)> = None;
    for (i, fh) in candidates.iter().enumerate() {
        if claimed.is_claimed(i) {
            continue;
        }
        let d = fh.pos.dist_sq(body);
        if d <= min_sq || d > max_sq {
            continue;
        }
        let dev = angle_diff(body.angle_to(fh.pos), preferred_angle);
        if dev > params.cone_half_angle {
            continue;
        }
        let score = fh.pos.dist(ideal) + dev * params.angular_penalty;
        if best.map_or(true, |(_, s)| score < s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::GridKey;
    use crate::lattice::{CandidateBuffer, Lattice};
    use std::f32::consts::PI;

    fn params() -> SelectorParams {
        SelectorParams::from_config(&SpiderConfig::default())
    }

    fn fh(x: i32, y: i32) -> Foothold {
        Foothold::new(GridKey::new(x, y), 40.0)
    }

    #[test]
    fn picks_the_point_nearest_the_ideal() {
        let body = Point::new(200.0, 200.0);
        // Ideal point for angle 0 is (278, 200).
        let cands = [fh(6, 5), fh(7, 5), fh(8, 5)];
        let mut claimed = ClaimedSet::new();
        claimed.reset(cands.len());
        assert_eq!(select_target(body, 0.0, &cands, &claimed, &params()), Some(1));
    }

    #[test]
    fn claimed_candidates_are_skipped() {
        let body = Point::new(200.0, 200.0);
        let cands = [fh(6, 5), fh(7, 5), fh(8, 5)];
        let mut claimed = ClaimedSet::new();
        claimed.reset(cands.len());
        claimed.claim(1);
        let got = select_target(body, 0.0, &cands, &claimed, &params());
        assert!(got.is_some());
        assert_ne!(got, Some(1));
    }

    #[test]
    fn nothing_in_the_cone_means_no_target() {
        let body = Point::new(200.0, 200.0);
        // All candidates lie to the right; ask for the left.
        let cands = [fh(6, 5), fh(7, 5), fh(8, 5)];
        let mut claimed = ClaimedSet::new();
        claimed.reset(cands.len());
        assert_eq!(select_target(body, PI, &cands, &claimed, &params()), None);
    }

    #[test]
    fn separation_bounds_are_exclusive_below_and_inclusive_above() {
        let p = params();
        let body = Point::new(0.0, 0.0);
        // min_separation = 18; a point exactly 18 away is rejected.
        let near = Foothold {
            key: GridKey::new(0, 0),
            pos: Point::new(18.0, 0.0),
        };
        let at_reach = Foothold {
            key: GridKey::new(3, 0),
            pos: Point::new(120.0, 0.0),
        };
        let beyond = Foothold {
            key: GridKey::new(4, 0),
            pos: Point::new(120.5, 0.0),
        };
        let mut claimed = ClaimedSet::new();
        claimed.reset(1);
        assert_eq!(select_target(body, 0.0, &[near], &claimed, &p), None);
        assert_eq!(select_target(body, 0.0, &[at_reach], &claimed, &p), Some(0));
        assert_eq!(select_target(body, 0.0, &[beyond], &claimed, &p), None);
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let body = Point::new(200.0, 200.0);
        let pos = Point::new(280.0, 200.0);
        let cands = [
            Foothold {
                key: GridKey::new(7, 5),
                pos,
            },
            Foothold {
                key: GridKey::new(70, 50),
                pos,
            },
        ];
        let mut claimed = ClaimedSet::new();
        claimed.reset(cands.len());
        assert_eq!(select_target(body, 0.0, &cands, &claimed, &params()), Some(0));
        claimed.claim(0);
        assert_eq!(select_target(body, 0.0, &cands, &claimed, &params()), Some(1));
    }

    #[test]
    fn preferred_angles_past_pi_still_find_targets() {
        let body = Point::new(200.0, 200.0);
        let cands = [fh(3, 5)];
        let mut claimed = ClaimedSet::new();
        claimed.reset(1);
        // Straight left, expressed as a heading that has wound past a full turn.
        let got = select_target(body, PI + 2.0 * PI, &cands, &claimed, &params());
        assert_eq!(got, Some(0));
    }

    #[test]
    fn result_always_satisfies_the_filters() {
        let p = params();
        let lattice = Lattice::new(40.0, 800.0, 600.0);
        let mut buf = CandidateBuffer::default();
        let mut claimed = ClaimedSet::new();
        for step in 0..32 {
            let body = Point::new(150.0 + step as f32 * 13.7, 120.0 + step as f32 * 9.1);
            lattice.collect(body, p.reach, 15.0, &mut buf);
            claimed.reset(buf.len());
            for i in (0..buf.len()).step_by(3) {
                claimed.claim(i);
            }
            for k in 0..8 {
                let angle = -PI + k as f32 * PI / 4.0;
                if let Some(i) = select_target(body, angle, buf.as_slice(), &claimed, &p) {
                    assert!(!claimed.is_claimed(i));
                    let c = buf.as_slice()[i].pos;
                    let d = c.dist_sq(body);
                    assert!(d > p.min_separation.powi(2) && d <= p.reach.powi(2));
                    assert!(angle_diff(body.angle_to(c), angle) <= p.cone_half_angle);
                }
            }
        }
    }
}
