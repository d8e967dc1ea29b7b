use spiderweb::config::SpiderConfig;
use spiderweb::gait::GaitPhase;
use spiderweb::geom::Point;
use spiderweb::leg::LEG_COUNT;
use spiderweb::sim::{FrameInput, Simulation};
use spiderweb::ticker::{ManualClock, Ticker};
use std::time::Duration;

const DT: f32 = 1.0 / 60.0;

fn assert_footholds_unique(sim: &Simulation) {
    let mut keys: Vec<_> = sim.legs().iter().filter_map(|l| l.target).map(|fh| fh.key).collect();
    let n = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), n, "frame {}: two legs share a foothold", sim.frame());
}

/// Pointer path visiting the four quadrants of an 800×600 surface.
fn tour(frame: usize) -> Point {
    match (frame / 90) % 4 {
        0 => Point::new(200.0, 150.0),
        1 => Point::new(600.0, 150.0),
        2 => Point::new(600.0, 450.0),
        _ => Point::new(200.0, 450.0),
    }
}

#[test]
fn touring_the_surface_keeps_every_invariant() {
    let mut sim = Simulation::new(SpiderConfig::default(), 800.0, 600.0).unwrap();
    let reach = sim.config().leg_reach;
    for frame in 0..720 {
        let report = sim.step(&FrameInput { pointer: tour(frame) }, DT);
        assert_footholds_unique(&sim);
        for leg in report.stepped.iter() {
            assert!(report.scheduled.contains(leg));
            let fh = sim.legs()[leg].target.unwrap();
            assert!(fh.pos.dist(sim.body()) <= reach + 1e-3);
        }
        for leg in sim.legs() {
            assert!(!(leg.planted && leg.stepping));
            assert!((0.0..=1.0).contains(&leg.step_progress));
        }
        // A leg that just lifted still lights its old foothold for this frame.
        assert!(sim.active().len() >= sim.planted_count() + sim.stepping_count());
    }
}

#[test]
fn spider_settles_on_the_pointer() {
    let mut sim = Simulation::new(SpiderConfig::default(), 800.0, 600.0).unwrap();
    let target = Point::new(520.0, 380.0);
    for _ in 0..600 {
        sim.step(&FrameInput { pointer: target }, DT);
    }
    assert!(sim.body().dist(target) < 0.5);
    assert_eq!(sim.planted_count(), LEG_COUNT);
    assert_eq!(sim.stepping_count(), 0);
}

#[test]
fn teleport_walks_the_legs_to_the_new_spot() {
    let mut sim = Simulation::new(SpiderConfig::default(), 800.0, 600.0).unwrap();
    for _ in 0..60 {
        sim.step(&FrameInput { pointer: sim.pointer() }, DT);
    }
    let to = Point::new(120.0, 120.0);
    sim.place(to);
    assert_eq!(sim.body(), to);

    let report = sim.step(&FrameInput { pointer: to }, DT);
    // Only one tripod group moves per frame.
    let a = [0, 2, 5, 7];
    let moved: Vec<_> = report.scheduled.iter().collect();
    assert!(
        moved.iter().all(|l| a.contains(l)) || moved.iter().all(|l| !a.contains(l)),
        "mixed groups stepped: {moved:?}"
    );

    for _ in 0..120 {
        sim.step(&FrameInput { pointer: to }, DT);
        assert_footholds_unique(&sim);
    }
    let far = sim.config().step_far();
    for leg in sim.legs() {
        assert!(leg.current.dist(to) <= far + 1e-3);
    }
}

#[test]
fn ticker_driven_runs_are_deterministic() {
    fn trajectory() -> Vec<(Point, GaitPhase)> {
        let clock = ManualClock::new();
        let mut ticker = Ticker::new(&clock, 60);
        let mut sim = Simulation::new(SpiderConfig::default(), 640.0, 480.0).unwrap();
        let mut out = Vec::new();
        // Uneven frame pacing, including a stall the ticker must clamp.
        let gaps = [16u64, 17, 16, 33, 16, 500, 16, 17];
        for i in 0..240 {
            if let Some(tick) = ticker.poll() {
                let pointer = if tick.index < 120 {
                    Point::new(500.0, 100.0)
                } else {
                    Point::new(100.0, 400.0)
                };
                let report = sim.step(&FrameInput { pointer }, tick.dt);
                out.push((sim.body(), report.phase));
            }
            clock.advance(Duration::from_millis(gaps[i % gaps.len()]));
        }
        out
    }

    let a = trajectory();
    let b = trajectory();
    assert!(a.len() > 60);
    assert_eq!(a, b);
}

#[test]
fn shrinking_to_nothing_and_back_recovers() {
    let mut sim = Simulation::new(SpiderConfig::default(), 800.0, 600.0).unwrap();
    for _ in 0..30 {
        sim.step(&FrameInput { pointer: sim.pointer() }, DT);
    }
    sim.resize(0.0, 0.0);
    let report = sim.step(&FrameInput { pointer: sim.pointer() }, DT);
    assert!(report.stepped.is_empty());

    sim.resize(400.0, 300.0);
    assert_eq!(sim.pointer(), Point::new(200.0, 150.0));
    for _ in 0..240 {
        sim.step(&FrameInput { pointer: sim.pointer() }, DT);
        assert_footholds_unique(&sim);
    }
    assert_eq!(sim.planted_count(), LEG_COUNT);
}
