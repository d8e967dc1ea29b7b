use crate::canvas::{DrawCmd, DrawList, Paint, Pixel, RadialGradient};
use crate::config::{Palette, SpiderConfig};
use crate::geom::Point;
use crate::sim::Simulation;
use std::f32::consts::PI;

const SHADOW: Pixel = Pixel::rgb(0, 0, 0);
const WHITE: Pixel = Pixel::rgb(255, 255, 255);
const ABDOMEN_SHEEN: Pixel = Pixel::rgb(60, 60, 60);
const HOURGLASS: f32 = 5.0;
const GLOW_RADIUS: f32 = 40.0;
const SILK_SEGMENTS: usize = 8;

/// Fill `out` with this frame, back to front. `time` is wall-clock seconds
/// and only drives the pulse and arc flicker.
pub fn build_frame(sim: &Simulation, time: f64, out: &mut DrawList) {
    out.clear();
    out.push(DrawCmd::BlitLattice);
    pulled_dots(sim, out);
    grabbed_dots(sim, time, out);
    arcs(sim, time, out);
    silk(sim, out);
    legs(sim, out);
    body(sim.config(), sim.body(), sim.heading(), out);
}

/// Lattice dots near a foot lean toward it.
fn pulled_dots(sim: &Simulation, out: &mut DrawList) {
    let cfg = sim.config();
    let pal = &cfg.palette;
    let lattice = sim.lattice();
    let active = sim.active();
    let pull_sq = cfg.pull_radius * cfg.pull_radius;

    for (_, foot) in sim.feet() {
        lattice.visit_range(foot, cfg.pull_radius + lattice.spacing, |fh| {
            if active.contains(&fh.key) {
                return;
            }
            let d_sq = fh.pos.dist_sq(foot);
            if d_sq <= 1.0 || d_sq >= pull_sq {
                return;
            }
            let d = d_sq.sqrt();
            let t = 1.0 - d / cfg.pull_radius;
            let pull = t * t * cfg.pull_strength;
            let p = fh.pos + (foot - fh.pos) * (pull / d);
            let size = 2.0 + t * 2.0;

            out.erase(fh.pos, 3.0);
            out.circle(p.offset(0.8, 0.8), size, pal.neu_shadow);
            out.circle(p.offset(-0.4, -0.4), size - 0.5, pal.neu_light);
            out.circle(p, size - 1.0, pal.red_bright.alpha(0.2 + t * 0.4));
        });
    }
}

fn grabbed_dots(sim: &Simulation, time: f64, out: &mut DrawList) {
    let pal = &sim.config().palette;
    let spacing = sim.lattice().spacing;
    let pulse = (0.5 + 0.5 * (time * 5.0).sin()) as f32;

    for key in sim.active() {
        let a = key.to_point(spacing);
        out.erase(a, 3.0);
        out.circle(a.offset(1.0, 1.0), 6.0, pal.neu_shadow);
        out.circle(a.offset(-0.5, -0.5), 5.0, pal.neu_light);
        out.circle(a, 3.5 + pulse, pal.red.alpha(0.25 + pulse * 0.15));
        out.circle(a, 2.5, pal.red_bright);
    }
}

/// Short flickering sparks from each foot to free candidates close by.
fn arcs(sim: &Simulation, time: f64, out: &mut DrawList) {
    let cfg = sim.config();
    let arc_sq = cfg.arc_radius * cfg.arc_radius;
    let active = sim.active();

    for (_, foot) in sim.feet() {
        let mut drawn = 0;
        for fh in sim.candidates().as_slice() {
            if drawn >= cfg.max_arcs_per_foot {
                break;
            }
            let d_sq = fh.pos.dist_sq(foot);
            if d_sq >= arc_sq || d_sq <= 16.0 || active.contains(&fh.key) {
                continue;
            }
            let d = d_sq.sqrt();
            let t = 1.0 - d / cfg.arc_radius;
            let flicker = 0.4 + 0.6 * (time * 8.0 + d as f64).sin().abs() as f32;
            let swing = time * 5.0 + d as f64;
            let wobble = 5.0 * t;
            let ctrl = foot
                .lerp(fh.pos, 0.5)
                .offset(swing.sin() as f32 * wobble, swing.cos() as f32 * wobble);
            out.quad(
                foot,
                ctrl,
                fh.pos,
                0.5 + t * 0.5,
                cfg.palette.red.alpha(t * 0.2 * flicker),
            );
            drawn += 1;
        }
    }
}

/// Thread from the top edge down to the body, fading as it goes.
fn silk(sim: &Simulation, out: &mut DrawList) {
    let body = sim.body();
    if body.y <= 0.0 {
        return;
    }
    let silk = sim.config().palette.silk;
    let top = Point::new(body.x, 0.0);
    for i in 0..SILK_SEGMENTS {
        let t0 = i as f32 / SILK_SEGMENTS as f32;
        let t1 = (i + 1) as f32 / SILK_SEGMENTS as f32;
        let alpha = 0.6 + (0.05 - 0.6) * (t0 + t1) * 0.5;
        out.line(top.lerp(body, t0), top.lerp(body, t1), 1.0, silk.alpha(alpha));
    }
}

fn legs(sim: &Simulation, out: &mut DrawList) {
    let cfg = sim.config();
    let pal = &cfg.palette;
    let body = sim.body();
    let min_sq = cfg.foot_threshold().powi(2);

    for (i, leg) in sim.legs().iter().enumerate() {
        let foot = leg.current;
        let d_sq = foot.dist_sq(body);
        if d_sq < min_sq || d_sq < 1.0 {
            continue;
        }
        let knee = knee_position(body, foot, cfg.side_of(i));

        segment(out, pal, body, knee, [3.0, 2.2, 0.7], [0.4, 0.4]);
        segment(out, pal, knee, foot, [2.2, 1.5, 0.5], [0.35, 0.3]);

        out.circle(knee.offset(0.5, 0.5), 2.8, SHADOW.alpha(0.5));
        out.circle(knee, 2.2, pal.sheen);
        let tip = if leg.planted { pal.red } else { pal.sheen };
        out.circle(foot, 1.2, tip);
    }
}

/// Knee sits 38% of the way out, pushed sideways by 45% of the leg length.
pub fn knee_position(body: Point, foot: Point, side: f32) -> Point {
    let d = foot - body;
    let len = body.dist(foot);
    if len <= f32::EPSILON {
        return body;
    }
    let perp = Point::new(-d.y / len, d.x / len);
    body + d * 0.38 + perp * (len * 0.45 * side)
}

/// One limb segment as shadow, main stroke and highlight.
/// `widths` is shadow/main/highlight, `k` is shadow alpha and highlight offset.
fn segment(out: &mut DrawList, pal: &Palette, a: Point, b: Point, widths: [f32; 3], k: [f32; 2]) {
    let [shadow_alpha, hi] = k;
    out.line(a.offset(1.0, 1.0), b.offset(1.0, 1.0), widths[0], SHADOW.alpha(shadow_alpha));
    out.line(a, b, widths[1], pal.leg);
    out.line(a.offset(-hi, -hi), b.offset(-hi, -hi), widths[2], pal.leg_highlight);
}

fn body(cfg: &SpiderConfig, at: Point, heading: f32, out: &mut DrawList) {
    let pal = &cfg.palette;
    let (sin, cos) = heading.sin_cos();
    let dir = Point::new(cos, sin);
    let br = cfg.body_radius;

    // Abdomen, trailing behind.
    let abd = Point::new(
        at.x - cos * (br + cfg.abdomen_rx - 4.0),
        at.y - sin * (br + cfg.abdomen_ry - 4.0),
    );
    let back = heading + PI;
    out.ellipse(
        abd.offset(2.0, 2.0),
        cfg.abdomen_rx + 2.0,
        cfg.abdomen_ry + 1.0,
        back,
        SHADOW.alpha(0.5),
    );
    out.ellipse(
        abd,
        cfg.abdomen_rx,
        cfg.abdomen_ry,
        back,
        glossy(abd.offset(-3.0, -3.0), 1.0, abd, cfg.abdomen_rx, 0.3, pal),
    );

    // Hourglass.
    let glow = HOURGLASS + 3.0;
    out.circle(
        abd,
        glow,
        Paint::Radial(RadialGradient::two(
            abd,
            0.0,
            abd,
            glow,
            pal.red_bright.alpha(0.3),
            pal.red_bright.alpha(0.0),
        )),
    );
    let hg_dir = Point::new(back.cos(), back.sin());
    let hg_perp = Point::new(-back.sin(), back.cos());
    for s in [1.0, -1.0] {
        let reach = hg_dir * (HOURGLASS * s);
        let spread = hg_perp * (HOURGLASS * 0.6);
        out.triangle([abd, abd + reach + spread, abd + reach - spread], pal.red);
    }
    out.ellipse(
        Point::new(
            abd.x - back.cos() * 3.0 - sin * 3.0,
            abd.y - back.sin() * 3.0 + cos * 3.0,
        ),
        cfg.abdomen_rx * 0.45,
        cfg.abdomen_ry * 0.3,
        back,
        ABDOMEN_SHEEN.alpha(0.35),
    );

    // Cephalothorax.
    out.circle(at.offset(1.5, 1.5), br + 1.0, SHADOW.alpha(0.5));
    out.circle(at, br, glossy(at.offset(-2.0, -2.0), 1.0, at, br, 0.4, pal));

    // Head.
    let hr = cfg.head_radius;
    let head = at + dir * (br + hr - 3.0);
    out.circle(head.offset(1.0, 1.0), hr + 0.5, SHADOW.alpha(0.45));
    out.circle(head, hr, glossy(head.offset(-1.0, -1.0), 0.0, head, hr, 0.5, pal));

    // Eyes and fangs.
    let eye_perp = Point::new(-sin, cos) * 2.5;
    let forward = hr * 0.25;
    for s in [-1.0, 1.0] {
        let e = head + dir * forward + eye_perp * s;
        out.circle(e, cfg.eye_radius + 1.5, pal.red.alpha(0.25));
        out.circle(e, cfg.eye_radius, pal.red_bright);
        out.circle(e.offset(-0.4, -0.4), 0.6, WHITE);
    }
    for s in [-1.0, 1.0] {
        let e = head + dir * (forward + 1.5) + eye_perp * (s * 0.5);
        out.circle(e, 1.2, pal.red);
    }
    for s in [-1.0, 1.0] {
        let base = head + dir * hr;
        let tip = base + dir * 4.0 + eye_perp * (s * 0.4);
        out.line(base, tip, 1.2, pal.sheen);
        out.circle(tip, 0.8, pal.red);
    }

    out.circle(
        at,
        GLOW_RADIUS,
        Paint::Radial(RadialGradient::two(
            at,
            0.0,
            at,
            GLOW_RADIUS,
            pal.red.alpha(0.04),
            pal.red.alpha(0.0),
        )),
    );
}

/// Sheen → gloss → black, with the sheen focus offset toward the light.
fn glossy(focus: Point, r0: f32, centre: Point, r1: f32, mid: f32, pal: &Palette) -> Paint {
    Paint::Radial(RadialGradient::three(
        focus,
        r0,
        centre,
        r1,
        [(0.0, pal.sheen), (mid, pal.gloss), (1.0, pal.black)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{PixelCanvas, Rasterizer};
    use crate::geom::GridKey;
    use crate::sim::FrameInput;

    fn settled() -> Simulation {
        let mut sim = Simulation::new(SpiderConfig::default(), 800.0, 600.0).unwrap();
        let input = FrameInput {
            pointer: sim.pointer(),
        };
        for _ in 0..30 {
            sim.step(&input, 1.0 / 60.0);
        }
        sim
    }

    fn count(list: &DrawList, f: impl Fn(&DrawCmd) -> bool) -> usize {
        list.cmds().iter().filter(|c| f(c)).count()
    }

    #[test]
    fn lattice_blit_comes_first() {
        let mut list = DrawList::new();
        build_frame(&settled(), 0.0, &mut list);
        assert_eq!(list.cmds()[0], DrawCmd::BlitLattice);
    }

    #[test]
    fn tucked_legs_are_not_drawn() {
        let sim = Simulation::new(SpiderConfig::default(), 800.0, 600.0).unwrap();
        let mut list = DrawList::new();
        build_frame(&sim, 0.0, &mut list);
        let leg = sim.config().palette.leg;
        assert_eq!(
            count(&list, |c| matches!(c, DrawCmd::StrokeLine { color, .. } if *color == leg)),
            0
        );
        assert_eq!(count(&list, |c| matches!(c, DrawCmd::StrokeQuad { .. })), 0);
    }

    #[test]
    fn settled_walker_draws_eight_legs_and_grabbed_dots() {
        let sim = settled();
        let mut list = DrawList::new();
        build_frame(&sim, 1.25, &mut list);
        let leg = sim.config().palette.leg;
        // Femur and tibia main strokes.
        assert_eq!(
            count(&list, |c| matches!(c, DrawCmd::StrokeLine { color, .. } if *color == leg)),
            16
        );
        let bright = sim.config().palette.red_bright;
        let grabbed = count(&list, |c| {
            matches!(c, DrawCmd::FillCircle { radius, paint: Paint::Solid(p), .. }
                if *radius == 2.5 && *p == bright)
        });
        assert_eq!(grabbed, sim.active().len());
        let feet = sim.feet().count();
        assert!(count(&list, |c| matches!(c, DrawCmd::StrokeQuad { .. })) <= 3 * feet);
    }

    /// Original grid position and centre of every displaced red core. A pulled
    /// dot is an erase followed by shadow, light and a translucent core.
    fn pulled(list: &DrawList, core: Pixel) -> Vec<(Point, Point, f32)> {
        let cmds = list.cmds();
        let mut out = Vec::new();
        for (i, cmd) in cmds.iter().enumerate() {
            let DrawCmd::ClearRect { min, max } = *cmd else {
                continue;
            };
            let Some(&DrawCmd::FillCircle {
                center,
                radius,
                paint: Paint::Solid(p),
            }) = cmds.get(i + 3)
            else {
                continue;
            };
            if (p.r, p.g, p.b) == (core.r, core.g, core.b) && p.a < 255 {
                out.push((min.lerp(max, 0.5), center, radius));
            }
        }
        out
    }

    #[test]
    fn magnetic_effects_follow_the_feet_mid_walk() {
        let mut sim = settled();
        let cfg = sim.config().clone();
        let spacing = sim.lattice().spacing;
        let input = FrameInput {
            pointer: Point::new(700.0, 300.0),
        };
        let mut list = DrawList::new();
        let (mut arcs_seen, mut pulls_seen) = (0, 0);

        for frame in 0..300 {
            sim.step(&input, 1.0 / 60.0);
            build_frame(&sim, frame as f64 / 60.0, &mut list);
            let feet: Vec<Point> = sim.feet().map(|(_, p)| p).collect();
            let active = sim.active();

            let mut per_foot = vec![0; feet.len()];
            for cmd in list.cmds() {
                let DrawCmd::StrokeQuad { from, to, .. } = *cmd else {
                    continue;
                };
                let Some(foot) = feet.iter().position(|&f| f == from) else {
                    panic!("arc at frame {frame} does not start at a foot");
                };
                per_foot[foot] += 1;
                let d = from.dist(to);
                assert!(d > 4.0 && d < cfg.arc_radius, "arc length {d}");
                let key = GridKey::new(
                    (to.x / spacing).round() as i32,
                    (to.y / spacing).round() as i32,
                );
                assert_eq!(key.to_point(spacing), to);
                assert!(!active.contains(&key), "arc to a grabbed dot");
                arcs_seen += 1;
            }
            assert!(per_foot.iter().all(|&n| n <= cfg.max_arcs_per_foot));

            for (orig, center, radius) in pulled(&list, cfg.palette.red_bright) {
                let key = GridKey::new(
                    (orig.x / spacing).round() as i32,
                    (orig.y / spacing).round() as i32,
                );
                assert!(key.to_point(spacing).dist(orig) < 1e-3);
                assert!(!active.contains(&key), "grabbed dot was pulled");
                let explained = feet.iter().any(|&foot| {
                    let d = orig.dist(foot);
                    if d >= cfg.pull_radius || d <= 1.0 {
                        return false;
                    }
                    let t = 1.0 - d / cfg.pull_radius;
                    let expected = orig.lerp(foot, t * t * cfg.pull_strength / d);
                    expected.dist(center) < 1e-3 && (radius - (1.0 + 2.0 * t)).abs() < 1e-4
                });
                assert!(explained, "pulled dot at {center:?} matches no foot");
                pulls_seen += 1;
            }
        }
        assert!(arcs_seen > 0);
        assert!(pulls_seen > 0);
    }

    #[test]
    fn same_state_and_time_give_same_commands() {
        let sim = settled();
        let mut a = DrawList::new();
        let mut b = DrawList::new();
        build_frame(&sim, 3.5, &mut a);
        build_frame(&sim, 3.5, &mut b);
        assert_eq!(a.cmds(), b.cmds());
        build_frame(&sim, 3.5, &mut a);
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn knee_bends_to_the_leg_side() {
        let body = Point::new(0.0, 0.0);
        let foot = Point::new(100.0, 0.0);
        let left = knee_position(body, foot, -1.0);
        let right = knee_position(body, foot, 1.0);
        assert!((left.x - 38.0).abs() < 1e-4 && (left.y + 45.0).abs() < 1e-4);
        assert!((right.y - 45.0).abs() < 1e-4);
        assert_eq!(knee_position(body, body, 1.0), body);
    }

    #[test]
    fn rasterized_frame_inks_the_body() {
        let sim = settled();
        let mut list = DrawList::new();
        build_frame(&sim, 0.0, &mut list);
        let mut canvas = PixelCanvas::new(400, 300);
        let drawn = Rasterizer::new(&mut canvas, 0.5).execute(&list, None);
        assert!(!drawn);
        let b = sim.body();
        let px = canvas.get((b.x * 0.5) as u32, (b.y * 0.5) as u32).unwrap();
        assert!(px.a >= 32);
    }
}
