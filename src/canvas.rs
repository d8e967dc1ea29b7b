use crate::geom::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::rgb(0, 0, 0).with_alpha_u8(0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha_u8(self, a: u8) -> Self {
        Self {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }

    pub fn alpha(self, a: f32) -> Self {
        self.with_alpha_u8((a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8)
    }

    /// Scale the existing alpha by `k` (used for edge coverage).
    fn fade(self, k: f32) -> Self {
        self.with_alpha_u8((self.a as f32 * k.clamp(0.0, 1.0) + 0.5) as u8)
    }

    fn lerp(self, other: Pixel, t: f32) -> Pixel {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 { (a as f32 + (b as f32 - a as f32) * t + 0.5) as u8 };
        Pixel {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    pub fn over(self, bg: Pixel) -> Pixel {
        let sa = self.a as f32 / 255.0;
        let mix = |s: u8, d: u8| -> u8 { (s as f32 * sa + d as f32 * (1.0 - sa) + 0.5) as u8 };
        Pixel::rgb(mix(self.r, bg.r), mix(self.g, bg.g), mix(self.b, bg.b))
    }
}

/// RGBA raster. One pixel per braille sub-dot when shown on the terminal.
#[derive(Clone, Debug)]
pub struct PixelCanvas {
    pub w: u32,
    pub h: u32,
    pub px: Vec<Pixel>,
}

impl PixelCanvas {
    pub fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }

    pub fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        (x < self.w && y < self.h).then(|| self.px[self.idx(x, y)])
    }

    pub fn clear(&mut self, p: Pixel) {
        self.px.fill(p);
    }

    pub fn blend_over(&mut self, x: i32, y: i32, src: Pixel) {
        if x < 0 || y < 0 || src.a == 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }

    pub fn clear_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let x0 = x0.clamp(0, self.w as i32) as u32;
        let x1 = x1.clamp(0, self.w as i32) as u32;
        let y0 = y0.clamp(0, self.h as i32) as u32;
        let y1 = y1.clamp(0, self.h as i32) as u32;
        for y in y0..y1 {
            let row = self.idx(0, y);
            self.px[row + x0 as usize..row + x1 as usize].fill(Pixel::default());
        }
    }

    pub fn blit(&mut self, src: &PixelCanvas) {
        let w = self.w.min(src.w);
        let h = self.h.min(src.h);
        for y in 0..h {
            for x in 0..w {
                let p = src.px[src.idx(x, y)];
                if p.a == 0 {
                    continue;
                }
                let i = self.idx(x, y);
                if self.px[i].a == 0 {
                    self.px[i] = p;
                } else {
                    self.blend_over(x as i32, y as i32, p);
                }
            }
        }
    }
}

/* -----------------------------
   Paint + draw commands
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Pixel,
}

/// Two-circle radial gradient with up to three stops, as a 2D canvas defines it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialGradient {
    pub c0: Point,
    pub r0: f32,
    pub c1: Point,
    pub r1: f32,
    stops: [ColorStop; 3],
}

impl RadialGradient {
    pub fn two(c0: Point, r0: f32, c1: Point, r1: f32, from: Pixel, to: Pixel) -> Self {
        let first = ColorStop {
            offset: 0.0,
            color: from,
        };
        let last = ColorStop {
            offset: 1.0,
            color: to,
        };
        Self {
            c0,
            r0,
            c1,
            r1,
            stops: [first, last, last],
        }
    }

    pub fn three(
        c0: Point,
        r0: f32,
        c1: Point,
        r1: f32,
        stops: [(f32, Pixel); 3],
    ) -> Self {
        let s = stops.map(|(offset, color)| ColorStop { offset, color });
        Self {
            c0,
            r0,
            c1,
            r1,
            stops: s,
        }
    }

    /// Gradient parameter for `p`: the largest `s` whose interpolated circle
    /// passes through `p` with a non-negative radius.
    fn param(&self, p: Point) -> Option<f32> {
        let cd = self.c1 - self.c0;
        let pd = p - self.c0;
        let dr = self.r1 - self.r0;

        let a = cd.x * cd.x + cd.y * cd.y - dr * dr;
        let b = pd.x * cd.x + pd.y * cd.y + self.r0 * dr;
        let c = pd.x * pd.x + pd.y * pd.y - self.r0 * self.r0;

        let valid = |s: f32| self.r0 + s * dr >= 0.0;

        if a.abs() < 1e-6 {
            if b.abs() < 1e-6 {
                return None;
            }
            let s = c / (2.0 * b);
            return valid(s).then_some(s);
        }

        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let hi = (b + root) / a;
        let lo = (b - root) / a;
        let (first, second) = if hi >= lo { (hi, lo) } else { (lo, hi) };
        if valid(first) {
            Some(first)
        } else if valid(second) {
            Some(second)
        } else {
            None
        }
    }

    pub fn color_at(&self, p: Point) -> Pixel {
        let Some(s) = self.param(p) else {
            return Pixel::TRANSPARENT;
        };
        let t = s.clamp(0.0, 1.0);
        let stops = &self.stops;
        if t <= stops[0].offset {
            return stops[0].color;
        }
        for pair in stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.offset {
                let span = (hi.offset - lo.offset).max(1e-6);
                return lo.color.lerp(hi.color, (t - lo.offset) / span);
            }
        }
        stops[2].color
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint {
    Solid(Pixel),
    Radial(RadialGradient),
}

impl Paint {
    fn at(&self, p: Point) -> Pixel {
        match self {
            Paint::Solid(c) => *c,
            Paint::Radial(g) => g.color_at(p),
        }
    }
}

impl From<Pixel> for Paint {
    fn from(c: Pixel) -> Self {
        Paint::Solid(c)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawCmd {
    BlitLattice,
    ClearRect {
        min: Point,
        max: Point,
    },
    FillCircle {
        center: Point,
        radius: f32,
        paint: Paint,
    },
    FillEllipse {
        center: Point,
        rx: f32,
        ry: f32,
        rotation: f32,
        paint: Paint,
    },
    FillTriangle {
        points: [Point; 3],
        paint: Paint,
    },
    StrokeLine {
        from: Point,
        to: Point,
        width: f32,
        color: Pixel,
    },
    StrokeQuad {
        from: Point,
        ctrl: Point,
        to: Point,
        width: f32,
        color: Pixel,
    },
}

#[derive(Clone, Debug, Default)]
pub struct DrawList {
    cmds: Vec<DrawCmd>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    pub fn push(&mut self, cmd: DrawCmd) {
        self.cmds.push(cmd);
    }

    pub fn cmds(&self) -> &[DrawCmd] {
        &self.cmds
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn circle(&mut self, center: Point, radius: f32, paint: impl Into<Paint>) {
        self.push(DrawCmd::FillCircle {
            center,
            radius,
            paint: paint.into(),
        });
    }

    pub fn ellipse(
        &mut self,
        center: Point,
        rx: f32,
        ry: f32,
        rotation: f32,
        paint: impl Into<Paint>,
    ) {
        self.push(DrawCmd::FillEllipse {
            center,
            rx,
            ry,
            rotation,
            paint: paint.into(),
        });
    }

    pub fn triangle(&mut self, points: [Point; 3], paint: impl Into<Paint>) {
        self.push(DrawCmd::FillTriangle {
            points,
            paint: paint.into(),
        });
    }

    pub fn line(&mut self, from: Point, to: Point, width: f32, color: Pixel) {
        self.push(DrawCmd::StrokeLine {
            from,
            to,
            width,
            color,
        });
    }

    pub fn quad(&mut self, from: Point, ctrl: Point, to: Point, width: f32, color: Pixel) {
        self.push(DrawCmd::StrokeQuad {
            from,
            ctrl,
            to,
            width,
            color,
        });
    }

    pub fn erase(&mut self, center: Point, half: f32) {
        self.push(DrawCmd::ClearRect {
            min: center.offset(-half, -half),
            max: center.offset(half, half),
        });
    }
}

/* -----------------------------
   Rasterizer: world units -> pixels
------------------------------ */

const QUAD_SEGMENTS: usize = 12;

/// Executes draw commands onto a canvas, mapping world units to pixels by `scale`.
pub struct Rasterizer<'a> {
    canvas: &'a mut PixelCanvas,
    scale: f32,
}

impl<'a> Rasterizer<'a> {
    pub fn new(canvas: &'a mut PixelCanvas, scale: f32) -> Self {
        Self { canvas, scale }
    }

    #[inline]
    fn world(&self, x: i32, y: i32) -> Point {
        Point::new((x as f32 + 0.5) / self.scale, (y as f32 + 0.5) / self.scale)
    }

    fn pixel_bounds(&self, min: Point, max: Point) -> Option<(i32, i32, i32, i32)> {
        let x0 = ((min.x * self.scale).floor() as i32).max(0);
        let y0 = ((min.y * self.scale).floor() as i32).max(0);
        let x1 = ((max.x * self.scale).ceil() as i32).min(self.canvas.w as i32 - 1);
        let y1 = ((max.y * self.scale).ceil() as i32).min(self.canvas.h as i32 - 1);
        (x0 <= x1 && y0 <= y1).then_some((x0, y0, x1, y1))
    }

    /// Returns `false` when the lattice blit had to be skipped.
    pub fn execute(&mut self, list: &DrawList, lattice: Option<&PixelCanvas>) -> bool {
        let mut blitted = true;
        for cmd in list.cmds() {
            match *cmd {
                DrawCmd::BlitLattice => match lattice {
                    Some(bmp) => self.canvas.blit(bmp),
                    None => blitted = false,
                },
                DrawCmd::ClearRect { min, max } => {
                    self.canvas.clear_rect(
                        (min.x * self.scale).floor() as i32,
                        (min.y * self.scale).floor() as i32,
                        (max.x * self.scale).ceil() as i32,
                        (max.y * self.scale).ceil() as i32,
                    );
                }
                DrawCmd::FillCircle {
                    center,
                    radius,
                    paint,
                } => self.fill_circle(center, radius, &paint),
                DrawCmd::FillEllipse {
                    center,
                    rx,
                    ry,
                    rotation,
                    paint,
                } => self.fill_ellipse(center, rx, ry, rotation, &paint),
                DrawCmd::FillTriangle { points, paint } => self.fill_triangle(points, &paint),
                DrawCmd::StrokeLine {
                    from,
                    to,
                    width,
                    color,
                } => self.stroke_line(from, to, width, color),
                DrawCmd::StrokeQuad {
                    from,
                    ctrl,
                    to,
                    width,
                    color,
                } => self.stroke_quad(from, ctrl, to, width, color),
            }
        }
        blitted
    }

    pub fn fill_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        let reach = radius + 1.0 / self.scale;
        let Some((x0, y0, x1, y1)) =
            self.pixel_bounds(center.offset(-reach, -reach), center.offset(reach, reach))
        else {
            return;
        };
        let r_px = radius * self.scale;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = self.world(x, y);
                let d_px = p.dist(center) * self.scale;
                let coverage = (r_px - d_px + 0.5).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                self.canvas.blend_over(x, y, paint.at(p).fade(coverage));
            }
        }
    }

    pub fn fill_ellipse(&mut self, center: Point, rx: f32, ry: f32, rotation: f32, paint: &Paint) {
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        let reach = rx.max(ry) + 1.0 / self.scale;
        let Some((x0, y0, x1, y1)) =
            self.pixel_bounds(center.offset(-reach, -reach), center.offset(reach, reach))
        else {
            return;
        };
        let (sin, cos) = rotation.sin_cos();
        let edge_px = rx.min(ry) * self.scale;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = self.world(x, y);
                let d = p - center;
                let lx = d.x * cos + d.y * sin;
                let ly = -d.x * sin + d.y * cos;
                let k = ((lx / rx).powi(2) + (ly / ry).powi(2)).sqrt();
                let coverage = ((1.0 - k) * edge_px + 0.5).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                self.canvas.blend_over(x, y, paint.at(p).fade(coverage));
            }
        }
    }

    pub fn fill_triangle(&mut self, pts: [Point; 3], paint: &Paint) {
        let min = Point::new(
            pts[0].x.min(pts[1].x).min(pts[2].x),
            pts[0].y.min(pts[1].y).min(pts[2].y),
        );
        let max = Point::new(
            pts[0].x.max(pts[1].x).max(pts[2].x),
            pts[0].y.max(pts[1].y).max(pts[2].y),
        );
        let Some((x0, y0, x1, y1)) = self.pixel_bounds(min, max) else {
            return;
        };
        let edge = |a: Point, b: Point, p: Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = self.world(x, y);
                let e0 = edge(pts[0], pts[1], p);
                let e1 = edge(pts[1], pts[2], p);
                let e2 = edge(pts[2], pts[0], p);
                let inside = (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0)
                    || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0);
                if inside {
                    self.canvas.blend_over(x, y, paint.at(p));
                }
            }
        }
    }

    pub fn stroke_line(&mut self, from: Point, to: Point, width: f32, color: Pixel) {
        let pad = width * 0.5 + 1.0 / self.scale;
        let min = Point::new(from.x.min(to.x) - pad, from.y.min(to.y) - pad);
        let max = Point::new(from.x.max(to.x) + pad, from.y.max(to.y) + pad);
        let Some((x0, y0, x1, y1)) = self.pixel_bounds(min, max) else {
            return;
        };
        // Sub-pixel strokes still leave a one-pixel trail.
        let half_px = (width * self.scale * 0.5).max(0.5);
        let seg = to - from;
        let len_sq = seg.x * seg.x + seg.y * seg.y;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = self.world(x, y);
                let t = if len_sq > 0.0 {
                    (((p.x - from.x) * seg.x + (p.y - from.y) * seg.y) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let d_px = p.dist(from + seg * t) * self.scale;
                let coverage = (half_px - d_px + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.canvas.blend_over(x, y, color.fade(coverage));
                }
            }
        }
    }

    pub fn stroke_quad(&mut self, from: Point, ctrl: Point, to: Point, width: f32, color: Pixel) {
        let mut prev = from;
        for i in 1..=QUAD_SEGMENTS {
            let t = i as f32 / QUAD_SEGMENTS as f32;
            let a = from.lerp(ctrl, t);
            let b = ctrl.lerp(to, t);
            let next = a.lerp(b, t);
            self.stroke_line(prev, next, width, color);
            prev = next;
        }
    }
}
