use crate::canvas::{Paint, PixelCanvas, Rasterizer};
use crate::config::Palette;
use crate::geom::{GridKey, Point};
use tracing::debug;

const INITIAL_CANDIDATES: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Foothold {
    pub key: GridKey,
    pub pos: Point,
}

impl Foothold {
    pub fn new(key: GridKey, spacing: f32) -> Self {
        Self {
            key,
            pos: key.to_point(spacing),
        }
    }
}

/// The implicit grid `{(c·S, r·S)}` clipped to a surface of `width × height` world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lattice {
    pub spacing: f32,
    pub width: f32,
    pub height: f32,
}

impl Lattice {
    pub fn new(spacing: f32, width: f32, height: f32) -> Self {
        Self {
            spacing,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn max_col(&self) -> i32 {
        (self.width / self.spacing).floor() as i32
    }

    pub fn max_row(&self) -> i32 {
        (self.height / self.spacing).floor() as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn foothold(&self, key: GridKey) -> Foothold {
        Foothold::new(key, self.spacing)
    }

    /// Visit every grid point in the bounding box of radius `range` around
    /// `center`, columns outer and rows inner.
    pub fn visit_range(&self, center: Point, range: f32, mut f: impl FnMut(Foothold)) {
        if self.is_empty() {
            return;
        }
        let s = self.spacing;
        let c0 = ((center.x - range) / s).floor().max(0.0) as i32;
        let c1 = (((center.x + range) / s).ceil() as i32).min(self.max_col());
        let r0 = ((center.y - range) / s).floor().max(0.0) as i32;
        let r1 = (((center.y + range) / s).ceil() as i32).min(self.max_row());
        for col in c0..=c1 {
            for row in r0..=r1 {
                f(self.foothold(GridKey::new(col, row)));
            }
        }
    }

    /// Refill `out` with every grid point whose squared distance to `body`
    /// lies in `(exclusion², reach²]`.
    pub fn collect(&self, body: Point, reach: f32, exclusion: f32, out: &mut CandidateBuffer) {
        out.clear();
        let lo = exclusion * exclusion;
        let hi = reach * reach;
        self.visit_range(body, reach, |fh| {
            let d = fh.pos.dist_sq(body);
            if d > lo && d <= hi {
                out.push(fh);
            }
        });
    }
}

/// Scratch list of candidate footholds. Grows by doubling, never shrinks.
#[derive(Debug)]
pub struct CandidateBuffer {
    items: Vec<Foothold>,
}

impl Default for CandidateBuffer {
    fn default() -> Self {
        Self::with_capacity(INITIAL_CANDIDATES)
    }
}

impl CandidateBuffer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            items: Vec::with_capacity(cap.max(1)),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, fh: Foothold) {
        if self.items.len() == self.items.capacity() {
            let grow = self.items.capacity().max(1);
            self.items.reserve_exact(grow);
        }
        self.items.push(fh);
    }

    pub fn as_slice(&self) -> &[Foothold] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn position(&self, key: GridKey) -> Option<usize> {
        self.items.iter().position(|fh| fh.key == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CacheKey {
    w: u32,
    h: u32,
    scale: u32,
    spacing: u32,
}

#[derive(Debug, Default)]
pub struct LatticeCache {
    key: Option<CacheKey>,
    bitmap: Option<PixelCanvas>,
}

impl LatticeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild if the canvas size, scale or spacing changed. Returns whether
    /// a rebuild happened.
    pub fn ensure(
        &mut self,
        w: u32,
        h: u32,
        scale: f32,
        lattice: &Lattice,
        palette: &Palette,
    ) -> bool {
        let key = CacheKey {
            w,
            h,
            scale: scale.to_bits(),
            spacing: lattice.spacing.to_bits(),
        };
        if self.key == Some(key) {
            return false;
        }
        self.key = Some(key);
        if w == 0 || h == 0 || lattice.is_empty() {
            self.bitmap = None;
            debug!(w, h, "lattice cache cleared for empty surface");
            return true;
        }

        let mut bmp = PixelCanvas::new(w, h);
        {
            let mut ras = Rasterizer::new(&mut bmp, scale);
            let shadow = Paint::Solid(palette.dot_shadow);
            let highlight = Paint::Solid(palette.dot_highlight);
            let core = Paint::Solid(palette.dot_core);
            for col in 0..=lattice.max_col() {
                for row in 0..=lattice.max_row() {
                    let p = GridKey::new(col, row).to_point(lattice.spacing);
                    ras.fill_circle(p.offset(0.6, 0.6), 2.0, &shadow);
                    ras.fill_circle(p.offset(-0.3, -0.3), 1.8, &highlight);
                    ras.fill_circle(p, 1.5, &core);
                }
            }
        }
        debug!(
            w,
            h,
            scale,
            cols = lattice.max_col() + 1,
            rows = lattice.max_row() + 1,
            "lattice cache rebuilt"
        );
        self.bitmap = Some(bmp);
        true
    }

    pub fn bitmap(&self) -> Option<&PixelCanvas> {
        self.bitmap.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.bitmap = None;
    }
}
