use crossterm::style::Color;
use spiderweb::canvas::{DrawList, Pixel, PixelCanvas, Rasterizer};
use spiderweb::config::SpiderConfig;
use spiderweb::draw::build_frame;
use spiderweb::lattice::LatticeCache;
use spiderweb::sim::{FrameInput, Simulation};
use spiderweb::term::{canvas_to_cells, CellBuffer, CELL_PX_H, CELL_PX_W};

const COLS: u16 = 100;
const ROWS: u16 = 40;
const SCALE: f32 = 1.0;
const BLANK: char = '\u{2800}';

struct Frame {
    canvas: PixelCanvas,
    cells: CellBuffer,
    blitted: bool,
}

/// Headless equivalent of one app frame.
fn render(sim: &Simulation, cache: &mut LatticeCache, enable_color: bool) -> Frame {
    let mut canvas = PixelCanvas::new(COLS as u32 * CELL_PX_W, ROWS as u32 * CELL_PX_H);
    cache.ensure(canvas.w, canvas.h, SCALE, sim.lattice(), &sim.config().palette);
    let mut list = DrawList::new();
    build_frame(sim, 1.25, &mut list);
    canvas.clear(Pixel::TRANSPARENT);
    let blitted = Rasterizer::new(&mut canvas, SCALE).execute(&list, cache.bitmap());
    let mut cells = CellBuffer::new(COLS, ROWS);
    canvas_to_cells(&canvas, &mut cells, enable_color, sim.config().palette.background);
    Frame {
        canvas,
        cells,
        blitted,
    }
}

fn settled_sim() -> Simulation {
    let w = (COLS as u32 * CELL_PX_W) as f32 / SCALE;
    let h = (ROWS as u32 * CELL_PX_H) as f32 / SCALE;
    let mut sim = Simulation::new(SpiderConfig::default(), w, h).unwrap();
    for _ in 0..90 {
        sim.step(&FrameInput { pointer: sim.pointer() }, 1.0 / 60.0);
    }
    sim
}

fn inked(cells: &CellBuffer) -> usize {
    cells.cells.iter().filter(|c| c.ch != BLANK).count()
}

#[test]
fn spider_shows_up_as_braille_at_the_body() {
    let sim = settled_sim();
    let mut cache = LatticeCache::new();
    let frame = render(&sim, &mut cache, true);
    assert!(frame.blitted);

    let body = sim.body();
    let col = (body.x * SCALE) as u32 / CELL_PX_W;
    let row = (body.y * SCALE) as u32 / CELL_PX_H;
    let cell = frame.cells.get(col as u16, row as u16).unwrap();
    assert_ne!(cell.ch, BLANK);
    assert!(matches!(cell.fg, Color::Rgb { .. }));

    // Body, eight legs and the dot lattice cover far more than a handful of cells.
    assert!(inked(&frame.cells) > 60);
}

#[test]
fn monochrome_keeps_the_shape_and_drops_colour() {
    let sim = settled_sim();
    let mut cache = LatticeCache::new();
    let colour = render(&sim, &mut cache, true);
    let mono = render(&sim, &mut cache, false);

    for (c, m) in colour.cells.cells.iter().zip(&mono.cells.cells) {
        assert_eq!(c.ch, m.ch);
        assert_eq!(m.fg, Color::White);
        assert_eq!(m.bg, Color::Black);
    }
}

#[test]
fn rendering_is_a_pure_function_of_the_simulation() {
    let a = settled_sim();
    let b = settled_sim();
    let mut cache = LatticeCache::new();
    let fa = render(&a, &mut cache, true);
    let fb = render(&b, &mut cache, true);
    assert_eq!(fa.canvas.px, fb.canvas.px);
    assert_eq!(fa.cells.cells, fb.cells.cells);
}

#[test]
fn lattice_cache_rebuilds_only_when_the_surface_changes() {
    let sim = settled_sim();
    let pal = &sim.config().palette;
    let mut cache = LatticeCache::new();
    assert!(cache.ensure(200, 160, SCALE, sim.lattice(), pal));
    assert!(!cache.ensure(200, 160, SCALE, sim.lattice(), pal));
    assert!(cache.ensure(200, 160, 0.5, sim.lattice(), pal));
    assert!(cache.ensure(0, 160, 0.5, sim.lattice(), pal));
    assert!(cache.bitmap().is_none());

    // No bitmap: the frame still draws, the blit is reported as skipped.
    let mut canvas = PixelCanvas::new(200, 160);
    let mut list = DrawList::new();
    build_frame(&sim, 0.0, &mut list);
    assert!(!Rasterizer::new(&mut canvas, SCALE).execute(&list, cache.bitmap()));
    assert!(canvas.px.iter().any(|p| p.a > 0));
}
