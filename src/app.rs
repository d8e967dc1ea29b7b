use crate::canvas::{DrawList, Pixel, Rasterizer};
use crate::config::{Settings, MAX_SCALE, MIN_SCALE};
use crate::draw::build_frame;
use crate::geom::Point;
use crate::input::{collect_input_nonblocking, map_event, Action, Wander};
use crate::lattice::LatticeCache;
use crate::sim::{FrameInput, Simulation, StepReport};
use crate::term::{canvas_to_cells, cell_to_world, draw_text, to_color, Terminal};
use crate::ticker::{FrameTick, SystemClock, Ticker};
use anyhow::Result;
use crossterm::style::Color;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How long to block on input while no frame is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(100);
const ZOOM_STEP: f32 = 1.25;
const HUD_FG: Color = Color::Rgb {
    r: 170,
    g: 170,
    b: 185,
};

#[derive(Debug, Default)]
struct FpsMeter {
    window_start: f64,
    frames: u32,
    fps: f32,
}

impl FpsMeter {
    fn frame(&mut self, time: f64) {
        self.frames += 1;
        let span = time - self.window_start;
        if span >= 0.5 {
            self.fps = (self.frames as f64 / span) as f32;
            self.frames = 0;
            self.window_start = time;
        }
    }
}

pub struct App {
    settings: Settings,
    term: Terminal,
    sim: Simulation,
    lattice: LatticeCache,
    frame: DrawList,
    ticker: Ticker<SystemClock>,
    wander: Wander,
    pointer: Point,
    pointer_seen: bool,
    paused: bool,
    should_quit: bool,
    fps: FpsMeter,
    report: StepReport,
}

impl App {
    fn init(settings: Settings) -> Result<Self> {
        let term = Terminal::begin()?;
        let size = world_size(&term, settings.scale);
        let sim = Simulation::new(settings.spider.clone(), size.x, size.y)?;
        let mut app = Self {
            pointer: sim.pointer(),
            sim,
            term,
            lattice: LatticeCache::new(),
            frame: DrawList::new(),
            ticker: Ticker::new(SystemClock::new(), settings.fps_cap),
            wander: Wander::new(settings.seed),
            pointer_seen: false,
            paused: false,
            should_quit: false,
            fps: FpsMeter::default(),
            report: StepReport::default(),
            settings,
        };
        app.rebuild_surface();
        Ok(app)
    }

    fn run(&mut self) -> Result<()> {
        while !self.should_quit {
            let timeout = self.ticker.until_next().unwrap_or(IDLE_POLL);
            for ev in collect_input_nonblocking(timeout)? {
                if let Some(action) = map_event(&ev) {
                    self.handle(action)?;
                }
                if self.should_quit {
                    break;
                }
            }
            if self.should_quit {
                break;
            }
            if let Some(tick) = self.ticker.poll() {
                self.render_frame(tick)?;
            }
        }
        Ok(())
    }

    fn handle(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::TogglePause => self.paused = !self.paused,
            Action::ToggleHud => self.settings.show_hud = !self.settings.show_hud,
            Action::ToggleWander => self.settings.wander = !self.settings.wander,
            Action::Teleport => {
                let size = self.surface();
                let to = self
                    .wander
                    .random_point(size, self.settings.spider.grid_spacing);
                debug!(x = to.x, y = to.y, "teleport");
                self.sim.place(to);
                self.pointer = to;
            }
            Action::ZoomIn => self.set_scale(self.settings.scale * ZOOM_STEP),
            Action::ZoomOut => self.set_scale(self.settings.scale / ZOOM_STEP),
            Action::Pointer { col, row } => {
                self.pointer = cell_to_world(col, row, self.settings.scale);
                self.pointer_seen = true;
            }
            Action::Resize { cols, rows } => {
                if self.term.resize(cols, rows)? {
                    debug!(cols, rows, "terminal resized");
                    self.rebuild_surface();
                }
            }
        }
        Ok(())
    }

    fn set_scale(&mut self, scale: f32) {
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        if scale == self.settings.scale {
            return;
        }
        self.settings.scale = scale;
        debug!(scale, "zoom");
        self.rebuild_surface();
    }

    fn surface(&self) -> Point {
        world_size(&self.term, self.settings.scale)
    }

    /// Re-derive everything that depends on the surface size. The loop is
    /// suspended while the terminal has no area.
    fn rebuild_surface(&mut self) {
        if self.term.is_empty() {
            debug!("surface has no area, suspending");
            self.ticker.suspend();
            self.lattice.invalidate();
            return;
        }
        let size = self.surface();
        self.sim.resize(size.x, size.y);
        self.pointer = self.sim.pointer();
        self.lattice.ensure(
            self.term.canvas.w,
            self.term.canvas.h,
            self.settings.scale,
            self.sim.lattice(),
            &self.settings.spider.palette,
        );
        if self.ticker.is_running() {
            self.ticker.restart();
        } else {
            debug!("surface restored, resuming");
            self.ticker.resume();
        }
    }

    fn render_frame(&mut self, tick: FrameTick) -> Result<()> {
        let palette = &self.settings.spider.palette;

        if self.settings.wander || !self.pointer_seen {
            let size = world_size(&self.term, self.settings.scale);
            self.pointer = self.wander.advance(
                self.pointer,
                size,
                self.settings.spider.grid_spacing,
                tick.dt,
            );
        }
        if !self.paused {
            self.report = self.sim.step(
                &FrameInput {
                    pointer: self.pointer,
                },
                tick.dt,
            );
        }

        self.lattice.ensure(
            self.term.canvas.w,
            self.term.canvas.h,
            self.settings.scale,
            self.sim.lattice(),
            palette,
        );
        build_frame(&self.sim, tick.time, &mut self.frame);

        self.term.canvas.clear(Pixel::TRANSPARENT);
        let blitted = Rasterizer::new(&mut self.term.canvas, self.settings.scale)
            .execute(&self.frame, self.lattice.bitmap());
        if !blitted {
            trace!(frame = tick.index, "no lattice bitmap, blit skipped");
        }

        canvas_to_cells(
            &self.term.canvas,
            &mut self.term.cur,
            self.settings.enable_color,
            palette.background,
        );

        self.fps.frame(tick.time);
        if self.settings.show_hud {
            self.draw_hud();
        }

        self.term.present(true)
    }

    fn draw_hud(&mut self) {
        let bg = if self.settings.enable_color {
            to_color(self.settings.spider.palette.background)
        } else {
            Color::Black
        };
        let status = format!(
            " spiderweb  fps:{:>5.1}  gait:{}  planted:{} stepping:{}  dots:{}  scale:{:.2}{}{}",
            self.fps.fps,
            self.report.phase.label(),
            self.sim.planted_count(),
            self.sim.stepping_count(),
            self.sim.candidates().len(),
            self.settings.scale,
            if self.paused { "  [paused]" } else { "" },
            if self.settings.wander || !self.pointer_seen {
                "  [wander]"
            } else {
                ""
            },
        );
        draw_text(&mut self.term.cur, 0, 0, &status, HUD_FG, bg);
        let help = " q quit  space pause  w wander  t teleport  +/- zoom  h hud";
        let last = self.term.rows.saturating_sub(1);
        if last > 0 {
            draw_text(&mut self.term.cur, 0, last, help, HUD_FG, bg);
        }
    }
}

fn world_size(term: &Terminal, scale: f32) -> Point {
    Point::new(term.canvas.w as f32 / scale, term.canvas.h as f32 / scale)
}

pub fn run(settings: Settings) -> Result<()> {
    info!(
        fps = settings.fps_cap,
        scale = settings.scale,
        wander = settings.wander,
        "starting"
    );
    let mut app = App::init(settings)?;
    let result = app.run();
    let restored = app.term.end();
    info!("stopped");
    finish(result, restored)
}

/// The loop error wins over a failed terminal restore, which is only logged.
fn finish(result: Result<()>, restored: Result<()>) -> Result<()> {
    match (result, restored) {
        (Err(err), Err(restore)) => {
            warn!(%restore, "terminal restore failed after loop error");
            Err(err)
        }
        (result, restored) => result.and(restored),
    }
}
