use crate::geom::Point;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;

const MAX_EVENTS_PER_FRAME: usize = 64;
/// Wander speed in world units per second.
const WANDER_SPEED: f32 = 90.0;
/// A waypoint this close counts as reached.
const WAYPOINT_REACHED: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    TogglePause,
    ToggleHud,
    ToggleWander,
    Teleport,
    ZoomIn,
    ZoomOut,
    Pointer { col: u16, row: u16 },
    Resize { cols: u16, rows: u16 },
}

/// Wait up to `timeout` for the first event, then drain whatever else is queued.
pub fn collect_input_nonblocking(timeout: Duration) -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();
    if !event::poll(timeout)? {
        return Ok(out);
    }
    loop {
        out.push(event::read()?);
        if out.len() >= MAX_EVENTS_PER_FRAME || !event::poll(Duration::ZERO)? {
            break;
        }
    }
    Ok(out)
}

pub fn map_event(ev: &Event) -> Option<Action> {
    match ev {
        Event::Key(k) => map_key(k),
        Event::Mouse(m) => map_mouse(m),
        Event::Resize(cols, rows) => Some(Action::Resize {
            cols: *cols,
            rows: *rows,
        }),
        _ => None,
    }
}

fn map_key(k: &KeyEvent) -> Option<Action> {
    if k.kind == KeyEventKind::Release {
        return None;
    }
    if k.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C')).then_some(Action::Quit);
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePause),
        KeyCode::Char('h') | KeyCode::Char('H') => Some(Action::ToggleHud),
        KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::ToggleWander),
        KeyCode::Char('t') | KeyCode::Char('T') => Some(Action::Teleport),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::ZoomIn),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(Action::ZoomOut),
        _ => None,
    }
}

fn map_mouse(m: &MouseEvent) -> Option<Action> {
    match m.kind {
        MouseEventKind::Moved | MouseEventKind::Down(_) | MouseEventKind::Drag(_) => {
            Some(Action::Pointer {
                col: m.column,
                row: m.row,
            })
        }
        _ => None,
    }
}

/// Autopilot pointer drifting between random waypoints.
pub struct Wander {
    rng: StdRng,
    waypoint: Option<Point>,
}

impl Wander {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            waypoint: None,
        }
    }

    /// Uniform point inside `size`, kept `margin` away from the edges when it fits.
    pub fn random_point(&mut self, size: Point, margin: f32) -> Point {
        let pick = |rng: &mut StdRng, extent: f32| {
            if extent <= 0.0 {
                0.0
            } else if extent > 2.0 * margin {
                rng.gen_range(margin..extent - margin)
            } else {
                rng.gen_range(0.0..extent)
            }
        };
        let x = pick(&mut self.rng, size.x);
        let y = pick(&mut self.rng, size.y);
        Point::new(x, y)
    }

    pub fn advance(&mut self, from: Point, size: Point, margin: f32, dt: f32) -> Point {
        let waypoint = match self.waypoint {
            Some(w) if w.dist(from) > WAYPOINT_REACHED && w.x <= size.x && w.y <= size.y => w,
            _ => {
                let w = self.random_point(size, margin);
                self.waypoint = Some(w);
                w
            }
        };
        let d = waypoint.dist(from);
        let step = WANDER_SPEED * dt.max(0.0);
        if d <= step || d <= f32::EPSILON {
            waypoint
        } else {
            from.lerp(waypoint, step / d)
        }
    }

    pub fn waypoint(&self) -> Option<Point> {
        self.waypoint
    }
}
