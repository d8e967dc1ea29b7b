use crate::canvas::{Pixel, PixelCanvas};
use crate::geom::Point;
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Braille sub-dots per cell, horizontally and vertically.
pub const CELL_PX_W: u32 = 2;
pub const CELL_PX_H: u32 = 4;
/// Minimum alpha for a sub-dot to count as ink.
const INK_ALPHA: u8 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub struct CellBuffer {
    pub w: u16,
    pub h: u16,
    pub cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }

    pub fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell {
            ch: ' ',
            fg: Color::White,
            bg,
        });
    }
}

pub fn to_color(p: Pixel) -> Color {
    Color::Rgb {
        r: p.r,
        g: p.g,
        b: p.b,
    }
}

/// Full-screen braille surface. Dropping it restores the terminal.
pub struct Terminal {
    out: io::Stdout,
    pub cols: u16,
    pub rows: u16,
    prev: CellBuffer,
    pub cur: CellBuffer,
    pub canvas: PixelCanvas,
    active: bool,
}

impl Terminal {
    pub fn begin() -> Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode().context("enabling raw mode")?;
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )
        .context("entering alternate screen")?;

        let (cols, rows) = terminal::size().context("querying terminal size")?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            canvas: canvas_for(cols, rows),
            active: true,
        })
    }

    pub fn end(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Adopt a new size. Returns `false` if nothing changed.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<bool> {
        if cols == self.cols && rows == self.rows {
            return Ok(false);
        }
        self.cols = cols;
        self.rows = rows;
        self.prev = CellBuffer::new(cols, rows);
        self.cur = CellBuffer::new(cols, rows);
        self.canvas = canvas_for(cols, rows);
        // The diff baseline is gone; start from a blank screen.
        execute!(self.out, terminal::Clear(ClearType::All))?;
        Ok(true)
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    pub fn present(&mut self, diff_only: bool) -> Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.end();
    }
}

fn canvas_for(cols: u16, rows: u16) -> PixelCanvas {
    PixelCanvas::new(cols as u32 * CELL_PX_W, rows as u32 * CELL_PX_H)
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

pub fn braille_bit(dx: u32, dy: u32) -> u8 {
    // (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
    // (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Encode the canvas as braille cells. Ink colour is the average of the ink
/// sub-dots, each composited over `bg`.
pub fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, enable_color: bool, bg: Pixel) {
    let bg_color = to_color(bg);
    for cy in 0..out.h as u32 {
        for cx in 0..out.w as u32 {
            let px0 = cx * CELL_PX_W;
            let py0 = cy * CELL_PX_H;

            let mut mask: u8 = 0;
            let (mut sum_r, mut sum_g, mut sum_b) = (0u32, 0u32, 0u32);
            let mut ink_count: u32 = 0;

            for dy in 0..CELL_PX_H {
                for dx in 0..CELL_PX_W {
                    let Some(p) = canvas.get(px0 + dx, py0 + dy) else {
                        continue;
                    };
                    if p.a < INK_ALPHA {
                        continue;
                    }
                    mask |= braille_bit(dx, dy);
                    let c = p.over(bg);
                    sum_r += c.r as u32;
                    sum_g += c.g as u32;
                    sum_b += c.b as u32;
                    ink_count += 1;
                }
            }

            let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            let fg = if enable_color && ink_count > 0 {
                Color::Rgb {
                    r: (sum_r / ink_count) as u8,
                    g: (sum_g / ink_count) as u8,
                    b: (sum_b / ink_count) as u8,
                }
            } else {
                Color::White
            };
            let cell_bg = if enable_color { bg_color } else { Color::Black };

            out.set(
                cx as u16,
                cy as u16,
                Cell {
                    ch,
                    fg,
                    bg: cell_bg,
                },
            );
        }
    }
}

pub fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

pub fn cell_to_world(col: u16, row: u16, scale: f32) -> Point {
    let px = col as f32 * CELL_PX_W as f32 + CELL_PX_W as f32 / 2.0;
    let py = row as f32 * CELL_PX_H as f32 + CELL_PX_H as f32 / 2.0;
    Point::new(px / scale, py / scale)
}
