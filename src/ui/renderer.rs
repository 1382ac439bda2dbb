/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The board is drawn with `y == 0` at the bottom. `BoardLayout` is the
/// single place that maps between grid cells and terminal cells, so the
/// mouse handler and the painter always agree.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use mergemode::domain::piece::{Pos, Tier};
use mergemode::sim::engine::MergeEngine;
use mergemode::sim::world::Phase;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never equal to a drawn cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Board geometry ──

/// Terminal columns / rows per grid cell.
const CELL_W: usize = 4;
const CELL_H: usize = 2;

const HUD_ROW: usize = 0;
const GOAL_ROW: usize = 1;
const BOARD_ROW: usize = 3;
const BOARD_COL: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct BoardLayout {
    pub col: usize,
    pub row: usize,
    pub width: usize,
    pub height: usize,
}

impl BoardLayout {
    pub fn for_grid(width: usize, height: usize) -> Self {
        BoardLayout { col: BOARD_COL, row: BOARD_ROW, width, height }
    }

    /// Grid cell under a terminal position, if any.
    pub fn cell_at(&self, col: u16, row: u16) -> Option<Pos> {
        let (col, row) = (col as usize, row as usize);
        if col < self.col || row < self.row {
            return None;
        }
        let gx = (col - self.col) / CELL_W;
        let vy = (row - self.row) / CELL_H;
        if gx >= self.width || vy >= self.height {
            return None;
        }
        Some(Pos::new(gx, self.height - 1 - vy))
    }

    /// Top-left terminal cell of a grid cell.
    pub fn origin_of(&self, pos: Pos) -> (usize, usize) {
        let vy = self.height - 1 - pos.y;
        (self.col + pos.x * CELL_W, self.row + vy * CELL_H)
    }

    pub fn bottom(&self) -> usize {
        self.row + self.height * CELL_H
    }
}

fn tier_color(tier: Tier) -> Color {
    const PALETTE: [Color; 11] = [
        Color::Rgb { r: 200, g: 200, b: 200 },
        Color::Rgb { r: 230, g: 170, b: 90 },
        Color::Rgb { r: 240, g: 120, b: 40 },
        Color::Rgb { r: 180, g: 150, b: 110 },
        Color::Rgb { r: 240, g: 220, b: 120 },
        Color::Rgb { r: 170, g: 170, b: 240 },
        Color::Rgb { r: 240, g: 150, b: 200 },
        Color::Rgb { r: 130, g: 90, b: 60 },
        Color::Rgb { r: 250, g: 190, b: 60 },
        Color::Rgb { r: 80, g: 220, b: 255 },
        Color::Rgb { r: 200, g: 90, b: 255 },
    ];
    PALETTE[(tier.max(1) as usize - 1) % PALETTE.len()]
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    layout: BoardLayout,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            layout: BoardLayout::default(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Board geometry of the last rendered frame.
    pub fn layout(&self) -> BoardLayout {
        self.layout
    }

    pub fn render(&mut self, engine: &MergeEngine, message: &str) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let phase = engine.phase();
        if self.last_phase != Some(phase) {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(phase);
        }

        let grid = engine.grid();
        self.layout = BoardLayout::for_grid(grid.width(), grid.height());

        self.front.clear();
        self.compose_hud(engine);
        self.compose_board(engine);
        self.compose_footer(message);

        match phase {
            Phase::LevelComplete(report) => {
                let lines = [
                    format!("Score   {}", report.raw_score),
                    format!("Moves   {}", report.actual_moves),
                    format!("Par     {}", report.optimal_moves),
                ];
                self.compose_box("LEVEL COMPLETE", &lines, "ENTER next   R retry", Color::Rgb { r: 80, g: 255, b: 80 });
            }
            Phase::GameOver => {
                let lines = [format!("Score   {}", engine.score())];
                self.compose_box("OUT OF MOVES", &lines, "R retry   Q quit", Color::Rgb { r: 255, g: 60, b: 60 });
            }
            _ if engine.is_paused() => {
                self.compose_box("PAUSED", &[], "F1/P resume   Q quit", Color::Rgb { r: 255, g: 220, b: 50 });
            }
            _ => {}
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, engine: &MergeEngine) {
        let bar = Color::Rgb { r: 20, g: 20, b: 60 };
        let moves = match engine.moves_remaining() {
            Some(left) => format!("Moves left:{left:<3}"),
            None => format!("Moves:{:<4}", engine.move_count()),
        };
        let hud = format!(
            " Level {:<2} {:<14} Score:{:<7} x{}  {}",
            engine.level_index() + 1,
            engine.level().name,
            engine.score(),
            engine.multiplier(),
            moves,
        );
        self.front.fill_row(HUD_ROW, bar);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, bar);

        let mut col = 1;
        for row in engine.goal_progress().iter().filter(|r| !r.is_move_limit) {
            let glyph = engine
                .catalog()
                .get(row.tier)
                .map(|e| e.glyph.as_str())
                .unwrap_or("??");
            let done = row.remaining == 0;
            let text = format!("{glyph} {}/{}{} ", row.current.min(row.target), row.target, if done { "✓" } else { "" });
            let fg = if done { Color::Rgb { r: 80, g: 255, b: 80 } } else { tier_color(row.tier) };
            self.front.put_str(col, GOAL_ROW, &text, fg, Color::Reset);
            col += text.chars().count() + 1;
        }
    }

    fn compose_board(&mut self, engine: &MergeEngine) {
        let grid = engine.grid();
        let layout = self.layout;
        let selected = engine.selection();
        let frame = Color::Rgb { r: 35, g: 35, b: 55 };
        let highlight = Color::Rgb { r: 70, g: 70, b: 120 };

        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let pos = Pos::new(x, y);
                let (col, row) = layout.origin_of(pos);
                let bg = if selected.contains(&pos) { highlight } else { frame };
                for dy in 0..CELL_H {
                    for dx in 0..CELL_W - 1 {
                        self.front.set(col + dx, row + dy, Cell::new(' ', Color::White, bg));
                    }
                }
                let Some(piece) = grid.get(pos) else { continue };
                let glyph = engine
                    .catalog()
                    .get(piece.tier)
                    .map(|e| e.glyph.as_str())
                    .unwrap_or("??");
                let fg = tier_color(piece.tier);
                self.front.put_str(col, row, glyph, fg, bg);
                self.front.put_str(col, row + 1, &format!("{:>2}", piece.tier), Color::DarkGrey, bg);
            }
        }
    }

    fn compose_footer(&mut self, message: &str) {
        let base = self.layout.bottom() + 1;
        if !message.is_empty() {
            let bar = Color::Rgb { r: 200, g: 180, b: 50 };
            self.front.fill_row(base, bar);
            self.front.put_str(1, base, message, Color::Black, bar);
        }
        let help = " Drag across matching pieces   F1/P:Pause  R:Retry  Q:Quit";
        self.front.put_str(0, base + 2, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_box(&mut self, title: &str, lines: &[String], keys: &str, accent: Color) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let box_w = 28;
        let box_h = lines.len() + 5;
        let board_w = self.layout.width * CELL_W;
        let board_h = self.layout.height * CELL_H;
        let x0 = self.layout.col + board_w.saturating_sub(box_w) / 2;
        let y0 = self.layout.row + board_h.saturating_sub(box_h) / 2;

        for y in y0..y0 + box_h {
            for x in x0..x0 + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, dim));
            }
        }
        self.front.put_str(x0 + (box_w.saturating_sub(title.len())) / 2, y0 + 1, title, accent, dim);
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x0 + 3, y0 + 3 + i, line, Color::White, dim);
        }
        self.front.put_str(x0 + 2, y0 + box_h - 1, keys, Color::Rgb { r: 100, g: 200, b: 255 }, dim);
    }
}
