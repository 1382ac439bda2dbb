//! Grid model: the single source of truth for cell occupancy.
//!
//! Cells are stored row-major, `cells[y * width + x]`, with `y == 0` at the
//! bottom. All writes go through `set()` / `take()` so every stored piece
//! keeps its recorded `pos` equal to its cell.
//!
//! Besides the bounds-checked accessors this module owns the two pure grid
//! algorithms the resolution pipeline needs:
//!   - `apply_gravity()`: per-column compaction toward `y == 0`
//!   - `has_adjacent_pair()`: 4-directional deadlock probe

use log::warn;

use super::piece::{Piece, PieceId, Pos, Tier};

/// A piece that moved during gravity compaction. Identity is preserved.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Relocation {
    pub id: PieceId,
    pub tier: Tier,
    pub from: Pos,
    pub to: Pos,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Option<Piece>>,
}

// ── Construction ──

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    /// Build a grid from tier rows, bottom row first: `rows[y][x]`.
    /// `0` marks an empty cell. Ids are assigned 1, 2, 3… in row-major order.
    /// Ragged rows are padded with empty cells to the longest row.
    pub fn from_rows(rows: &[&[Tier]]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut grid = Grid::new(width, height);
        let mut next_id: PieceId = 1;
        for (y, row) in rows.iter().enumerate() {
            for (x, &tier) in row.iter().enumerate() {
                if tier == 0 {
                    continue;
                }
                let pos = Pos::new(x, y);
                grid.set(pos, Some(Piece::new(next_id, tier, pos)));
                next_id += 1;
            }
        }
        grid
    }

    /// Uninitialised grid: zero-sized, accepts no pieces.
    pub fn empty() -> Self {
        Grid::new(0, 0)
    }
}

// ── Accessors ──

impl Grid {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        self.is_valid(pos.x, pos.y)
    }

    pub fn is_initialized(&self) -> bool {
        !self.cells.is_empty()
    }

    #[inline]
    fn index(&self, pos: Pos) -> Option<usize> {
        self.contains(pos).then(|| pos.y * self.width + pos.x)
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<&Piece> {
        self.index(pos).and_then(|i| self.cells[i].as_ref())
    }

    #[inline]
    pub fn tier_at(&self, pos: Pos) -> Option<Tier> {
        self.get(pos).map(|p| p.tier)
    }

    /// Place (or clear) a cell. The stored piece's `pos` is rewritten to
    /// match the cell. Out-of-bounds writes are dropped with a warning.
    pub fn set(&mut self, pos: Pos, piece: Option<Piece>) {
        match self.index(pos) {
            Some(i) => {
                self.cells[i] = piece.map(|mut p| {
                    p.pos = pos;
                    p
                });
            }
            None => warn!("grid: write outside {}x{} at {:?} ignored", self.width, self.height, pos),
        }
    }

    /// Remove and return the occupant of a cell.
    pub fn take(&mut self, pos: Pos) -> Option<Piece> {
        let i = self.index(pos)?;
        self.cells[i].take()
    }

    /// Remove every piece, returning them in row-major order.
    pub fn drain(&mut self) -> Vec<Piece> {
        self.cells.iter_mut().filter_map(Option::take).collect()
    }
}

// ── Queries ──

impl Grid {
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.cells.iter().flatten()
    }

    pub fn occupied_count(&self) -> usize {
        self.pieces().count()
    }

    pub fn count_tier(&self, tier: Tier) -> usize {
        self.pieces().filter(|p| p.tier == tier).count()
    }

    /// Empty cells, column by column from the bottom up.
    pub fn empty_cells(&self) -> Vec<Pos> {
        let mut out = Vec::new();
        for x in 0..self.width {
            for y in 0..self.height {
                let pos = Pos::new(x, y);
                if self.get(pos).is_none() {
                    out.push(pos);
                }
            }
        }
        out
    }

    pub fn max_id(&self) -> PieceId {
        self.pieces().map(|p| p.id).max().unwrap_or(0)
    }

    /// Does any pair of 4-adjacent cells share a tier?
    pub fn has_adjacent_pair(&self) -> bool {
        for y in 0..self.height {
            for x in 0..self.width {
                let Some(tier) = self.tier_at(Pos::new(x, y)) else { continue };
                // Right and up cover every orthogonal pair exactly once.
                if x + 1 < self.width && self.tier_at(Pos::new(x + 1, y)) == Some(tier) {
                    return true;
                }
                if y + 1 < self.height && self.tier_at(Pos::new(x, y + 1)) == Some(tier) {
                    return true;
                }
            }
        }
        false
    }

    /// No legal merge left anywhere on the board.
    pub fn is_deadlocked(&self) -> bool {
        !self.has_adjacent_pair()
    }
}

// ── Gravity ──

impl Grid {
    /// Compact every column toward `y == 0`, preserving relative order.
    /// Returns one `Relocation` per piece that moved.
    pub fn apply_gravity(&mut self) -> Vec<Relocation> {
        let mut moved = Vec::new();
        for x in 0..self.width {
            let mut gap = 0;
            for y in 0..self.height {
                let from = Pos::new(x, y);
                match self.take(from) {
                    None => gap += 1,
                    Some(piece) if gap > 0 => {
                        let to = Pos::new(x, y - gap);
                        moved.push(Relocation { id: piece.id, tier: piece.tier, from, to });
                        self.set(to, Some(piece));
                    }
                    Some(piece) => self.set(from, Some(piece)),
                }
            }
        }
        moved
    }
}
