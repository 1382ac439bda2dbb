//! Pieces and grid positions.
//!
//! A piece is a plain value record: a stable id, its tier and the cell it
//! sits in. Decorative behaviour (blinking, per-tier sounds) belongs to the
//! presentation layer and is keyed by tier, never stored here.

/// Merge rank of a piece. Valid tiers are `1..=MAX_TIER`.
pub type Tier = u8;

/// Hard ceiling: a max-tier piece can be matched but never upgrades.
pub const MAX_TIER: Tier = 11;

/// Grid coordinate. `y == 0` is the bottom row; gravity pulls toward it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Pos { x, y }
    }

    /// 8-directional neighbour (diagonals included). A cell is not its own neighbour.
    pub fn touches(self, other: Pos) -> bool {
        self != other && self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }

    /// 4-directional neighbour (up/down/left/right only).
    pub fn is_orthogonal_to(self, other: Pos) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl From<(usize, usize)> for Pos {
    fn from((x, y): (usize, usize)) -> Self {
        Pos { x, y }
    }
}

/// Stable identity that survives gravity relocation.
pub type PieceId = u64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Piece {
    pub id: PieceId,
    pub tier: Tier,
    /// Kept in sync with the owning cell by `Grid::set`.
    pub pos: Pos,
}

impl Piece {
    pub fn new(id: PieceId, tier: Tier, pos: Pos) -> Self {
        Piece { id, tier, pos }
    }

    pub fn is_max_tier(&self) -> bool {
        self.tier >= MAX_TIER
    }
}

/// Is `tier` inside `[1, MAX_TIER]`?
pub fn is_valid_tier(tier: Tier) -> bool {
    (1..=MAX_TIER).contains(&tier)
}
