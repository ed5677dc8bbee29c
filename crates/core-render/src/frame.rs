//! Terminal cell grid.
//!
//! A `Frame` is `width * height` cells in row-major order. A leader cell
//! holds one grapheme cluster plus its column width; the columns a wide
//! cluster spills into are continuation cells (width 0) that never print.
//! Out-of-range writes are ignored.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u8 {
        const REVERSE   = 0b0000_0001; // software caret
        const CURSOR    = 0b0000_0010;
        const BOLD      = 0b0000_0100; // heading fragments
        const ITALIC    = 0b0000_1000; // emphasis nodes
        const INDICATOR = 0b0001_0000; // scroll lozenge column
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cluster text; empty for continuation cells.
    pub cluster: String,
    /// Columns covered. `0` marks a continuation cell.
    pub width: u8,
    pub flags: CellFlags,
}

impl Cell {
    pub fn leader(cluster: &str, width: u16, flags: CellFlags) -> Self {
        Self {
            cluster: cluster.to_string(),
            width: width.clamp(1, u16::from(u8::MAX)) as u8,
            flags,
        }
    }

    pub fn continuation(flags: CellFlags) -> Self {
        Self {
            cluster: String::new(),
            width: 0,
            flags,
        }
    }

    pub fn is_leader(&self) -> bool {
        self.width > 0
    }
}

impl Default for Cell {
    /// Blank cell: a single space.
    fn default() -> Self {
        Self::leader(" ", 1, CellFlags::empty())
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
        }
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    /// Place `cluster` at (x, y); following columns become continuations.
    /// The width is truncated at the right edge.
    pub fn set_cluster(&mut self, x: u16, y: u16, cluster: &str, width: u16, flags: CellFlags) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let w = width.max(1).min(self.width - x);
        self.cells[idx] = Cell::leader(cluster, w, flags);
        for i in idx + 1..idx + usize::from(w) {
            self.cells[i] = Cell::continuation(flags);
        }
    }

    /// OR `flags` into `span` cells starting at (x, y).
    pub fn apply_flags_span(&mut self, x: u16, y: u16, span: u16, flags: CellFlags) {
        for dx in 0..span.min(self.width.saturating_sub(x)) {
            if let Some(idx) = self.index(x + dx, y) {
                self.cells[idx].flags |= flags;
            }
        }
    }

    pub fn cell_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        let idx = self.index(x, y)?;
        self.cells.get_mut(idx)
    }

    /// Leader cells of row `y` as (cluster, width, flags, column).
    pub fn row_leaders(&self, y: u16) -> impl Iterator<Item = (&str, u16, CellFlags, u16)> + '_ {
        let row = if y < self.height {
            let start = usize::from(y) * usize::from(self.width);
            &self.cells[start..start + usize::from(self.width)]
        } else {
            &self.cells[..0]
        };
        row.iter()
            .enumerate()
            .filter(|(_, c)| c.is_leader())
            .map(|(x, c)| (c.cluster.as_str(), u16::from(c.width), c.flags, x as u16))
    }

    /// Leader clusters of row `y` (tests and diagnostics).
    pub fn line_clusters(&self, y: u16) -> Vec<&str> {
        self.row_leaders(y).map(|(c, _, _, _)| c).collect()
    }
}
