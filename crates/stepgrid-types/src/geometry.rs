//! Pixel rectangles and the per-cycle occupancy grid.

use crate::settings::AxisMapping;

// ────────────────────────────────────────────────────────────────────────────
// Rect
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned rectangle in image-pixel space.
///
/// Covers the half-open pixel ranges `x..x + width` and `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// True when the two rectangles share a region of non-zero area.
    ///
    /// Rectangles that only touch along an edge or at a corner do not
    /// intersect, and an empty rectangle intersects nothing.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OccupancyGrid
// ────────────────────────────────────────────────────────────────────────────

/// Boolean matrix of `cols × rows` tile cells, stored row-major.
///
/// A fresh grid is produced for every detection cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccupancyGrid {
    cols: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    /// An all-vacant grid.  A zero dimension yields a grid with no cells.
    pub fn new(cols: u32, rows: u32) -> Self {
        let len = if cols == 0 || rows == 0 {
            0
        } else {
            cols as usize * rows as usize
        };
        Self {
            cols,
            rows,
            cells: vec![false; len],
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// True when the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Occupancy of `(col, row)`; `false` outside the grid.
    pub fn get(&self, col: u32, row: u32) -> bool {
        self.index(col, row)
            .and_then(|i| self.cells.get(i).copied())
            .unwrap_or(false)
    }

    /// Set the occupancy of `(col, row)`.  Out-of-range cells are ignored.
    pub fn set(&mut self, col: u32, row: u32, occupied: bool) {
        if let Some(cell) = self.index(col, row).and_then(|i| self.cells.get_mut(i)) {
            *cell = occupied;
        }
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// True when no cell is occupied, i.e. nobody stands on the field.
    pub fn is_vacant(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// Iterate over `(col, row, occupied)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, bool)> + '_ {
        let cols = self.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &occupied)| ((i as u32) % cols, (i as u32) / cols, occupied))
    }

    /// Re-index the grid from image space into logical tile coordinates.
    pub fn remapped(&self, mapping: &AxisMapping) -> OccupancyGrid {
        let mut out = OccupancyGrid::new(self.cols, self.rows);
        for (col, row, occupied) in self.iter() {
            let (lc, lr) = mapping.to_logical(col, row, self.cols, self.rows);
            out.set(lc, lr, occupied);
        }
        out
    }

    fn index(&self, col: u32, row: u32) -> Option<usize> {
        (col < self.cols && row < self.rows).then(|| row as usize * self.cols as usize + col as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_rects_intersect() {
        let a = Rect::new(5, 5, 40, 40);
        let b = Rect::new(40, 40, 30, 30);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn edge_touch_is_not_an_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(!a.intersects(&Rect::new(10, 0, 10, 10)));
        assert!(!a.intersects(&Rect::new(0, 10, 10, 10)));
        assert!(!a.intersects(&Rect::new(10, 10, 5, 5)));
    }

    #[test]
    fn empty_rect_never_intersects() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(!a.intersects(&Rect::new(5, 5, 0, 3)));
        assert!(!Rect::new(5, 5, -2, 3).intersects(&a));
    }

    #[test]
    fn zero_sized_grid_has_no_cells() {
        let grid = OccupancyGrid::new(0, 3);
        assert!(grid.is_empty());
        assert!(grid.is_vacant());
        assert!(!grid.get(0, 0));
        assert_eq!(grid.iter().count(), 0);
    }

    #[test]
    fn set_and_get_ignore_out_of_range() {
        let mut grid = OccupancyGrid::new(4, 3);
        grid.set(1, 2, true);
        grid.set(9, 9, true);
        assert!(grid.get(1, 2));
        assert_eq!(grid.occupied_count(), 1);
        assert!(!grid.is_vacant());
    }

    #[test]
    fn remap_reverses_both_axes_by_default() {
        let mut grid = OccupancyGrid::new(4, 3);
        grid.set(0, 0, true);
        grid.set(1, 2, true);
        let logical = grid.remapped(&AxisMapping::default());
        assert!(logical.get(3, 2));
        assert!(logical.get(2, 0));
        assert_eq!(logical.occupied_count(), 2);
    }

    #[test]
    fn iter_yields_row_major_coordinates() {
        let grid = OccupancyGrid::new(2, 2);
        let coords: Vec<(u32, u32)> = grid.iter().map(|(c, r, _)| (c, r)).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }
}
