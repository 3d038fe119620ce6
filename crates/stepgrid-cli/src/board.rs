//! Console tile board: logs which floor tiles change state.

use std::collections::HashMap;

use stepgrid_runtime::DetectionSink;
use stepgrid_types::OccupancyGrid;
use tracing::info;

/// A [`DetectionSink`] that remembers the last status of every tile and
/// logs only the changes, plus the moments the floor becomes vacant or
/// occupied.
#[derive(Debug, Default)]
pub struct TileBoard {
    tiles: HashMap<(u32, u32), bool>,
    pending: Vec<(u32, u32, bool)>,
    last_changes: Vec<(u32, u32, bool)>,
    vacant: Option<bool>,
}

impl TileBoard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl TileBoard {
    /// Tiles that changed state in the most recent cycle.
    pub fn last_changes(&self) -> &[(u32, u32, bool)] {
        &self.last_changes
    }

    /// Whether the floor was vacant in the most recent cycle.
    pub fn is_vacant(&self) -> Option<bool> {
        self.vacant
    }
}

impl DetectionSink for TileBoard {
    fn set_tile_status(&mut self, col: u32, row: u32, occupied: bool) {
        let previous = self.tiles.insert((col, row), occupied).unwrap_or(false);
        if previous != occupied {
            self.pending.push((col, row, occupied));
        }
    }

    fn on_occupancy(&mut self, cycle: u64, grid: &OccupancyGrid) {
        for &(col, row, occupied) in &self.pending {
            info!(cycle, col, row, occupied, "tile changed");
        }
        self.last_changes = std::mem::take(&mut self.pending);

        let vacant = grid.is_vacant();
        if self.vacant != Some(vacant) {
            if vacant {
                info!(cycle, "floor vacant");
            } else {
                info!(cycle, occupied = grid.occupied_count(), "floor occupied");
            }
            self.vacant = Some(vacant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(board: &mut TileBoard, cycle: u64, grid: &OccupancyGrid) {
        for (col, row, occupied) in grid.iter() {
            board.set_tile_status(col, row, occupied);
        }
        board.on_occupancy(cycle, grid);
    }

    #[test]
    fn only_changes_are_recorded() {
        let mut board = TileBoard::new();
        let mut grid = OccupancyGrid::new(3, 2);

        report(&mut board, 1, &grid);
        assert!(board.last_changes().is_empty());
        assert_eq!(board.is_vacant(), Some(true));

        grid.set(2, 1, true);
        report(&mut board, 2, &grid);
        assert_eq!(board.last_changes(), &[(2, 1, true)]);
        assert_eq!(board.is_vacant(), Some(false));

        report(&mut board, 3, &grid);
        assert!(board.last_changes().is_empty());

        grid.set(2, 1, false);
        grid.set(0, 0, true);
        report(&mut board, 4, &grid);
        assert_eq!(board.last_changes(), &[(0, 0, true), (2, 1, false)]);
    }

    #[test]
    fn no_state_before_first_cycle() {
        assert_eq!(TileBoard::new().is_vacant(), None);
    }
}
