//! Blob-to-cell intersection.

use stepgrid_types::{GridGeometry, OccupancyGrid, Rect};

/// Mark every cell whose inset rectangle overlaps at least one blob.
///
/// The result is indexed in image space.  Cells whose inset has no area are
/// never occupied.
pub fn intersect(blobs: &[Rect], geometry: &GridGeometry) -> OccupancyGrid {
    let mut grid = OccupancyGrid::new(geometry.cols, geometry.rows);
    if geometry.is_empty() || blobs.is_empty() {
        return grid;
    }
    for row in 0..geometry.rows {
        for col in 0..geometry.cols {
            let cell = geometry.inset_rect(col, row);
            if blobs.iter().any(|blob| cell.intersects(blob)) {
                grid.set(col, row, true);
            }
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_marks_every_overlapped_inset() {
        let grid = intersect(&[Rect::new(40, 40, 30, 30)], &GridGeometry::default());
        // Spans x 40..70 and y 40..70: overlaps the insets of the four cells
        // around the (50, 50) corner.
        assert!(grid.get(0, 0));
        assert!(grid.get(1, 0));
        assert!(grid.get(0, 1));
        assert!(grid.get(1, 1));
        assert_eq!(grid.occupied_count(), 4);
    }

    #[test]
    fn blob_inside_tolerance_gap_marks_nothing() {
        // x 46..54 lies entirely in the tolerance strip between cells 0 and 1.
        let grid = intersect(&[Rect::new(46, 10, 8, 30)], &GridGeometry::default());
        assert!(grid.is_vacant());
    }

    #[test]
    fn blob_touching_inset_edge_does_not_count() {
        // Inset of cell (0, 0) is 5..45; a blob ending exactly at 5 only touches it.
        let grid = intersect(&[Rect::new(0, 0, 5, 5)], &GridGeometry::default());
        assert!(grid.is_vacant());
    }

    #[test]
    fn blob_outside_the_grid_is_ignored() {
        let grid = intersect(&[Rect::new(500, 500, 40, 40)], &GridGeometry::default());
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.rows(), 3);
        assert!(grid.is_vacant());
    }

    #[test]
    fn oversized_tolerance_disables_cells() {
        let geometry = GridGeometry {
            tolerance_x: 25.0,
            ..GridGeometry::default()
        };
        let grid = intersect(&[Rect::new(0, 0, 200, 150)], &geometry);
        assert!(grid.is_vacant());
    }

    #[test]
    fn zero_sized_grid_is_empty() {
        let geometry = GridGeometry {
            cols: 0,
            ..GridGeometry::default()
        };
        let grid = intersect(&[Rect::new(0, 0, 100, 100)], &geometry);
        assert!(grid.is_empty());
    }
}
