//! Rectangle partitioning into measurement grids.

use field_spectra_core::{GridCell, GridSpec, Rect};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid {rows}x{cols} over a {height}x{width} px rectangle yields zero-sized cells")]
    DegenerateGrid {
        rows: usize,
        cols: usize,
        height: usize,
        width: usize,
    },
    #[error("partition produced {cells} cells but {labels} cell labels")]
    LabelMismatch { cells: usize, labels: usize },
}

/// Resolve the effective grid size of a rectangle.
///
/// An absent grid behaves like `(0, 0)`: each axis expands to one cell per
/// pixel. A zero on a single axis expands that axis alone.
pub fn effective_grid(rect: &Rect, grid: Option<GridSpec>) -> (usize, usize) {
    match grid {
        None => (rect.height(), rect.width()),
        Some(g) => (
            if g.rows == 0 {
                rect.height()
            } else {
                g.rows as usize
            },
            if g.cols == 0 {
                rect.width()
            } else {
                g.cols as usize
            },
        ),
    }
}

/// Tile a rectangle into grid cells, row-major.
///
/// Cell height and width are the integer quotients of the rectangle extent
/// and the effective grid size. When the extent does not divide evenly, the
/// remainder pixels at the high end belong to no cell; they are never merged
/// into a larger final cell. Downstream row counts depend on this exact
/// truncation.
pub fn partition_rect(rect: &Rect, grid: Option<GridSpec>) -> Result<Vec<Rect>, GridError> {
    let (rows, cols) = effective_grid(rect, grid);
    let (height, width) = (rect.height(), rect.width());
    if rows == 0 || cols == 0 || height / rows == 0 || width / cols == 0 {
        return Err(GridError::DegenerateGrid {
            rows,
            cols,
            height,
            width,
        });
    }
    let cell_height = height / rows;
    let cell_width = width / cols;

    let n_rows = height / cell_height;
    let n_cols = width / cell_width;
    let mut cells = Vec::with_capacity(n_rows * n_cols);
    for i in 0..n_rows {
        let row_start = rect.row_start + i * cell_height;
        for j in 0..n_cols {
            let col_start = rect.col_start + j * cell_width;
            cells.push(Rect::new(
                row_start,
                row_start + cell_height,
                col_start,
                col_start + cell_width,
            ));
        }
    }
    Ok(cells)
}

/// Enumerate grid cell labels, row-major.
///
/// `None` and `(0, 0)` collapse to the single label `(0, 0)`. That does not
/// match the full-resolution expansion [`partition_rect`] performs for the
/// same inputs; both conventions have callers that rely on their exact
/// counts, so neither may be folded into the other.
pub fn grid_cell_labels(grid: Option<GridSpec>) -> Vec<GridCell> {
    match grid {
        None | Some(GridSpec { rows: 0, cols: 0 }) => vec![GridCell::new(0, 0)],
        Some(g) => {
            let mut labels = Vec::with_capacity(g.rows as usize * g.cols as usize);
            for i in 0..g.rows {
                for j in 0..g.cols {
                    labels.push(GridCell::new(i, j));
                }
            }
            labels
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: Rect = Rect::new(10, 15, 5, 8);

    #[test]
    fn effective_size_expands_zero_axes() {
        assert_eq!(effective_grid(&RECT, Some(GridSpec::new(1, 1))), (1, 1));
        assert_eq!(effective_grid(&RECT, Some(GridSpec::new(2, 3))), (2, 3));
        assert_eq!(effective_grid(&RECT, Some(GridSpec::new(0, 0))), (5, 3));
        assert_eq!(effective_grid(&RECT, Some(GridSpec::new(0, 2))), (5, 2));
        assert_eq!(effective_grid(&RECT, None), (5, 3));
    }

    #[test]
    fn single_cell_grid_returns_the_rectangle() {
        let cells = partition_rect(&RECT, Some(GridSpec::new(1, 1))).unwrap();
        assert_eq!(cells, vec![RECT]);
    }

    #[test]
    fn two_by_two_truncates_the_remainder_row() {
        let cells = partition_rect(&RECT, Some(GridSpec::new(2, 2))).unwrap();
        assert_eq!(
            cells,
            vec![
                Rect::new(10, 12, 5, 6),
                Rect::new(10, 12, 6, 7),
                Rect::new(10, 12, 7, 8),
                Rect::new(12, 14, 5, 6),
                Rect::new(12, 14, 6, 7),
                Rect::new(12, 14, 7, 8),
            ]
        );
    }

    #[test]
    fn zero_grid_partitions_per_pixel() {
        let cells = partition_rect(&RECT, Some(GridSpec::new(0, 0))).unwrap();
        assert_eq!(cells.len(), 15);
        assert!(cells.iter().all(|c| c.area() == 1));
        assert_eq!(cells[0], Rect::new(10, 11, 5, 6));
        assert_eq!(cells[14], Rect::new(14, 15, 7, 8));

        let absent = partition_rect(&RECT, None).unwrap();
        assert_eq!(absent, cells);
    }

    #[test]
    fn oversized_grid_is_degenerate() {
        let err = partition_rect(&RECT, Some(GridSpec::new(6, 1))).unwrap_err();
        assert!(matches!(err, GridError::DegenerateGrid { .. }));
    }

    #[test]
    fn labels_are_row_major() {
        let labels = grid_cell_labels(Some(GridSpec::new(2, 3)));
        let coords: Vec<(u32, u32)> = labels.iter().map(|c| (c.row, c.col)).collect();
        assert_eq!(
            coords,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn absent_and_zero_labels_collapse() {
        assert_eq!(grid_cell_labels(None), vec![GridCell::new(0, 0)]);
        assert_eq!(
            grid_cell_labels(Some(GridSpec::new(0, 0))),
            vec![GridCell::new(0, 0)]
        );
        // A zero on one axis only does not collapse.
        assert_eq!(grid_cell_labels(Some(GridSpec::new(2, 1))).len(), 2);
    }
}
