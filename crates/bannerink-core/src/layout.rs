//! Grid layout engine.
//!
//! Pure functions mapping a grid, a canvas size and image dimensions to
//! per-image placements. Images are assigned to cells in row-major order;
//! images beyond `rows * cols` receive no cell.

use crate::document::{GridSize, ImageId};
use kurbo::{Point, Rect, Size};

/// One cell of the uniform grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Row-major index of the cell.
    pub index: usize,
    pub row: u32,
    pub col: u32,
    /// Cell rectangle in logical canvas coordinates.
    pub rect: Rect,
}

/// Where and how large an image is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub image_id: ImageId,
    /// Cell index the image occupies.
    pub slot: usize,
    /// Top-left corner of the scaled image.
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Natural size of the image.
    pub source_size: Size,
}

impl Placement {
    /// Drawn size after scaling.
    pub fn size(&self) -> Size {
        Size::new(
            self.source_size.width * self.scale_x,
            self.source_size.height * self.scale_y,
        )
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(Point::new(self.left, self.top), self.size())
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }
}

/// Size of one cell. The grid has no gutters.
pub fn cell_size(grid: GridSize, canvas: Size) -> Size {
    let grid = grid.sanitized();
    Size::new(canvas.width / grid.cols as f64, canvas.height / grid.rows as f64)
}

/// The cell for a given image index, or `None` when the grid is full.
pub fn cell_for_index(index: usize, grid: GridSize, canvas: Size) -> Option<Cell> {
    let grid = grid.sanitized();
    if index >= grid.capacity() {
        return None;
    }
    let cols = grid.cols as usize;
    let row = (index / cols) as u32;
    let col = (index % cols) as u32;
    let size = cell_size(grid, canvas);
    let origin = Point::new(col as f64 * size.width, row as f64 * size.height);
    Some(Cell {
        index,
        row,
        col,
        rect: Rect::from_origin_size(origin, size),
    })
}

/// All cells in row-major order.
pub fn grid_cells(grid: GridSize, canvas: Size) -> Vec<Cell> {
    (0..grid.sanitized().capacity())
        .filter_map(|index| cell_for_index(index, grid, canvas))
        .collect()
}

/// Uniform scale that fits `image` inside `cell`.
///
/// A relatively wider image is fitted to the cell width, otherwise to the
/// cell height. Returns `None` for empty or non-finite sizes.
pub fn fit_scale(image: Size, cell: Size) -> Option<f64> {
    let usable = |s: Size| s.width.is_finite() && s.height.is_finite() && s.width > 0.0 && s.height > 0.0;
    if !usable(image) || !usable(cell) {
        return None;
    }
    let image_aspect = image.width / image.height;
    let cell_aspect = cell.width / cell.height;
    let scale = if image_aspect > cell_aspect {
        cell.width / image.width
    } else {
        cell.height / image.height
    };
    Some(scale)
}

/// Place an image centered in `cell`.
pub fn place_in_cell(image_id: ImageId, cell: &Cell, image_size: Size) -> Option<Placement> {
    let scale = fit_scale(image_size, cell.rect.size())?;
    let drawn = Size::new(image_size.width * scale, image_size.height * scale);
    // Rounding can make the fitted axis a hair larger than the cell.
    let left = cell.rect.x0 + ((cell.rect.width() - drawn.width) / 2.0).max(0.0);
    let top = cell.rect.y0 + ((cell.rect.height() - drawn.height) / 2.0).max(0.0);
    Some(Placement {
        image_id,
        slot: cell.index,
        left,
        top,
        scale_x: scale,
        scale_y: scale,
        source_size: image_size,
    })
}

/// Compute placements for images given their natural sizes.
///
/// Returns at most `rows * cols` placements, in input order. Images with an
/// unusable size are skipped without shifting later images.
pub fn compute_grid_placements(images: &[(ImageId, Size)], grid: GridSize, canvas: Size) -> Vec<Placement> {
    images
        .iter()
        .enumerate()
        .map_while(|(index, (id, size))| cell_for_index(index, grid, canvas).map(|cell| (cell, id, *size)))
        .filter_map(|(cell, id, size)| place_in_cell(id.clone(), &cell, size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(sizes: &[(f64, f64)]) -> Vec<(ImageId, Size)> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| (ImageId::new(format!("img{i}")), Size::new(w, h)))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_row_major_cells() {
        let cells = grid_cells(GridSize { rows: 2, cols: 3 }, Size::new(600.0, 400.0));
        assert_eq!(cells.len(), 6);
        assert_eq!((cells[4].row, cells[4].col), (1, 1));
        assert_eq!(cells[4].rect, Rect::new(200.0, 200.0, 400.0, 400.0));
    }

    #[test]
    fn test_wide_image_fits_width() {
        let cell = cell_for_index(0, GridSize { rows: 1, cols: 1 }, Size::new(400.0, 400.0)).unwrap();
        let placement = place_in_cell(ImageId::new("wide"), &cell, Size::new(1000.0, 500.0)).unwrap();
        assert!(approx(placement.scale_x, 0.4));
        assert!(approx(placement.left, 0.0));
        assert!(approx(placement.top, 100.0));
        let center = placement.center();
        assert!(approx(center.x, 200.0) && approx(center.y, 200.0));
    }

    #[test]
    fn test_tall_image_fits_height() {
        let cell = cell_for_index(1, GridSize { rows: 1, cols: 2 }, Size::new(600.0, 300.0)).unwrap();
        let placement = place_in_cell(ImageId::new("tall"), &cell, Size::new(100.0, 200.0)).unwrap();
        assert!(approx(placement.scale_y, 1.5));
        assert!(approx(placement.top, 0.0));
        assert!(approx(placement.left, 300.0 + (300.0 - 150.0) / 2.0));
    }

    #[test]
    fn test_excess_images_are_excluded() {
        let placements = compute_grid_placements(
            &images(&[(10.0, 10.0); 7]),
            GridSize { rows: 2, cols: 2 },
            Size::new(600.0, 600.0),
        );
        assert_eq!(placements.len(), 4);
        let slots: Vec<_> = placements.iter().map(|p| p.slot).collect();
        assert_eq!(slots, [0, 1, 2, 3]);
    }

    #[test]
    fn test_degenerate_image_keeps_slots() {
        let placements = compute_grid_placements(
            &images(&[(10.0, 10.0), (0.0, 10.0), (10.0, 10.0)]),
            GridSize { rows: 2, cols: 2 },
            Size::new(200.0, 200.0),
        );
        let slots: Vec<_> = placements.iter().map(|p| p.slot).collect();
        assert_eq!(slots, [0, 2]);
    }

    #[test]
    fn test_out_of_range_grid_is_clamped() {
        let cells = grid_cells(GridSize { rows: 0, cols: 7 }, Size::new(600.0, 600.0));
        assert_eq!(cells.len(), 6);
        assert!(approx(cells[0].rect.height(), 600.0));
        assert!(approx(cells[0].rect.width(), 100.0));
    }

    #[test]
    fn test_placements_within_bounds_for_all_grids() {
        let canvas = Size::new(600.0, 337.5);
        let sizes = [(640.0, 480.0), (1.0, 3000.0), (3000.0, 1.0), (333.0, 333.0), (1920.0, 1080.0)];
        let all = images(&sizes.repeat(8));
        for rows in 1..=6 {
            for cols in 1..=6 {
                let grid = GridSize { rows, cols };
                for count in [0, 1, 5, 17, all.len()] {
                    let placements = compute_grid_placements(&all[..count], grid, canvas);
                    assert!(placements.len() <= grid.capacity());
                    assert_eq!(placements.len(), count.min(grid.capacity()));
                    for p in &placements {
                        assert!(p.scale_x > 0.0 && p.scale_y > 0.0);
                        assert!(p.left >= 0.0 && p.left <= canvas.width);
                        assert!(p.top >= 0.0 && p.top <= canvas.height);
                        let cell = cell_for_index(p.slot, grid, canvas).unwrap();
                        assert!(p.bounds().x1 <= cell.rect.x1 + 1e-6);
                        assert!(p.bounds().y1 <= cell.rect.y1 + 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let input = images(&[(300.0, 200.0), (50.0, 90.0), (1024.0, 1024.0)]);
        let grid = GridSize { rows: 3, cols: 2 };
        let canvas = Size::new(600.0, 600.0);
        let first = compute_grid_placements(&input, grid, canvas);
        let second = compute_grid_placements(&input, grid, canvas);
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.left.to_bits(), b.left.to_bits());
            assert_eq!(a.scale_x.to_bits(), b.scale_x.to_bits());
        }
    }
}
