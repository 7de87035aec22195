use nalgebra as na;
use na::Vector3;

use crate::error::RenderError;

/// Row-major 2D view over a flat vector. `row * width + column` is the only way cells are
/// addressed, and every accessor checks its index against the grid bounds.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

/// Bounds-checked view into a single row of a grid.
#[derive(Debug)]
pub struct Row<'a, T> {
    cells: &'a [T],
}

/// Mutable bounds-checked view into a single row of a grid.
#[derive(Debug)]
pub struct RowMut<'a, T> {
    cells: &'a mut [T],
}

impl<'a, T> Row<'a, T> {
    pub fn len(&self) -> usize {
        return self.cells.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.cells.is_empty();
    }

    pub fn get(&self, column: usize) -> Result<&'a T, RenderError> {
        let width = self.cells.len();
        return self.cells.get(column).ok_or(RenderError::ColumnOutOfRange { column, width });
    }

    pub fn as_slice(&self) -> &'a [T] {
        return self.cells;
    }
}

impl<'a, T> RowMut<'a, T> {
    pub fn len(&self) -> usize {
        return self.cells.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.cells.is_empty();
    }

    pub fn get(&self, column: usize) -> Result<&T, RenderError> {
        let width = self.cells.len();
        return self.cells.get(column).ok_or(RenderError::ColumnOutOfRange { column, width });
    }

    pub fn get_mut(&mut self, column: usize) -> Result<&mut T, RenderError> {
        let width = self.cells.len();
        return self.cells.get_mut(column).ok_or(RenderError::ColumnOutOfRange { column, width });
    }

    pub fn set(&mut self, column: usize, value: T) -> Result<(), RenderError> {
        *self.get_mut(column)? = value;
        return Ok(());
    }
}

impl<T: Clone> Grid<T> {
    pub fn new(width: usize, height: usize, value: T) -> Self {
        return Self {
            width,
            height,
            cells: vec![value; width * height],
        };
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    /// Drops old contents and reallocates the grid with the new extent.
    pub fn reallocate(&mut self, width: usize, height: usize, value: T) {
        self.width = width;
        self.height = height;
        self.cells = vec![value; width * height];
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> usize {
        return self.width;
    }

    pub fn height(&self) -> usize {
        return self.height;
    }

    pub fn len(&self) -> usize {
        return self.cells.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.cells.is_empty();
    }

    fn row_range(&self, row: usize) -> Result<std::ops::Range<usize>, RenderError> {
        if row >= self.height {
            return Err(RenderError::RowOutOfRange { row, height: self.height });
        }
        let start = row * self.width;
        return Ok(start..start + self.width);
    }

    pub fn row(&self, row: usize) -> Result<Row<'_, T>, RenderError> {
        let range = self.row_range(row)?;
        return Ok(Row { cells: &self.cells[range] });
    }

    pub fn row_mut(&mut self, row: usize) -> Result<RowMut<'_, T>, RenderError> {
        let range = self.row_range(row)?;
        return Ok(RowMut { cells: &mut self.cells[range] });
    }

    pub fn get(&self, column: usize, row: usize) -> Result<&T, RenderError> {
        return self.row(row)?.get(column);
    }

    pub fn as_slice(&self) -> &[T] {
        return &self.cells[..];
    }
}

/// Color and depth planes of the frame being rendered.
/// Row 0 is the top of the image, depth uses "less wins" with `f32::INFINITY` as empty.
pub struct ScreenBuffer {
    color: Grid<Vector3<f32>>,
    depth: Grid<f32>,
    background: Vector3<f32>,
}

pub const DEPTH_EMPTY: f32 = f32::INFINITY;

impl ScreenBuffer {
    pub fn new(width: usize, height: usize, background: Vector3<f32>) -> Self {
        return Self {
            color: Grid::new(width, height, background),
            depth: Grid::new(width, height, DEPTH_EMPTY),
            background,
        };
    }

    pub fn width(&self) -> usize {
        return self.color.width();
    }

    pub fn height(&self) -> usize {
        return self.color.height();
    }

    /// Number of pixels, width * height.
    pub fn size(&self) -> usize {
        return self.color.len();
    }

    pub fn background(&self) -> Vector3<f32> {
        return self.background;
    }

    /// Color row accessor.
    pub fn row(&self, row: usize) -> Result<Row<'_, Vector3<f32>>, RenderError> {
        return self.color.row(row);
    }

    pub fn row_mut(&mut self, row: usize) -> Result<RowMut<'_, Vector3<f32>>, RenderError> {
        return self.color.row_mut(row);
    }

    /// Depth row accessor.
    pub fn z(&self, row: usize) -> Result<Row<'_, f32>, RenderError> {
        return self.depth.row(row);
    }

    pub fn z_mut(&mut self, row: usize) -> Result<RowMut<'_, f32>, RenderError> {
        return self.depth.row_mut(row);
    }

    /// Both rows at once, for the depth-test-and-write step.
    pub fn rows_mut(
        &mut self,
        row: usize,
    ) -> Result<(RowMut<'_, Vector3<f32>>, RowMut<'_, f32>), RenderError> {
        return Ok((self.color.row_mut(row)?, self.depth.row_mut(row)?));
    }

    /// Resets every pixel to the background color and every depth cell to the empty sentinel.
    pub fn clear(&mut self) {
        self.color.fill(self.background);
        self.depth.fill(DEPTH_EMPTY);
    }

    /// Reallocates both planes for the new extent, nothing from the old frame survives.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.color.reallocate(width, height, self.background);
        self.depth.reallocate(width, height, DEPTH_EMPTY);
    }

    pub fn color_data(&self) -> &[Vector3<f32>] {
        return self.color.as_slice();
    }

    pub fn depth_data(&self) -> &[f32] {
        return self.depth.as_slice();
    }

    /// Flat array of 3 * (number of pixels) floats.
    pub fn as_floats(&self) -> Vec<f32> {
        let mut result = Vec::with_capacity(3 * self.size());
        for pixel in self.color.as_slice() {
            result.extend_from_slice(&[pixel.x, pixel.y, pixel.z]);
        }
        return result;
    }

    /// Color plane as rgb8, ready to be handed to the display.
    pub fn as_rgb8(&self) -> Vec<u8> {
        fn to_byte(channel: f32) -> u8 {
            return (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
        }

        let mut result = Vec::with_capacity(3 * self.size());
        for pixel in self.color.as_slice() {
            result.extend_from_slice(&[to_byte(pixel.x), to_byte(pixel.y), to_byte(pixel.z)]);
        }
        return result;
    }

    /// Greyscale rgb8 image of the depth plane: nearest written depth is white, farthest is
    /// dark grey, empty cells are black.
    pub fn depth_image(&self) -> Vec<u8> {
        let written = self.depth.as_slice().iter().filter(|z| z.is_finite());
        let (z_min, z_max) = written.fold((f32::MAX, f32::MIN), |(lo, hi), &z| (lo.min(z), hi.max(z)));
        let scale = (z_max - z_min).max(f32::EPSILON);

        let mut result = Vec::with_capacity(3 * self.size());
        for &z in self.depth.as_slice() {
            let value = match z.is_finite() {
                true => (255.0 - 191.0 * (z - z_min) / scale) as u8,
                false => 0,
            };
            result.extend_from_slice(&[value, value, value]);
        }
        return result;
    }
}
