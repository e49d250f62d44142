/// Rows and columns of the view grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: usize,
    pub columns: usize,
}

impl GridLayout {
    pub const SINGLE: Self = Self {
        rows: 1,
        columns: 1,
    };

    pub fn cells(&self) -> usize {
        self.rows * self.columns
    }
}

/// Number of view instances: one per visible layer in grid mode, at least one.
pub fn desired_count(visible_layers: usize, grid_mode: bool) -> usize {
    if grid_mode { visible_layers.max(1) } else { 1 }
}

/// Grows columns while they stay within `rows * aspect_ratio`, rows
/// otherwise, then drops columns that are not needed.
pub fn compute_grid(count: usize, aspect_ratio: f64) -> GridLayout {
    let ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        1.0
    };
    let mut rows = 1;
    let mut columns = 1;
    while rows * columns < count {
        if columns as f64 <= rows as f64 * ratio {
            columns += 1;
        } else {
            rows += 1;
        }
    }
    while columns > 1 && (columns - 1) * rows >= count {
        columns -= 1;
    }
    GridLayout { rows, columns }
}
