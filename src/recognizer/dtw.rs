use super::ThresholdSettings;

/// Euclidean distance over the first `dim` coordinates.
pub(crate) fn distance(a: &[f64], b: &[f64], dim: usize) -> f64 {
    a[..dim]
        .iter()
        .zip(&b[..dim])
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Minimum DTW cost between `template` and any ending of `live`.
///
/// Both sequences are walked back to front, so the alignment is anchored at
/// the last observation of each and the cheapest start point inside `live`
/// wins. No path may advance one sequence more than `max_slope` times in a
/// row without advancing the other.
pub fn dtw(
    live: &[Vec<f64>],
    template: &[Vec<f64>],
    settings: &ThresholdSettings,
    dim: usize,
) -> f64 {
    let live_r: Vec<&[f64]> = live.iter().rev().map(Vec::as_slice).collect();
    let template_r: Vec<&[f64]> = template.iter().rev().map(Vec::as_slice).collect();

    let rows = live_r.len() + 1;
    let cols = template_r.len() + 1;
    let mut table = Grid::new(rows, cols, f64::INFINITY);
    let mut slope_i = Grid::new(rows, cols, 0u32);
    let mut slope_j = Grid::new(rows, cols, 0u32);
    table.set(0, 0, 0.0);

    for i in 1..rows {
        for j in 1..cols {
            let cost = distance(live_r[i - 1], template_r[j - 1], dim);
            let diagonal = table.get(i - 1, j - 1);
            let left = table.get(i, j - 1);
            let up = table.get(i - 1, j);

            // Horizontal runs are limited too. Thresholds tuned without that
            // limit may need a larger max_slope.
            if left < diagonal
                && left < up
                && f64::from(slope_i.get(i, j - 1)) < settings.max_slope
            {
                table.set(i, j, cost + left);
                slope_i.set(i, j, slope_i.get(i, j - 1) + 1);
                slope_j.set(i, j, 0);
            } else if up < diagonal
                && up < left
                && f64::from(slope_j.get(i - 1, j)) < settings.max_slope
            {
                table.set(i, j, cost + up);
                slope_i.set(i, j, 0);
                slope_j.set(i, j, slope_j.get(i - 1, j) + 1);
            } else {
                table.set(i, j, cost + diagonal);
                slope_i.set(i, j, 0);
                slope_j.set(i, j, 0);
            }
        }
    }

    (1..rows)
        .map(|i| table.get(i, cols - 1))
        .fold(f64::INFINITY, f64::min)
}

struct Grid<T> {
    cols: usize,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    fn new(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            cols,
            cells: vec![fill; rows * cols],
        }
    }

    fn get(&self, row: usize, col: usize) -> T {
        self.cells[row * self.cols + col]
    }

    fn set(&mut self, row: usize, col: usize, value: T) {
        self.cells[row * self.cols + col] = value;
    }
}
