use crate::core::Interval;
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Index, IndexMut};

/// Raised when inverting a matrix that is singular (or too ill-conditioned for its inverse to be useful).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("singular matrix")]
pub struct SingularMatrix;

/// A dense, row-major matrix of intervals.
#[derive(Clone, PartialEq)]
pub struct IntervalMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Interval>,
}

impl IntervalMatrix {
    pub fn new(rows: usize, cols: usize, init: Interval) -> Self {
        IntervalMatrix {
            rows,
            cols,
            data: vec![init; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Interval>>) -> Self {
        let nb_rows = rows.len();
        let cols = rows.first().map_or(0, |r| r.len());
        debug_assert!(rows.iter().all(|r| r.len() == cols));
        IntervalMatrix {
            rows: nb_rows,
            cols,
            data: rows.into_iter().flatten().collect(),
        }
    }

    pub fn nb_rows(&self) -> usize {
        self.rows
    }

    pub fn nb_cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[Interval] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// True if any entry is empty.
    pub fn is_empty(&self) -> bool {
        self.data.iter().any(|x| x.is_empty())
    }

    /// Real matrix made of the midpoints of all entries.
    pub fn mid(&self) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x.mid()).collect(),
        }
    }

    /// Sub-matrix made of the given columns, in the given order.
    pub fn select_columns(&self, columns: &[usize]) -> IntervalMatrix {
        let mut data = Vec::with_capacity(self.rows * columns.len());
        for i in 0..self.rows {
            let row = self.row(i);
            data.extend(columns.iter().map(|&j| row[j]));
        }
        IntervalMatrix {
            rows: self.rows,
            cols: columns.len(),
            data,
        }
    }
}

impl Index<(usize, usize)> for IntervalMatrix {
    type Output = Interval;

    fn index(&self, (i, j): (usize, usize)) -> &Interval {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for IntervalMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Interval {
        debug_assert!(i < self.rows && j < self.cols);
        &mut self.data[i * self.cols + j]
    }
}

impl Display for IntervalMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rows = (0..self.rows).map(|i| format!("({})", self.row(i).iter().format(" ; ")));
        write!(f, "({})", rows.format(" ; "))
    }
}

impl Debug for IntervalMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// A dense, row-major matrix of floats. Used for preconditioning, where no rounding guarantee is needed.
#[derive(Clone, PartialEq, Debug)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let nb_rows = rows.len();
        let cols = rows.first().map_or(0, |r| r.len());
        debug_assert!(rows.iter().all(|r| r.len() == cols));
        Matrix {
            rows: nb_rows,
            cols,
            data: rows.into_iter().flatten().collect(),
        }
    }

    pub fn nb_rows(&self) -> usize {
        self.rows
    }

    pub fn nb_cols(&self) -> usize {
        self.cols
    }

    /// Inverse of a square matrix by Gauss-Jordan elimination with partial pivoting.
    pub fn inverse(&self) -> Result<Matrix, SingularMatrix> {
        debug_assert_eq!(self.rows, self.cols);
        let n = self.rows;
        if self.data.iter().any(|x| !x.is_finite()) {
            return Err(SingularMatrix);
        }
        let scale = self.data.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
        if scale == 0.0 && n > 0 {
            return Err(SingularMatrix);
        }
        let threshold = scale * f64::EPSILON * n as f64;

        let mut a = self.clone();
        let mut inv = Matrix::identity(n);
        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&i, &j| a[(i, col)].abs().total_cmp(&a[(j, col)].abs()))
                .ok_or(SingularMatrix)?;
            let pivot = a[(pivot_row, col)];
            if pivot.abs() <= threshold {
                return Err(SingularMatrix);
            }
            a.swap_rows(col, pivot_row);
            inv.swap_rows(col, pivot_row);
            for j in 0..n {
                a[(col, j)] /= pivot;
                inv[(col, j)] /= pivot;
            }
            for i in (0..n).filter(|&i| i != col) {
                let factor = a[(i, col)];
                if factor != 0.0 {
                    for j in 0..n {
                        a[(i, j)] -= factor * a[(col, j)];
                        inv[(i, j)] -= factor * inv[(col, j)];
                    }
                }
            }
        }
        if inv.data.iter().all(|x| x.is_finite()) {
            Ok(inv)
        } else {
            Err(SingularMatrix)
        }
    }

    fn swap_rows(&mut self, r1: usize, r2: usize) {
        if r1 != r2 {
            for j in 0..self.cols {
                self.data.swap(r1 * self.cols + j, r2 * self.cols + j);
            }
        }
    }

    /// Outward-rounded product `self * m`.
    pub fn mul_matrix(&self, m: &IntervalMatrix) -> IntervalMatrix {
        debug_assert_eq!(self.cols, m.nb_rows());
        let mut res = IntervalMatrix::new(self.rows, m.nb_cols(), Interval::ZERO);
        for i in 0..self.rows {
            for j in 0..m.nb_cols() {
                res[(i, j)] = (0..self.cols).fold(Interval::ZERO, |acc, k| acc + self[(i, k)] * m[(k, j)]);
            }
        }
        res
    }

    /// Outward-rounded product `self * v`.
    pub fn mul_vector(&self, v: &[Interval]) -> Vec<Interval> {
        debug_assert_eq!(self.cols, v.len());
        (0..self.rows)
            .map(|i| v.iter().enumerate().fold(Interval::ZERO, |acc, (k, &x)| acc + self[(i, k)] * x))
            .collect()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse() {
        let m = Matrix::from_rows(vec![vec![2.0, 1.0], vec![1.0, 3.0]]);
        let inv = m.inverse().unwrap();
        let expected = [[0.6, -0.2], [-0.2, 0.4]];
        for i in 0..2 {
            for j in 0..2 {
                assert!((inv[(i, j)] - expected[i][j]).abs() < 1e-12);
            }
        }

        let singular = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert_eq!(singular.inverse(), Err(SingularMatrix));
        assert_eq!(Matrix::zeros(2, 2).inverse(), Err(SingularMatrix));
    }

    #[test]
    fn products_enclose_real_products() {
        let m = Matrix::from_rows(vec![vec![1.0, -1.0], vec![0.5, 2.0]]);
        let im = IntervalMatrix::from_rows(vec![
            vec![Interval::new(1.0, 2.0), Interval::ZERO],
            vec![Interval::ONE, Interval::new(-1.0, 1.0)],
        ]);
        let p = m.mul_matrix(&im);
        assert_eq!(p[(0, 0)], Interval::new(0.0, 1.0));
        assert_eq!(p[(0, 1)], Interval::new(-1.0, 1.0));
        assert_eq!(p[(1, 0)], Interval::new(2.5, 3.0));

        let v = m.mul_vector(&[Interval::new(0.0, 1.0), Interval::ONE]);
        assert_eq!(v, vec![Interval::new(-1.0, 0.0), Interval::new(2.0, 2.5)]);

        assert_eq!(im.mid(), Matrix::from_rows(vec![vec![1.5, 0.0], vec![1.0, 0.0]]));
        let cols = im.select_columns(&[1]);
        assert_eq!(cols.nb_cols(), 1);
        assert_eq!(cols[(1, 0)], Interval::new(-1.0, 1.0));
    }
}
