//! Small dense row-major matrix, just enough linear algebra for the walk and clustering code.

use std::ops::{Index, IndexMut};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for r in rows {
            assert_eq!(r.len(), cols, "ragged rows");
            data.extend_from_slice(r);
        }
        Self { rows: rows.len(), cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    pub fn set_column(&mut self, j: usize, values: &[f64]) {
        debug_assert_eq!(values.len(), self.rows);
        for (i, &v) in values.iter().enumerate() {
            self[(i, j)] = v;
        }
    }

    /// Rows `rows` and columns `cols` of `self`, in the order given.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Matrix {
        let mut out = Matrix::zeros(rows.len(), cols.len());
        for (oi, &i) in rows.iter().enumerate() {
            let src = self.row(i);
            let dst = out.row_mut(oi);
            for (oj, &j) in cols.iter().enumerate() {
                dst[oj] = src[j];
            }
        }
        out
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out[(j, i)] = self[(i, j)];
            }
        }
        out
    }

    /// `self * other`.
    pub fn matmul(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.cols, other.rows, "shape mismatch");
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            let a = self.row(i);
            let dst = &mut out.data[i * other.cols..(i + 1) * other.cols];
            for (k, &aik) in a.iter().enumerate() {
                if aik == 0.0 {
                    continue;
                }
                for (d, &b) in dst.iter_mut().zip(other.row(k)) {
                    *d += aik * b;
                }
            }
        }
        out
    }

    /// Row vector times matrix: `x^T * self`.
    pub fn vec_mul(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.rows, "shape mismatch");
        let mut out = vec![0.0; self.cols];
        for (i, &xi) in x.iter().enumerate() {
            if xi == 0.0 {
                continue;
            }
            for (o, &a) in out.iter_mut().zip(self.row(i)) {
                *o += xi * a;
            }
        }
        out
    }

    /// Matrix times column vector: `self * x`.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.cols, "shape mismatch");
        (0..self.rows).map(|i| self.row(i).iter().zip(x).map(|(a, b)| a * b).sum()).collect()
    }

    /// Row sums with non-finite entries counted as zero.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.rows)
            .map(|i| self.row(i).iter().filter(|v| v.is_finite()).sum())
            .collect()
    }

    /// Scale every column to sum to one; all-zero columns stay zero.
    pub fn normalize_columns(&mut self) {
        for j in 0..self.cols {
            let s: f64 = (0..self.rows).map(|i| self[(i, j)]).sum();
            if s > 0.0 {
                for i in 0..self.rows {
                    self[(i, j)] /= s;
                }
            }
        }
    }

    /// Scale every row to sum to one; all-zero rows stay zero.
    pub fn normalize_rows(&mut self) {
        for i in 0..self.rows {
            let row = self.row_mut(i);
            let s: f64 = row.iter().sum();
            if s > 0.0 {
                row.iter_mut().for_each(|v| *v /= s);
            }
        }
    }

    pub fn map_in_place<F: Fn(f64) -> f64>(&mut self, f: F) {
        self.data.iter_mut().for_each(|v| *v = f(*v));
    }

    /// Largest absolute elementwise difference; `inf` on shape mismatch.
    pub fn max_abs_diff(&self, other: &Matrix) -> f64 {
        if self.rows != other.rows || self.cols != other.cols {
            return f64::INFINITY;
        }
        self.data.iter().zip(&other.data).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max)
    }

    /// Solve `self * x = b` by Gaussian elimination with partial pivoting.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        let n = self.rows;
        if self.cols != n || b.len() != n {
            return Err(Error::InvalidParameter(format!(
                "solve needs a square system, got {}x{} with rhs {}",
                self.rows,
                self.cols,
                b.len()
            )));
        }
        let mut a = self.data.clone();
        let mut x = b.to_vec();
        let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&p, &q| a[p * n + col].abs().total_cmp(&a[q * n + col].abs()))
                .unwrap_or(col);
            if a[pivot * n + col].abs() <= 1e-14 * scale {
                return Err(Error::SingularMatrix);
            }
            if pivot != col {
                for k in 0..n {
                    a.swap(col * n + k, pivot * n + k);
                }
                x.swap(col, pivot);
            }
            let d = a[col * n + col];
            for r in (col + 1)..n {
                let f = a[r * n + col] / d;
                if f == 0.0 {
                    continue;
                }
                for k in col..n {
                    a[r * n + k] -= f * a[col * n + k];
                }
                x[r] -= f * x[col];
            }
        }
        for col in (0..n).rev() {
            let mut s = x[col];
            for k in (col + 1)..n {
                s -= a[col * n + k] * x[k];
            }
            x[col] = s / a[col * n + col];
        }
        Ok(x)
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
