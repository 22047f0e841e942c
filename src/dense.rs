use crate::error::{Error, Result};
use num_complex::Complex64;
use num_traits::{One, Zero};
use std::ops::{AddAssign, Mul, Range, Sub};

/// Dense matrix with row-major element storage.
///
/// Admittance matrices are dense at the scale of studied transmission
/// networks (hundreds of buses), and Schur elimination fills in any
/// sparsity the assembly left behind.
#[derive(Clone, Debug, PartialEq)]
pub struct Mat<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

impl<T> Mat<T>
where
    T: Copy + Zero,
{
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![T::zero(); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self
    where
        T: One,
    {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, T::one());
        }
        m
    }

    /// Builds a matrix from row-major values.
    pub fn from_values(rows: usize, cols: usize, values: Vec<T>) -> Self {
        assert_eq!(
            values.len(),
            rows * cols,
            "values length ({}) must be rows * cols ({} * {})",
            values.len(),
            rows,
            cols
        );
        Self { rows, cols, values }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    fn ix(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.values[self.ix(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, v: T) {
        let i = self.ix(row, col);
        self.values[i] = v;
    }

    /// Accumulates `v` onto the element; the stamping primitive.
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, v: T)
    where
        T: AddAssign,
    {
        let i = self.ix(row, col);
        self.values[i] += v;
    }

    pub fn diagonal(&self) -> impl Iterator<Item = T> + '_ {
        assert_eq!(self.rows, self.cols);
        (0..self.rows).map(move |i| self.get(i, i))
    }

    /// Applies the same index selection to rows and columns of a square
    /// matrix. With a permutation this reorders the matrix symmetrically.
    pub fn select(&self, idx: &[usize]) -> Self {
        assert_eq!(self.rows, self.cols);
        let mut m = Self::zeros(idx.len(), idx.len());
        for (i, &r) in idx.iter().enumerate() {
            for (j, &c) in idx.iter().enumerate() {
                m.set(i, j, self.get(r, c));
            }
        }
        m
    }

    /// Copies out a contiguous sub-matrix.
    pub fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Self {
        assert!(rows.end <= self.rows && cols.end <= self.cols);
        let mut m = Self::zeros(rows.len(), cols.len());
        for (i, r) in rows.clone().enumerate() {
            for (j, c) in cols.clone().enumerate() {
                m.set(i, j, self.get(r, c));
            }
        }
        m
    }

    pub fn mat_mat(&self, b: &Self) -> Self
    where
        T: Mul<Output = T> + AddAssign,
    {
        assert_eq!(
            self.cols, b.rows,
            "rows of b {} must equal columns of a {}",
            b.rows, self.cols
        );
        let mut c = Self::zeros(self.rows, b.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a_ik = self.get(i, k);
                for j in 0..b.cols {
                    c.add(i, j, a_ik * b.get(k, j));
                }
            }
        }
        c
    }

    pub fn sub(&self, b: &Self) -> Self
    where
        T: Sub<Output = T>,
    {
        assert_eq!(self.shape(), b.shape());
        let mut c = Self::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            for j in 0..self.cols {
                c.set(i, j, self.get(i, j) - b.get(i, j));
            }
        }
        c
    }
}

impl Mat<Complex64> {
    /// Inverts the matrix by Gauss-Jordan elimination with partial
    /// (largest modulus) pivoting.
    ///
    /// A zero pivot column means the matrix is singular, which for an
    /// admittance sub-matrix indicates a floating or disconnected bus.
    pub fn inverse(&self) -> Result<Self> {
        assert_eq!(self.rows, self.cols);
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Self::identity(n);

        for col in 0..n {
            // pivot: remaining row with the largest modulus in this column
            let mut pivot = col;
            let mut pivot_norm = a.get(col, col).norm();
            for r in col + 1..n {
                let norm = a.get(r, col).norm();
                if norm > pivot_norm {
                    pivot = r;
                    pivot_norm = norm;
                }
            }
            if pivot_norm == 0.0 {
                return Err(Error::SingularNetwork);
            }
            if pivot != col {
                a.swap_rows(col, pivot);
                inv.swap_rows(col, pivot);
            }

            let d = a.get(col, col);
            for j in 0..n {
                a.set(col, j, a.get(col, j) / d);
                inv.set(col, j, inv.get(col, j) / d);
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let f = a.get(r, col);
                if f.is_zero() {
                    continue;
                }
                for j in 0..n {
                    let av = a.get(col, j);
                    let iv = inv.get(col, j);
                    a.add(r, j, -f * av);
                    inv.add(r, j, -f * iv);
                }
            }
        }
        Ok(inv)
    }

    fn swap_rows(&mut self, r1: usize, r2: usize) {
        for j in 0..self.cols {
            let a = self.ix(r1, j);
            let b = self.ix(r2, j);
            self.values.swap(a, b);
        }
    }
}
