//! Arbitrary-size dense matrices and vectors
//!
//! # Example
//!
//! ```
//! use rayo::math::MatX;
//!
//! let m = MatX::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(m.rows(), 2);
//! assert_eq!(m.cols(), 3);
//! assert_eq!(m.get(1, 0), Some(&4.0));
//! ```

use std::ops::{Index, IndexMut};

use crate::random::SeededRandom;
use crate::{RayoError, Result};

/// A dense matrix with row-major storage
///
/// For a 2x3 matrix:
/// ```text
/// [[a, b, c],
///  [d, e, f]]
/// ```
/// Data is stored as: [a, b, c, d, e, f]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatX {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl MatX {
    /// Zero-filled `rows x cols` matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        MatX {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates a matrix from row-major data
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if `data.len() != rows * cols`
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(RayoError::SizeMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(MatX { rows, cols, data })
    }

    /// Matrix with entries uniformly drawn from `[lo, hi)` by a generator seeded with `seed`
    ///
    /// Entries are drawn in storage order, so equal arguments give equal matrices.
    pub fn random(rows: usize, cols: usize, seed: u32, lo: f32, hi: f32) -> Self {
        let mut rnd = SeededRandom::new(seed);
        let range = hi - lo;
        let data = (0..rows * cols)
            .map(|_| lo + rnd.random_float() * range)
            .collect();
        MatX { rows, cols, data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at `(row, col)`, or `None` out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<&f32> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// One row as a slice
    #[inline]
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// One row as a mutable slice
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Resize to `rows x cols`, zero-filling
    pub fn set_size(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, 0.0);
    }

    /// Same shape and every element within `epsilon`
    pub fn compare(&self, other: &Self, epsilon: f32) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Index<(usize, usize)> for MatX {
    type Output = f32;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        debug_assert!(col < self.cols);
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for MatX {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        debug_assert!(col < self.cols);
        &mut self.data[row * self.cols + col]
    }
}

/// A dense vector of arbitrary length
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VecX {
    data: Vec<f32>,
}

impl VecX {
    /// Zero-filled vector of length `len`
    pub fn zeros(len: usize) -> Self {
        VecX {
            data: vec![0.0; len],
        }
    }

    pub fn from_vec(data: Vec<f32>) -> Self {
        VecX { data }
    }

    /// Vector with entries uniformly drawn from `[lo, hi)`
    pub fn random(len: usize, seed: u32, lo: f32, hi: f32) -> Self {
        let mut rnd = SeededRandom::new(seed);
        let range = hi - lo;
        VecX {
            data: (0..len).map(|_| lo + rnd.random_float() * range).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Resize to `len`, zero-filling
    pub fn set_size(&mut self, len: usize) {
        self.data.clear();
        self.data.resize(len, 0.0);
    }

    /// Same length and every element within `epsilon`
    pub fn compare(&self, other: &Self, epsilon: f32) -> bool {
        self.len() == other.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Index<usize> for VecX {
    type Output = f32;

    #[inline]
    fn index(&self, i: usize) -> &f32 {
        &self.data[i]
    }
}

impl IndexMut<usize> for VecX {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.data[i]
    }
}
