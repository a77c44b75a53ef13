//! Binary matrices over GF(2)
//!
//! A coding matrix expands into a bitmatrix by replacing every GF(2^w) entry
//! with the w×w binary matrix of "multiply by that entry". Row `r` of the
//! result then says which input packets XOR together into output packet `r`.
//!
//! Rows are packed into `u64` words so row XORs and distance counts run a
//! word at a time.

use crate::error::{CodingError, Result};
use crate::galois::GaloisField;
use crate::matrix::CodingMatrix;
use std::fmt;

const WORD_BITS: usize = 64;

/// Packed binary matrix with a fixed row stride
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    /// Word size used to group rows and columns when printing
    w: u32,
    stride: usize,
    words: Vec<u64>,
}

impl BitMatrix {
    /// Create an all-zero matrix
    pub fn new(rows: usize, cols: usize, w: u32) -> Self {
        let stride = cols.div_ceil(WORD_BITS);
        Self {
            rows,
            cols,
            w,
            stride,
            words: vec![0; rows * stride],
        }
    }

    /// Create an n×n identity matrix
    pub fn identity(n: usize, w: u32) -> Self {
        let mut matrix = Self::new(n, n, w);
        for i in 0..n {
            matrix.set(i, i, true);
        }
        matrix
    }

    /// Expand a coding matrix into its (M·w)×(K·w) bitmatrix
    ///
    /// Column x of the block for element e holds the bits of e·2^x, bit l in
    /// row l.
    pub fn from_coding_matrix(matrix: &CodingMatrix, field: &GaloisField) -> Result<Self> {
        if matrix.w() != field.w() {
            return Err(CodingError::MalformedMatrix(format!(
                "matrix word size {} does not match field word size {}",
                matrix.w(),
                field.w()
            )));
        }
        if matrix.k() == 0 || matrix.m() == 0 {
            return Err(CodingError::MalformedMatrix(format!(
                "cannot expand a {}x{} matrix",
                matrix.m(),
                matrix.k()
            )));
        }

        let w = field.w() as usize;
        let mut bitmatrix = Self::new(matrix.m() * w, matrix.k() * w, field.w());

        for i in 0..matrix.m() {
            for j in 0..matrix.k() {
                let mut element = matrix.get(i, j);
                for x in 0..w {
                    for l in 0..w {
                        if element & (1 << l) != 0 {
                            bitmatrix.set(i * w + l, j * w + x, true);
                        }
                    }
                    element = field.times_x(element);
                }
            }
        }

        Ok(bitmatrix)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn w(&self) -> u32 {
        self.w
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        debug_assert!(row < self.rows && col < self.cols);
        self.words[row * self.stride + col / WORD_BITS] & (1 << (col % WORD_BITS)) != 0
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        debug_assert!(row < self.rows && col < self.cols);
        let word = &mut self.words[row * self.stride + col / WORD_BITS];
        let mask = 1 << (col % WORD_BITS);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Packed words of one row
    #[inline]
    pub fn row_words(&self, row: usize) -> &[u64] {
        &self.words[row * self.stride..(row + 1) * self.stride]
    }

    #[inline]
    fn row_words_mut(&mut self, row: usize) -> &mut [u64] {
        &mut self.words[row * self.stride..(row + 1) * self.stride]
    }

    /// Set columns of a row, in ascending order
    pub fn row_ones(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.row_words(row)
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                let mut remaining = word;
                std::iter::from_fn(move || {
                    if remaining == 0 {
                        return None;
                    }
                    let bit = remaining.trailing_zeros() as usize;
                    remaining &= remaining - 1;
                    Some(word_index * WORD_BITS + bit)
                })
            })
    }

    /// Number of set bits in a row
    pub fn row_count(&self, row: usize) -> usize {
        self.row_words(row)
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    /// Number of columns where two rows differ
    pub fn row_distance(&self, a: usize, b: usize) -> usize {
        self.row_words(a)
            .iter()
            .zip(self.row_words(b))
            .map(|(x, y)| (x ^ y).count_ones() as usize)
            .sum()
    }

    /// Columns set in row `a` but not in row `b`, or vice versa, ascending
    pub fn row_difference(&self, a: usize, b: usize) -> Vec<usize> {
        let mut diff = Vec::new();
        for (word_index, (x, y)) in self.row_words(a).iter().zip(self.row_words(b)).enumerate() {
            let mut remaining = x ^ y;
            while remaining != 0 {
                diff.push(word_index * WORD_BITS + remaining.trailing_zeros() as usize);
                remaining &= remaining - 1;
            }
        }
        diff
    }

    /// Total set bits
    pub fn ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Overwrite row `dst` with row `src_row` of `src`
    pub fn copy_row_from(&mut self, dst: usize, src: &BitMatrix, src_row: usize) {
        debug_assert_eq!(self.cols, src.cols);
        let stride = self.stride;
        self.words[dst * stride..(dst + 1) * stride].copy_from_slice(src.row_words(src_row));
    }

    /// XOR row `src_row` of `src` into row `dst`
    pub fn xor_row_from(&mut self, dst: usize, src: &BitMatrix, src_row: usize) {
        debug_assert_eq!(self.cols, src.cols);
        for (d, s) in self.row_words_mut(dst).iter_mut().zip(src.row_words(src_row)) {
            *d ^= *s;
        }
    }

    /// XOR row `src` into row `dst` of the same matrix
    fn xor_rows(&mut self, dst: usize, src: usize) {
        for i in 0..self.stride {
            let s = self.words[src * self.stride + i];
            self.words[dst * self.stride + i] ^= s;
        }
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for i in 0..self.stride {
            self.words.swap(a * self.stride + i, b * self.stride + i);
        }
    }

    /// Clear `count` columns of a row starting at `start`
    pub fn clear_cols(&mut self, row: usize, start: usize, count: usize) {
        for col in start..start + count {
            self.set(row, col, false);
        }
    }

    /// Invert a square matrix by Gauss-Jordan elimination over GF(2)
    ///
    /// Returns `None` if the matrix is singular.
    pub fn invert(&self) -> Option<BitMatrix> {
        if self.rows != self.cols {
            return None;
        }
        let n = self.rows;
        let mut left = self.clone();
        let mut inverse = BitMatrix::identity(n, self.w);

        for col in 0..n {
            let pivot = (col..n).find(|&r| left.get(r, col))?;
            left.swap_rows(col, pivot);
            inverse.swap_rows(col, pivot);

            for row in 0..n {
                if row != col && left.get(row, col) {
                    left.xor_rows(row, col);
                    inverse.xor_rows(row, col);
                }
            }
        }

        Some(inverse)
    }
}

impl fmt::Display for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = (self.w as usize).max(1);
        for row in 0..self.rows {
            if row > 0 && row % group == 0 {
                writeln!(f)?;
            }
            for col in 0..self.cols {
                if col > 0 && col % group == 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", if self.get(row, col) { '1' } else { '0' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
