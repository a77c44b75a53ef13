//! Cauchy coding matrices over GF(2^w)
//!
//! A coding matrix has M rows (one per parity block) of K entries (one per
//! data block). Every square submatrix of a Cauchy matrix is invertible, which
//! is what lets any M erasures be recovered.
//!
//! Factories implement [`MatrixFactory`]; the coding context picks one at
//! construction time from [`MatrixKind`](crate::config::MatrixKind).

use crate::error::{CodingError, Result};
use crate::galois::GaloisField;
use rustc_hash::FxHashSet as HashSet;
use std::fmt;

// ============================================================================
// Coding Matrix
// ============================================================================

/// Row-major M×K matrix of GF(2^w) elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingMatrix {
    k: usize,
    m: usize,
    w: u32,
    data: Vec<u32>,
}

impl CodingMatrix {
    /// Create a zero matrix
    pub fn new(k: usize, m: usize, w: u32) -> Self {
        Self {
            k,
            m,
            w,
            data: vec![0; k * m],
        }
    }

    /// Wrap row-major data, checking its length and that every entry is a
    /// member of GF(2^w)
    pub fn from_rows(k: usize, m: usize, w: u32, data: Vec<u32>) -> Result<Self> {
        if data.len() != k * m {
            return Err(CodingError::MalformedMatrix(format!(
                "expected {}x{} = {} entries, got {}",
                m,
                k,
                k * m,
                data.len()
            )));
        }
        if let Some(bad) = data.iter().find(|&&v| (v as u64) >= 1u64 << w) {
            return Err(CodingError::MalformedMatrix(format!(
                "entry {} does not fit in {} bits",
                bad, w
            )));
        }
        Ok(Self { k, m, w, data })
    }

    /// Number of data columns (K)
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of parity rows (M)
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn w(&self) -> u32 {
        self.w
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.data[row * self.k + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        self.data[row * self.k + col] = value;
    }

    pub fn row(&self, row: usize) -> &[u32] {
        &self.data[row * self.k..(row + 1) * self.k]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Total ones in the bitmatrix this matrix expands to
    pub fn bitmatrix_ones(&self, field: &GaloisField) -> u64 {
        self.data.iter().map(|&e| field.n_ones(e) as u64).sum()
    }

    /// Scale columns and rows so the expanded bitmatrix gets sparser
    ///
    /// Every column is divided by its row-0 entry, making row 0 all ones.
    /// Each later row is then divided by whichever of its entries minimises
    /// the row's bitmatrix ones. Row and column scaling keep every square
    /// submatrix invertible.
    pub fn improve(&mut self, field: &GaloisField) -> Result<()> {
        for col in 0..self.k {
            let top = self.get(0, col);
            if top != 1 {
                let scale = field.inverse(top).ok_or_else(|| {
                    CodingError::MalformedMatrix(format!("zero entry at (0, {})", col))
                })?;
                for row in 0..self.m {
                    let scaled = field.multiply(self.get(row, col), scale);
                    self.set(row, col, scaled);
                }
            }
        }

        for row in 1..self.m {
            let mut best_ones: u32 = self.row(row).iter().map(|&e| field.n_ones(e)).sum();
            let mut best_scale = None;

            for &candidate in self.row(row) {
                if candidate == 1 {
                    continue;
                }
                let scale = field.inverse(candidate).ok_or_else(|| {
                    CodingError::MalformedMatrix(format!("zero entry in row {}", row))
                })?;
                let ones: u32 = self
                    .row(row)
                    .iter()
                    .map(|&e| field.n_ones(field.multiply(e, scale)))
                    .sum();
                if ones < best_ones {
                    best_ones = ones;
                    best_scale = Some(scale);
                }
            }

            if let Some(scale) = best_scale {
                for col in 0..self.k {
                    let scaled = field.multiply(self.get(row, col), scale);
                    self.set(row, col, scaled);
                }
            }
        }

        Ok(())
    }

    /// Whether the square submatrix picked by `rows` × `cols` is non-singular
    pub fn is_submatrix_invertible(
        &self,
        field: &GaloisField,
        rows: &[usize],
        cols: &[usize],
    ) -> bool {
        if rows.len() != cols.len() {
            return false;
        }
        let n = rows.len();
        let mut sub = Vec::with_capacity(n * n);
        for &r in rows {
            for &c in cols {
                sub.push(self.get(r, c));
            }
        }
        invert_matrix(field, &sub, n).is_some()
    }
}

impl fmt::Display for CodingMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = (self.w as usize).div_ceil(4).max(1) + 1;
        for row in 0..self.m {
            for (col, value) in self.row(row).iter().enumerate() {
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>width$}", value, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Invert an n×n row-major matrix over GF(2^w) by Gauss-Jordan elimination
///
/// Returns `None` if the matrix is singular.
pub fn invert_matrix(field: &GaloisField, matrix: &[u32], n: usize) -> Option<Vec<u32>> {
    if matrix.len() != n * n {
        return None;
    }

    let mut left = matrix.to_vec();
    let mut inverse = vec![0u32; n * n];
    for i in 0..n {
        inverse[i * n + i] = 1;
    }

    for col in 0..n {
        // Find a pivot and swap it into place
        let pivot_row = (col..n).find(|&r| left[r * n + col] != 0)?;
        if pivot_row != col {
            for c in 0..n {
                left.swap(col * n + c, pivot_row * n + c);
                inverse.swap(col * n + c, pivot_row * n + c);
            }
        }

        // Scale row to make pivot = 1
        let pivot = left[col * n + col];
        if pivot != 1 {
            let scale = field.inverse(pivot)?;
            for c in 0..n {
                left[col * n + c] = field.multiply(left[col * n + c], scale);
                inverse[col * n + c] = field.multiply(inverse[col * n + c], scale);
            }
        }

        // Eliminate other rows
        for other in 0..n {
            if other == col {
                continue;
            }
            let factor = left[other * n + col];
            if factor == 0 {
                continue;
            }
            for c in 0..n {
                left[other * n + c] ^= field.multiply(left[col * n + c], factor);
                inverse[other * n + c] ^= field.multiply(inverse[col * n + c], factor);
            }
        }
    }

    Some(inverse)
}

// ============================================================================
// Matrix Factories
// ============================================================================

/// Strategy for producing a K×M coding matrix from seed values
pub trait MatrixFactory {
    fn produce(&self, field: &GaloisField, k: usize, m: usize, seed: &[u32])
        -> Result<CodingMatrix>;
}

/// Plain Cauchy matrix: entry (i, j) = 1 / (X_i + Y_j)
///
/// Seed layout is `[Y_0..Y_{k-1}, X_0..X_{m-1}]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CauchyMatrixFactory;

/// Extended Cauchy matrix: entry (i, j) = R_i · S_j / (X_i + Y_j)
///
/// Seed layout is `[Y_0..Y_{k-1}, X_0..X_{m-1}, S_0..S_{k-1}, R_0..R_{m-1}]`.
/// Nonzero row and column factors keep the Cauchy invertibility property.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedCauchyMatrixFactory;

/// Seedless Cauchy matrix with X_i = i and Y_j = m + j
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalCauchyMatrixFactory;

impl MatrixFactory for CauchyMatrixFactory {
    fn produce(
        &self,
        field: &GaloisField,
        k: usize,
        m: usize,
        seed: &[u32],
    ) -> Result<CodingMatrix> {
        check_dimensions(field, k, m)?;
        check_seed_length(seed, k + m, "Cauchy")?;
        let (y, x) = seed.split_at(k);
        check_xy(field, x, y)?;
        cauchy_xy(field, k, m, x, y, None)
    }
}

impl MatrixFactory for ExtendedCauchyMatrixFactory {
    fn produce(
        &self,
        field: &GaloisField,
        k: usize,
        m: usize,
        seed: &[u32],
    ) -> Result<CodingMatrix> {
        check_dimensions(field, k, m)?;
        check_seed_length(seed, 2 * (k + m), "extended Cauchy")?;
        let (y, rest) = seed.split_at(k);
        let (x, rest) = rest.split_at(m);
        let (s, r) = rest.split_at(k);
        check_xy(field, x, y)?;
        check_scales(field, r, "R")?;
        check_scales(field, s, "S")?;
        cauchy_xy(field, k, m, x, y, Some((r, s)))
    }
}

impl MatrixFactory for OriginalCauchyMatrixFactory {
    fn produce(
        &self,
        field: &GaloisField,
        k: usize,
        m: usize,
        _seed: &[u32],
    ) -> Result<CodingMatrix> {
        check_dimensions(field, k, m)?;
        let x: Vec<u32> = (0..m).map(|i| i as u32).collect();
        let y: Vec<u32> = (m..m + k).map(|j| j as u32).collect();
        cauchy_xy(field, k, m, &x, &y, None)
    }
}

fn cauchy_xy(
    field: &GaloisField,
    k: usize,
    m: usize,
    x: &[u32],
    y: &[u32],
    scales: Option<(&[u32], &[u32])>,
) -> Result<CodingMatrix> {
    let mut matrix = CodingMatrix::new(k, m, field.w());
    for (i, &xi) in x.iter().enumerate() {
        for (j, &yj) in y.iter().enumerate() {
            let numerator = match scales {
                Some((r, s)) => field.multiply(r[i], s[j]),
                None => 1,
            };
            let entry = field.divide(numerator, field.add(xi, yj)).ok_or_else(|| {
                CodingError::InvalidParameters(format!(
                    "X[{}] and Y[{}] are both {}",
                    i, j, xi
                ))
            })?;
            matrix.set(i, j, entry);
        }
    }
    Ok(matrix)
}

fn check_dimensions(field: &GaloisField, k: usize, m: usize) -> Result<()> {
    if k == 0 || m == 0 {
        return Err(CodingError::InvalidParameters(format!(
            "k = {} and m = {} must both be at least 1",
            k, m
        )));
    }
    if (k + m) as u64 > field.order() {
        return Err(CodingError::InvalidParameters(format!(
            "w = {} cannot hold {} distinct seed values",
            field.w(),
            k + m
        )));
    }
    Ok(())
}

fn check_seed_length(seed: &[u32], expected: usize, variant: &str) -> Result<()> {
    if seed.len() != expected {
        return Err(CodingError::InvalidParameters(format!(
            "{} seed needs {} values, got {}",
            variant,
            expected,
            seed.len()
        )));
    }
    Ok(())
}

/// X and Y must be field members, distinct within themselves, and disjoint
fn check_xy(field: &GaloisField, x: &[u32], y: &[u32]) -> Result<()> {
    let mut seen: HashSet<u32> = HashSet::default();
    for &v in x.iter().chain(y) {
        if !field.contains(v) {
            return Err(CodingError::InvalidParameters(format!(
                "seed value {} does not fit in {} bits",
                v,
                field.w()
            )));
        }
        if !seen.insert(v) {
            return Err(CodingError::InvalidParameters(format!(
                "seed value {} repeats; X and Y must be distinct and disjoint",
                v
            )));
        }
    }
    Ok(())
}

fn check_scales(field: &GaloisField, scales: &[u32], name: &str) -> Result<()> {
    for (i, &v) in scales.iter().enumerate() {
        if v == 0 || !field.contains(v) {
            return Err(CodingError::InvalidParameters(format!(
                "{}[{}] = {} must be a nonzero field element",
                name, i, v
            )));
        }
    }
    Ok(())
}
