//! Configuration for coding contexts

use crate::error::{CodingError, Result};
use crate::galois::MAX_WORD_SIZE;

/// How a bitmatrix is compiled into a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingMode {
    /// One copy plus one XOR per remaining set bit, row by row
    Dumb,
    /// Reuse already computed output rows when that needs fewer operations
    #[default]
    Smart,
}

/// Which coding matrix factory builds the context's matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixKind {
    /// 1/(X_i + Y_j) from a caller seed of K+M values
    #[default]
    Cauchy,
    /// R_i·S_j/(X_i + Y_j) from a caller seed of 2(K+M) values
    ExtendedCauchy,
    /// Seedless Cauchy matrix with X_i = i and Y_j = M + j
    OriginalCauchy,
}

/// Relative cost of schedule operations, used for cost estimates only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWeights {
    pub copy: u64,
    pub xor: u64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self { copy: 1, xor: 1 }
    }
}

/// Parameters for a coding context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingConfig {
    /// Number of data blocks
    pub k: usize,
    /// Number of parity blocks
    pub m: usize,
    /// Word size in bits
    pub w: u32,
    /// Bytes per packet; a block is `w` packets
    pub packet_size: usize,
    pub mode: SchedulingMode,
    /// Run the matrix improvement pass before expansion
    pub improve: bool,
    pub matrix: MatrixKind,
    /// Seed values for the matrix factory (empty = default seed)
    pub seed: Vec<u32>,
    pub weights: CostWeights,
}

impl Default for CodingConfig {
    fn default() -> Self {
        Self {
            k: 4,
            m: 2,
            w: 8,
            packet_size: 8,
            mode: SchedulingMode::Smart,
            improve: false,
            matrix: MatrixKind::Cauchy,
            seed: Vec::new(),
            weights: CostWeights::default(),
        }
    }
}

impl CodingConfig {
    pub fn new(k: usize, m: usize, w: u32, packet_size: usize) -> Self {
        Self {
            k,
            m,
            w,
            packet_size,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: SchedulingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_improve(mut self, improve: bool) -> Self {
        self.improve = improve;
        self
    }

    pub fn with_matrix(mut self, matrix: MatrixKind) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_seed(mut self, seed: Vec<u32>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_weights(mut self, weights: CostWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Bytes per block (`w` packets)
    pub fn block_size(&self) -> usize {
        self.packet_size * self.w as usize
    }

    /// Bytes of data consumed by one `encode` call
    pub fn stripe_size(&self) -> usize {
        self.block_size() * self.k
    }

    /// Check the structural parameters (seed shape is checked by the factory)
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(CodingError::InvalidParameters(
                "k must be at least 1".to_string(),
            ));
        }
        if self.m == 0 {
            return Err(CodingError::InvalidParameters(
                "m must be at least 1".to_string(),
            ));
        }
        if self.w == 0 || self.w > MAX_WORD_SIZE {
            return Err(CodingError::InvalidParameters(format!(
                "w = {} must be between 1 and {}",
                self.w, MAX_WORD_SIZE
            )));
        }
        if (self.k + self.m) as u64 > 1u64 << self.w {
            return Err(CodingError::InvalidParameters(format!(
                "k + m = {} exceeds 2^w = {}",
                self.k + self.m,
                1u64 << self.w
            )));
        }
        if self.packet_size == 0 {
            return Err(CodingError::InvalidParameters(
                "packet_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Seed handed to the factory: the configured one, or a default
    /// that yields the original Cauchy matrix for the chosen kind
    pub fn effective_seed(&self) -> Vec<u32> {
        if !self.seed.is_empty() {
            return self.seed.clone();
        }

        // Columns take Y_j = m + j, rows take X_i = i
        let mut seed: Vec<u32> = (self.m..self.m + self.k).map(|v| v as u32).collect();
        seed.extend((0..self.m).map(|v| v as u32));
        if self.matrix == MatrixKind::ExtendedCauchy {
            seed.extend(std::iter::repeat(1).take(self.k + self.m));
        }
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CodingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_size(), 64);
        assert_eq!(config.stripe_size(), 256);
    }

    #[test]
    fn test_word_size_too_small() {
        // 2^2 = 4 < k + m = 5
        let config = CodingConfig::new(3, 2, 2, 1);
        assert!(matches!(
            config.validate(),
            Err(CodingError::InvalidParameters(_))
        ));
        assert!(CodingConfig::new(2, 2, 2, 1).validate().is_ok());
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert!(CodingConfig::new(0, 2, 8, 1).validate().is_err());
        assert!(CodingConfig::new(2, 0, 8, 1).validate().is_err());
        assert!(CodingConfig::new(2, 2, 8, 0).validate().is_err());
        assert!(CodingConfig::new(2, 2, 0, 1).validate().is_err());
        assert!(CodingConfig::new(2, 2, 33, 1).validate().is_err());
    }

    #[test]
    fn test_default_seed_layout() {
        let config = CodingConfig::new(3, 2, 8, 1);
        assert_eq!(config.effective_seed(), vec![2, 3, 4, 0, 1]);

        let extended = config.clone().with_matrix(MatrixKind::ExtendedCauchy);
        assert_eq!(extended.effective_seed(), vec![2, 3, 4, 0, 1, 1, 1, 1, 1, 1]);

        let explicit = config.with_seed(vec![9, 8, 7, 6, 5]);
        assert_eq!(explicit.effective_seed(), vec![9, 8, 7, 6, 5]);
    }
}
