//! Erasure sets and their bitmask keys

use crate::error::{CodingError, Result};
use smallvec::SmallVec;
use std::fmt;

const WORD_BITS: usize = 64;

/// Bitmask over block indices `[0, k + m)`, used as the schedule cache key
///
/// Two erasure sets with the same members produce equal patterns no matter
/// what order their indices were given in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ErasurePattern {
    words: SmallVec<[u64; 2]>,
}

impl ErasurePattern {
    /// Empty pattern wide enough for `blocks` indices
    pub fn with_width(blocks: usize) -> Self {
        let mut words = SmallVec::new();
        words.resize(blocks.div_ceil(WORD_BITS).max(1), 0);
        Self { words }
    }

    fn insert(&mut self, index: usize) -> bool {
        let word = &mut self.words[index / WORD_BITS];
        let mask = 1u64 << (index % WORD_BITS);
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|w| w & (1u64 << (index % WORD_BITS)) != 0)
    }

    /// Number of erased blocks
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl fmt::Display for ErasurePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = self.words.iter().rev().skip_while(|&&w| w == 0);
        match words.next() {
            None => write!(f, "0x0"),
            Some(first) => {
                write!(f, "{:#x}", first)?;
                for word in words {
                    write!(f, "{:016x}", word)?;
                }
                Ok(())
            }
        }
    }
}

/// Validated set of erased block indices
///
/// Indices below `k` are data blocks, the rest parity blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErasureSet {
    k: usize,
    m: usize,
    /// Sorted ascending
    indices: Vec<usize>,
    pattern: ErasurePattern,
}

impl ErasureSet {
    /// Validate `indices` against a K+M layout
    ///
    /// Out-of-range or repeated indices are invalid parameters; more than
    /// `m` erasures cannot be recovered.
    pub fn new(k: usize, m: usize, indices: &[usize]) -> Result<Self> {
        let blocks = k + m;
        let mut pattern = ErasurePattern::with_width(blocks);

        for &index in indices {
            if index >= blocks {
                return Err(CodingError::InvalidParameters(format!(
                    "erasure index {} is outside [0, {})",
                    index, blocks
                )));
            }
            if !pattern.insert(index) {
                return Err(CodingError::InvalidParameters(format!(
                    "erasure index {} listed more than once",
                    index
                )));
            }
        }

        if indices.len() > m {
            return Err(CodingError::UnrecoverableErasure(format!(
                "{} erasures but only {} parity blocks",
                indices.len(),
                m
            )));
        }

        let mut sorted = indices.to_vec();
        sorted.sort_unstable();

        Ok(Self {
            k,
            m,
            indices: sorted,
            pattern,
        })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn pattern(&self) -> &ErasurePattern {
        &self.pattern
    }

    #[inline]
    pub fn is_erased(&self, index: usize) -> bool {
        self.pattern.contains(index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Erased data block indices, ascending
    pub fn data_erasures(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied().filter(|&i| i < self.k)
    }

    /// Erased parity block indices (as block indices, not parity offsets), ascending
    pub fn parity_erasures(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied().filter(|&i| i >= self.k)
    }
}
