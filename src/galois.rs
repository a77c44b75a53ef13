//! Galois Field GF(2^w) arithmetic for Cauchy coding matrices
//!
//! Supports every word size from 1 to 32 bits. Fields up to 16 bits use
//! precomputed log/antilog tables; wider fields use shift-and-add
//! multiplication.
//!
//! The reduction polynomials are the customary primitive polynomials for
//! each word size, so a seed produces the same matrix as other Cauchy
//! Reed-Solomon coders that use them.

use crate::error::{CodingError, Result};
use std::sync::OnceLock;

/// Largest supported word size
pub const MAX_WORD_SIZE: u32 = 32;

/// Largest word size that gets log/antilog tables
const TABLE_WORD_SIZE_LIMIT: u32 = 16;

/// Primitive polynomials indexed by word size, including the x^w term
const PRIMITIVE_POLYNOMIALS: [u64; 33] = [
    0,
    0x3,
    0x7,
    0xB,
    0x13,
    0x25,
    0x43,
    0x89,
    0x11D,
    0x211,
    0x409,
    0x805,
    0x1053,
    0x201B,
    0x4443,
    0x8003,
    0x1100B,
    0x20009,
    0x40081,
    0x80027,
    0x100009,
    0x200005,
    0x400003,
    0x800021,
    0x1000087,
    0x2000009,
    0x4000047,
    0x8000027,
    0x10000009,
    0x20000005,
    0x40800007,
    0x80000009,
    0x100400007,
];

/// Log and antilog tables for a single field
struct LogTables {
    log: Vec<u32>,
    /// 2x size to avoid modulo in multiplication and division
    antilog: Vec<u32>,
    limit: usize,
}

impl LogTables {
    /// Build tables using x as the generator. Returns `None` if the
    /// polynomial turns out not to be primitive.
    fn build(w: u32, polynomial: u64) -> Option<Self> {
        let count = 1usize << w;
        let limit = count - 1;
        let mut log = vec![0u32; count];
        let mut antilog = vec![0u32; limit * 2];

        let mut b = 1u64;
        for l in 0..limit {
            if l > 0 && b == 1 {
                return None;
            }
            log[b as usize] = l as u32;
            antilog[l] = b as u32;
            antilog[l + limit] = b as u32;

            b <<= 1;
            if b & count as u64 != 0 {
                b ^= polynomial;
            }
        }

        Some(Self {
            log,
            antilog,
            limit,
        })
    }
}

/// Arithmetic over GF(2^w)
pub struct GaloisField {
    w: u32,
    polynomial: u64,
    tables: Option<LogTables>,
}

impl std::fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaloisField")
            .field("w", &self.w)
            .field("polynomial", &format_args!("{:#x}", self.polynomial))
            .field("tables", &self.tables.is_some())
            .finish()
    }
}

impl GaloisField {
    /// Create the field GF(2^w), building lookup tables for small word sizes
    pub fn new(w: u32) -> Result<Self> {
        if w == 0 || w > MAX_WORD_SIZE {
            return Err(CodingError::InvalidParameters(format!(
                "word size {} must be between 1 and {}",
                w, MAX_WORD_SIZE
            )));
        }

        let polynomial = PRIMITIVE_POLYNOMIALS[w as usize];
        let tables = if w <= TABLE_WORD_SIZE_LIMIT {
            LogTables::build(w, polynomial)
        } else {
            None
        };

        Ok(Self {
            w,
            polynomial,
            tables,
        })
    }

    /// Word size in bits
    #[inline]
    pub fn w(&self) -> u32 {
        self.w
    }

    /// Number of field elements (2^w)
    #[inline]
    pub fn order(&self) -> u64 {
        1u64 << self.w
    }

    /// Whether `value` is a member of this field
    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        (value as u64) < self.order()
    }

    /// Add two elements - this is just XOR
    #[inline]
    pub fn add(&self, a: u32, b: u32) -> u32 {
        a ^ b
    }

    /// Multiply two elements
    #[inline]
    pub fn multiply(&self, a: u32, b: u32) -> u32 {
        if a == 0 || b == 0 {
            return 0;
        }

        match &self.tables {
            Some(t) => t.antilog[t.log[a as usize] as usize + t.log[b as usize] as usize],
            None => self.shift_multiply(a, b),
        }
    }

    fn shift_multiply(&self, a: u32, b: u32) -> u32 {
        let top = 1u64 << self.w;
        let mut a = a as u64;
        let mut b = b;
        let mut product = 0u64;

        while b != 0 {
            if b & 1 != 0 {
                product ^= a;
            }
            b >>= 1;
            a <<= 1;
            if a & top != 0 {
                a ^= self.polynomial;
            }
        }

        product as u32
    }

    /// Multiplicative inverse, `None` for zero
    pub fn inverse(&self, a: u32) -> Option<u32> {
        if a == 0 {
            return None;
        }

        match &self.tables {
            Some(t) => Some(t.antilog[t.limit - t.log[a as usize] as usize]),
            // a^(2^w - 2) = a^-1
            None => Some(self.pow(a, self.order() - 2)),
        }
    }

    /// Divide `a` by `b`, `None` when `b` is zero
    pub fn divide(&self, a: u32, b: u32) -> Option<u32> {
        if b == 0 {
            return None;
        }
        if a == 0 {
            return Some(0);
        }

        match &self.tables {
            Some(t) => {
                let log_result = t.log[a as usize] as usize + t.limit - t.log[b as usize] as usize;
                Some(t.antilog[log_result])
            }
            None => self.inverse(b).map(|inv| self.shift_multiply(a, inv)),
        }
    }

    /// Raise an element to a power by repeated squaring
    pub fn pow(&self, base: u32, mut exponent: u64) -> u32 {
        let mut result = 1u32;
        let mut square = base;

        while exponent != 0 {
            if exponent & 1 != 0 {
                result = self.multiply(result, square);
            }
            square = self.multiply(square, square);
            exponent >>= 1;
        }

        result
    }

    /// Number of ones in the w×w bitmatrix representing "multiply by `e`"
    ///
    /// Column x of that bitmatrix holds the bits of e·2^x, so the count is the
    /// total popcount over those w products.
    pub fn n_ones(&self, e: u32) -> u32 {
        let mut ones = 0;
        let mut column = e;
        for _ in 0..self.w {
            ones += column.count_ones();
            column = self.times_x(column);
        }
        ones
    }

    /// Multiply by the generator x (the element 2 for w > 1)
    #[inline]
    pub fn times_x(&self, a: u32) -> u32 {
        let mut shifted = (a as u64) << 1;
        if shifted & self.order() != 0 {
            shifted ^= self.polynomial;
        }
        shifted as u32
    }
}

/// Lazily built fields, one slot per word size
static FIELDS: [OnceLock<GaloisField>; MAX_WORD_SIZE as usize + 1] =
    [const { OnceLock::new() }; MAX_WORD_SIZE as usize + 1];

/// Get the shared field instance for word size `w`
pub fn galois_field(w: u32) -> Result<&'static GaloisField> {
    if w == 0 || w > MAX_WORD_SIZE {
        return Err(CodingError::InvalidParameters(format!(
            "word size {} must be between 1 and {}",
            w, MAX_WORD_SIZE
        )));
    }

    let slot = &FIELDS[w as usize];
    if let Some(field) = slot.get() {
        return Ok(field);
    }
    let field = GaloisField::new(w)?;
    Ok(slot.get_or_init(|| field))
}
