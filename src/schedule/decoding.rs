//! Decoding schedule generation
//!
//! For an erasure set, pick K surviving blocks as sources: every intact data
//! block, plus enough intact parity blocks to stand in for the erased data
//! blocks. The erased data blocks are then the inverse of the source
//! relation applied to the sources, and each erased parity block is its
//! bitmatrix rows rewritten in terms of the sources.

use super::compiler::compile;
use super::ops::Schedule;
use crate::bitmatrix::BitMatrix;
use crate::config::SchedulingMode;
use crate::erasure::ErasureSet;
use crate::error::{CodingError, Result};
use log::trace;

/// Compiled schedule that rebuilds one erasure pattern
///
/// The schedule reads `sources.len()` devices and writes `targets.len()`
/// devices. Device numbers here are block indices: data blocks `0..k`,
/// parity blocks `k..k + m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodingSchedule {
    schedule: Schedule,
    sources: Vec<usize>,
    targets: Vec<usize>,
    erasures: ErasureSet,
}

impl DecodingSchedule {
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Block indices read by the schedule, in input order
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Block indices rebuilt by the schedule, in output order
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn erasures(&self) -> &ErasureSet {
        &self.erasures
    }

    /// True when nothing is erased and decoding has nothing to do
    pub fn is_noop(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Build the decoding schedule for `erasures` against an encoding bitmatrix
pub fn generate(
    bitmatrix: &BitMatrix,
    k: usize,
    m: usize,
    w: u32,
    erasures: &ErasureSet,
    mode: SchedulingMode,
) -> Result<DecodingSchedule> {
    let wu = w as usize;
    if bitmatrix.rows() != m * wu || bitmatrix.cols() != k * wu {
        return Err(CodingError::MalformedMatrix(format!(
            "bitmatrix is {}x{}, expected {}x{}",
            bitmatrix.rows(),
            bitmatrix.cols(),
            m * wu,
            k * wu
        )));
    }
    if erasures.k() != k || erasures.m() != m {
        return Err(CodingError::InvalidParameters(format!(
            "erasure set built for k={} m={}, context has k={} m={}",
            erasures.k(),
            erasures.m(),
            k,
            m
        )));
    }
    if erasures.len() > m {
        return Err(CodingError::UnrecoverableErasure(format!(
            "{} erasures but only {} parity blocks",
            erasures.len(),
            m
        )));
    }

    if erasures.is_empty() {
        return Ok(DecodingSchedule {
            schedule: Schedule::new(k, 0, w),
            sources: (0..k).collect(),
            targets: Vec::new(),
            erasures: erasures.clone(),
        });
    }

    let (row_ids, ind_to_row) = assign_rows(k, m, erasures)?;
    let data_erased = erasures.data_erasures().count();
    let parity_erased = erasures.len() - data_erased;
    let outputs = data_erased + parity_erased;

    let mut decoding = BitMatrix::new(outputs * wu, k * wu, w);

    if data_erased > 0 {
        let inverse = source_relation(bitmatrix, k, wu, &row_ids)
            .invert()
            .ok_or_else(|| {
                CodingError::UnrecoverableErasure(format!(
                    "surviving blocks {:?} do not span the data",
                    &row_ids[..k]
                ))
            })?;

        for x in 0..data_erased {
            let block = row_ids[k + x];
            for bit in 0..wu {
                decoding.copy_row_from(x * wu + bit, &inverse, block * wu + bit);
            }
        }
    }

    // Rows for erased data are final; parity rows are rewritten against them
    let recovered = decoding.clone();

    for (offset, drive) in erasures.parity_erasures().enumerate() {
        let parity = drive - k;
        let base = (data_erased + offset) * wu;
        for bit in 0..wu {
            decoding.copy_row_from(base + bit, bitmatrix, parity * wu + bit);
            for data in erasures.data_erasures() {
                decoding.clear_cols(base + bit, data * wu, wu);
            }
        }

        for data in erasures.data_erasures() {
            let first = (ind_to_row[data] - k) * wu;
            for bit in 0..wu {
                for y in 0..wu {
                    if bitmatrix.get(parity * wu + bit, data * wu + y) {
                        decoding.xor_row_from(base + bit, &recovered, first + y);
                    }
                }
            }
        }
    }

    trace!("decoding bitmatrix for {:?}:\n{}", erasures.indices(), decoding);

    let schedule = compile(&decoding, k, outputs, w, mode)?;

    Ok(DecodingSchedule {
        schedule,
        sources: row_ids[..k].to_vec(),
        targets: row_ids[k..k + outputs].to_vec(),
        erasures: erasures.clone(),
    })
}

/// Assign source and target blocks
///
/// `row_ids[..k]` are the sources: data block `i` stands for itself when
/// intact, otherwise the next unused intact parity block takes its place.
/// `row_ids[k..]` lists erased data blocks, then erased parity blocks.
/// `ind_to_row[b]` is the position of block `b` in `row_ids`.
fn assign_rows(k: usize, m: usize, erasures: &ErasureSet) -> Result<(Vec<usize>, Vec<usize>)> {
    let blocks = k + m;
    let mut row_ids = vec![0usize; blocks];
    let mut ind_to_row = vec![0usize; blocks];

    let mut next_parity = k;
    let mut next_target = k;

    for i in 0..k {
        if !erasures.is_erased(i) {
            row_ids[i] = i;
            ind_to_row[i] = i;
            continue;
        }
        while next_parity < blocks && erasures.is_erased(next_parity) {
            next_parity += 1;
        }
        if next_parity >= blocks {
            return Err(CodingError::UnrecoverableErasure(format!(
                "no intact parity block left to replace data block {}",
                i
            )));
        }
        row_ids[i] = next_parity;
        ind_to_row[next_parity] = i;
        next_parity += 1;

        row_ids[next_target] = i;
        ind_to_row[i] = next_target;
        next_target += 1;
    }

    for drive in erasures.parity_erasures() {
        row_ids[next_target] = drive;
        ind_to_row[drive] = next_target;
        next_target += 1;
    }

    Ok((row_ids, ind_to_row))
}

/// The (k·w)×(k·w) relation mapping data blocks to the chosen sources
fn source_relation(bitmatrix: &BitMatrix, k: usize, w: usize, row_ids: &[usize]) -> BitMatrix {
    let mut relation = BitMatrix::new(k * w, k * w, w as u32);
    for (i, &source) in row_ids[..k].iter().enumerate() {
        if source == i {
            for bit in 0..w {
                relation.set(i * w + bit, i * w + bit, true);
            }
        } else {
            let parity = source - k;
            for bit in 0..w {
                relation.copy_row_from(i * w + bit, bitmatrix, parity * w + bit);
            }
        }
    }
    relation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galois::GaloisField;
    use crate::matrix::{MatrixFactory, OriginalCauchyMatrixFactory};

    fn cauchy_bitmatrix(k: usize, m: usize, w: u32) -> BitMatrix {
        let field = GaloisField::new(w).unwrap();
        let matrix = OriginalCauchyMatrixFactory.produce(&field, k, m, &[]).unwrap();
        BitMatrix::from_coding_matrix(&matrix, &field).unwrap()
    }

    #[test]
    fn test_row_assignment() {
        let erasures = ErasureSet::new(4, 2, &[0, 4]).unwrap();
        let (row_ids, ind_to_row) = assign_rows(4, 2, &erasures).unwrap();
        // data 0 replaced by parity 5, then targets: data 0, parity 4
        assert_eq!(row_ids, vec![5, 1, 2, 3, 0, 4]);
        assert_eq!(ind_to_row[0], 4);
        assert_eq!(ind_to_row[5], 0);
        assert_eq!(ind_to_row[4], 5);
    }

    #[test]
    fn test_sources_and_targets() {
        let bitmatrix = cauchy_bitmatrix(4, 2, 4);
        let erasures = ErasureSet::new(4, 2, &[4, 2]).unwrap();
        let decoding = generate(&bitmatrix, 4, 2, 4, &erasures, SchedulingMode::Smart).unwrap();
        assert_eq!(decoding.sources(), &[0, 1, 5, 3]);
        assert_eq!(decoding.targets(), &[2, 4]);
        assert_eq!(decoding.schedule().inputs(), 4);
        assert_eq!(decoding.schedule().outputs(), 2);
        assert!(!decoding.is_noop());
    }

    #[test]
    fn test_parity_only_erasure_reencodes() {
        let bitmatrix = cauchy_bitmatrix(3, 2, 4);
        let erasures = ErasureSet::new(3, 2, &[3]).unwrap();
        let decoding = generate(&bitmatrix, 3, 2, 4, &erasures, SchedulingMode::Dumb).unwrap();
        assert_eq!(decoding.sources(), &[0, 1, 2]);
        assert_eq!(decoding.targets(), &[3]);
        let encode = compile(&bitmatrix, 3, 2, 4, SchedulingMode::Dumb).unwrap();
        assert_eq!(
            decoding.schedule().stats().xors + decoding.schedule().stats().copies,
            encode.ops().iter().filter(|op| op.dst().device == 3).count()
        );
    }

    #[test]
    fn test_empty_erasures_are_noop() {
        let bitmatrix = cauchy_bitmatrix(2, 2, 4);
        let erasures = ErasureSet::new(2, 2, &[]).unwrap();
        let decoding = generate(&bitmatrix, 2, 2, 4, &erasures, SchedulingMode::Smart).unwrap();
        assert!(decoding.is_noop());
        assert!(decoding.schedule().is_empty());
    }

    #[test]
    fn test_singular_relation_is_unrecoverable() {
        // Parity rows identical to data block 1 cannot stand in for block 0
        let mut bitmatrix = BitMatrix::new(4, 4, 2);
        for bit in 0..2 {
            bitmatrix.set(bit, 2 + bit, true);
            bitmatrix.set(2 + bit, 2 + bit, true);
        }
        let erasures = ErasureSet::new(2, 2, &[0]).unwrap();
        assert!(matches!(
            generate(&bitmatrix, 2, 2, 2, &erasures, SchedulingMode::Smart),
            Err(CodingError::UnrecoverableErasure(_))
        ));
    }
}
