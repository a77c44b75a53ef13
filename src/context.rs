//! Coding context: one matrix, one encode schedule, cached decode schedules
//!
//! Everything built at construction is read-only afterwards, so a context can
//! be shared across threads for `encode`, `encode_stripes`,
//! `decoding_schedule` and `decode_with`. Only `set_erasure` needs `&mut`,
//! because it binds the schedule that `decode` runs.

use crate::bitmatrix::BitMatrix;
use crate::config::{CodingConfig, MatrixKind};
use crate::erasure::ErasureSet;
use crate::error::{CodingError, Result};
use crate::galois::{galois_field, GaloisField};
use crate::matrix::{
    CauchyMatrixFactory, CodingMatrix, ExtendedCauchyMatrixFactory, MatrixFactory,
    OriginalCauchyMatrixFactory,
};
use crate::schedule::{
    compile, generate, DecodingSchedule, Schedule, ScheduleCache, ScheduleStats,
};
use log::{debug, trace};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
pub struct CodingContext {
    config: CodingConfig,
    field: &'static GaloisField,
    matrix: CodingMatrix,
    bitmatrix: BitMatrix,
    schedule: Schedule,
    cache: ScheduleCache,
    current: Option<Arc<DecodingSchedule>>,
}

impl CodingContext {
    /// Build a context with the factory selected by `config.matrix`
    pub fn new(config: CodingConfig) -> Result<Self> {
        match config.matrix {
            MatrixKind::Cauchy => Self::with_factory(config, &CauchyMatrixFactory),
            MatrixKind::ExtendedCauchy => Self::with_factory(config, &ExtendedCauchyMatrixFactory),
            MatrixKind::OriginalCauchy => Self::with_factory(config, &OriginalCauchyMatrixFactory),
        }
    }

    /// Build a context around a caller-provided matrix factory
    pub fn with_factory<F: MatrixFactory>(config: CodingConfig, factory: &F) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();

        let field = galois_field(config.w)?;
        let mut matrix = factory.produce(field, config.k, config.m, &config.effective_seed())?;
        if config.improve {
            matrix.improve(field)?;
        }
        trace!("coding matrix:\n{}", matrix);

        let bitmatrix = BitMatrix::from_coding_matrix(&matrix, field)?;
        trace!("bitmatrix:\n{}", bitmatrix);

        let schedule = compile(&bitmatrix, config.k, config.m, config.w, config.mode)?;
        let stats = schedule.stats();

        debug!(
            "coding context k={} m={} w={} packet_size={} mode={:?}",
            config.k, config.m, config.w, config.packet_size, config.mode
        );
        debug!(
            "  schedule: {} ops ({} copies, {} xors, {} zeros), cost {}",
            stats.len,
            stats.copies,
            stats.xors,
            stats.zeros,
            stats.cost(&config.weights)
        );
        debug!("  init time: {} us", start.elapsed().as_micros());

        Ok(Self {
            config,
            field,
            matrix,
            bitmatrix,
            schedule,
            cache: ScheduleCache::new(),
            current: None,
        })
    }

    pub fn config(&self) -> &CodingConfig {
        &self.config
    }

    pub fn field(&self) -> &GaloisField {
        self.field
    }

    pub fn matrix(&self) -> &CodingMatrix {
        &self.matrix
    }

    pub fn bitmatrix(&self) -> &BitMatrix {
        &self.bitmatrix
    }

    /// The encode schedule
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn schedule_stats(&self) -> ScheduleStats {
        self.schedule.stats()
    }

    /// Weighted cost of the encode schedule under the configured weights
    pub fn cost(&self) -> u64 {
        self.schedule.stats().cost(&self.config.weights)
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.cache
    }

    /// Erasures bound by the last successful `set_erasure`
    pub fn erasures(&self) -> Option<&ErasureSet> {
        self.current.as_deref().map(DecodingSchedule::erasures)
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Split `data` into K blocks and return the M parity blocks
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        let expected = self.config.stripe_size();
        if data.len() != expected {
            return Err(CodingError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let block_size = self.config.block_size();
        let blocks: Vec<&[u8]> = data.chunks_exact(block_size).collect();
        let mut parities = vec![vec![0u8; block_size]; self.config.m];
        let mut parity_refs: Vec<&mut [u8]> =
            parities.iter_mut().map(|p| p.as_mut_slice()).collect();

        self.encode_into(&blocks, &mut parity_refs)?;
        Ok(parities)
    }

    /// Encode K caller-owned data blocks into M caller-owned parity blocks
    pub fn encode_into(&self, data: &[&[u8]], parities: &mut [&mut [u8]]) -> Result<()> {
        self.check_blocks(data.len(), parities.len())?;
        let block_size = self.config.block_size();
        let lengths = data
            .iter()
            .map(|b| b.len())
            .chain(parities.iter().map(|b| b.len()));
        for actual in lengths {
            if actual != block_size {
                return Err(CodingError::BufferSizeMismatch {
                    expected: block_size,
                    actual,
                });
            }
        }
        self.schedule.execute(data, parities, self.config.packet_size)
    }

    /// Encode independent stripes in parallel
    pub fn encode_stripes(&self, stripes: &[&[u8]]) -> Result<Vec<Vec<Vec<u8>>>> {
        stripes.par_iter().map(|stripe| self.encode(stripe)).collect()
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Look up or build the decoding schedule for an erasure list
    pub fn decoding_schedule(&self, erasures: &[usize]) -> Result<Arc<DecodingSchedule>> {
        let set = ErasureSet::new(self.config.k, self.config.m, erasures)?;
        let (k, m, w, mode) = (self.config.k, self.config.m, self.config.w, self.config.mode);
        self.cache
            .get_or_generate(&set, |e| generate(&self.bitmatrix, k, m, w, e, mode))
    }

    /// Bind the schedule for `erasures` as the one `decode` runs
    ///
    /// On failure nothing stays bound.
    pub fn set_erasure(&mut self, erasures: &[usize]) -> Result<()> {
        self.current = None;
        self.current = Some(self.decoding_schedule(erasures)?);
        Ok(())
    }

    /// Rebuild the bound erasures in place
    ///
    /// `data` holds the K data blocks and `parities` the M parity blocks, in
    /// block order. Erased entries are placeholders of the right size and are
    /// overwritten.
    pub fn decode<D, P>(&self, data: &mut [D], parities: &mut [P]) -> Result<()>
    where
        D: AsMut<[u8]>,
        P: AsMut<[u8]>,
    {
        let schedule = self.current.as_deref().ok_or(CodingError::NoErasureSet)?;
        self.decode_with(schedule, data, parities)
    }

    /// Rebuild the erasures of `schedule` in place without binding it
    pub fn decode_with<D, P>(
        &self,
        schedule: &DecodingSchedule,
        data: &mut [D],
        parities: &mut [P],
    ) -> Result<()>
    where
        D: AsMut<[u8]>,
        P: AsMut<[u8]>,
    {
        let erasures = schedule.erasures();
        if erasures.k() != self.config.k || erasures.m() != self.config.m {
            return Err(CodingError::InvalidParameters(format!(
                "schedule built for k={} m={}, context has k={} m={}",
                erasures.k(),
                erasures.m(),
                self.config.k,
                self.config.m
            )));
        }
        self.check_blocks(data.len(), parities.len())?;

        let block_size = self.config.block_size();
        let mut slots: Vec<Option<&mut [u8]>> = data
            .iter_mut()
            .map(|block| block.as_mut())
            .chain(parities.iter_mut().map(|block| block.as_mut()))
            .map(Some)
            .collect();
        for slot in slots.iter().flatten() {
            if slot.len() != block_size {
                return Err(CodingError::BufferSizeMismatch {
                    expected: block_size,
                    actual: slot.len(),
                });
            }
        }

        if schedule.is_noop() {
            return Ok(());
        }

        let mut outputs: Vec<&mut [u8]> = Vec::with_capacity(schedule.targets().len());
        for &target in schedule.targets() {
            outputs.push(take_slot(&mut slots, target)?);
        }
        let mut inputs: Vec<&[u8]> = Vec::with_capacity(schedule.sources().len());
        for &source in schedule.sources() {
            inputs.push(take_slot(&mut slots, source)?);
        }

        schedule
            .schedule()
            .execute(&inputs, &mut outputs, self.config.packet_size)
    }

    fn check_blocks(&self, data: usize, parities: usize) -> Result<()> {
        if data != self.config.k {
            return Err(CodingError::BufferCountMismatch {
                expected: self.config.k,
                actual: data,
            });
        }
        if parities != self.config.m {
            return Err(CodingError::BufferCountMismatch {
                expected: self.config.m,
                actual: parities,
            });
        }
        Ok(())
    }
}

fn take_slot<'a>(slots: &mut [Option<&'a mut [u8]>], index: usize) -> Result<&'a mut [u8]> {
    slots
        .get_mut(index)
        .and_then(Option::take)
        .ok_or_else(|| {
            CodingError::MalformedMatrix(format!(
                "block {} used twice by a decoding schedule",
                index
            ))
        })
}
