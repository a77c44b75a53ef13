//! Cauchy Reed-Solomon erasure coding with XOR schedules
//!
//! K data blocks are encoded into M parity blocks so that any K of the K+M
//! blocks recover the rest. A Cauchy coding matrix over GF(2^w) is expanded
//! into a bitmatrix and compiled into copy/XOR operations on packets; decode
//! schedules are derived per erasure pattern and cached.

pub mod bitmatrix;
pub mod config;
pub mod context;
pub mod erasure;
pub mod error;
pub mod galois;
pub mod matrix;
pub mod schedule;

pub use bitmatrix::BitMatrix;
pub use config::{CodingConfig, CostWeights, MatrixKind, SchedulingMode};
pub use context::CodingContext;
pub use erasure::{ErasurePattern, ErasureSet};
pub use error::{CodingError, Result};
pub use galois::{galois_field, GaloisField};
pub use matrix::{
    CauchyMatrixFactory, CodingMatrix, ExtendedCauchyMatrixFactory, MatrixFactory,
    OriginalCauchyMatrixFactory,
};
pub use schedule::{
    DecodingSchedule, Operation, PacketRef, Schedule, ScheduleCache, ScheduleStats,
};
