//! Bitmatrix to schedule compilation
//!
//! Input column `c` is packet `c % w` of input device `c / w`. Output row `r`
//! is packet `r % w` of device `k + r / w`.

use super::ops::{Operation, PacketRef, Schedule};
use crate::bitmatrix::BitMatrix;
use crate::config::SchedulingMode;
use crate::error::{CodingError, Result};

/// Compile a `(m·w)×(k·w)` bitmatrix into a schedule
pub fn compile(
    bitmatrix: &BitMatrix,
    k: usize,
    m: usize,
    w: u32,
    mode: SchedulingMode,
) -> Result<Schedule> {
    match mode {
        SchedulingMode::Dumb => dumb_schedule(bitmatrix, k, m, w),
        SchedulingMode::Smart => smart_schedule(bitmatrix, k, m, w),
    }
}

fn check_dimensions(bitmatrix: &BitMatrix, k: usize, m: usize, w: u32) -> Result<()> {
    if bitmatrix.rows() == 0 || bitmatrix.cols() == 0 {
        return Err(CodingError::EmptyBitmatrix {
            rows: bitmatrix.rows(),
            cols: bitmatrix.cols(),
        });
    }
    let wu = w as usize;
    if w != bitmatrix.w() || bitmatrix.rows() != m * wu || bitmatrix.cols() != k * wu {
        return Err(CodingError::MalformedMatrix(format!(
            "bitmatrix is {}x{} with w={}, expected {}x{} for k={} m={} w={}",
            bitmatrix.rows(),
            bitmatrix.cols(),
            bitmatrix.w(),
            m * wu,
            k * wu,
            k,
            m,
            w
        )));
    }
    Ok(())
}

#[inline]
fn input_packet(col: usize, w: usize) -> PacketRef {
    PacketRef::new(col / w, col % w)
}

#[inline]
fn output_packet(row: usize, k: usize, w: usize) -> PacketRef {
    PacketRef::new(k + row / w, row % w)
}

/// Emit a row straight from its input columns
fn emit_row(schedule: &mut Schedule, bitmatrix: &BitMatrix, row: usize, k: usize, w: usize) {
    let dst = output_packet(row, k, w);
    let mut ones = bitmatrix.row_ones(row);
    match ones.next() {
        None => schedule.push(Operation::Zero { dst }),
        Some(first) => {
            schedule.push(Operation::Copy {
                src: input_packet(first, w),
                dst,
            });
            for col in ones {
                schedule.push(Operation::Xor {
                    src: input_packet(col, w),
                    dst,
                });
            }
        }
    }
}

/// One copy and one XOR per additional set bit, rows in order
pub fn dumb_schedule(bitmatrix: &BitMatrix, k: usize, m: usize, w: u32) -> Result<Schedule> {
    check_dimensions(bitmatrix, k, m, w)?;
    let wu = w as usize;
    let mut schedule = Schedule::new(k, m, w);
    for row in 0..bitmatrix.rows() {
        emit_row(&mut schedule, bitmatrix, row, k, wu);
    }
    Ok(schedule)
}

/// Greedy schedule that builds rows from already computed rows
///
/// Each pending row tracks the cheapest known way to produce it: from the
/// inputs directly (one op per set bit) or from a finished output row (one
/// copy plus one XOR per differing column). The cheapest pending row is
/// emitted next, and every remaining row is re-priced against it.
pub fn smart_schedule(bitmatrix: &BitMatrix, k: usize, m: usize, w: u32) -> Result<Schedule> {
    check_dimensions(bitmatrix, k, m, w)?;
    let wu = w as usize;
    let rows = bitmatrix.rows();
    let mut schedule = Schedule::new(k, m, w);

    let mut diff: Vec<usize> = (0..rows).map(|r| bitmatrix.row_count(r)).collect();
    let mut from: Vec<Option<usize>> = vec![None; rows];

    // Pending rows, kept ascending so ties go to the lowest row
    let mut pending: Vec<usize> = (0..rows).collect();

    let mut best = first_minimum(&pending, &diff);

    while let Some(position) = best {
        let row = pending.remove(position);

        match from[row] {
            None => emit_row(&mut schedule, bitmatrix, row, k, wu),
            Some(base) => {
                let dst = output_packet(row, k, wu);
                schedule.push(Operation::Copy {
                    src: output_packet(base, k, wu),
                    dst,
                });
                for col in bitmatrix.row_difference(row, base) {
                    schedule.push(Operation::Xor {
                        src: input_packet(col, wu),
                        dst,
                    });
                }
            }
        }

        best = None;
        let mut best_diff = usize::MAX;
        for (position, &other) in pending.iter().enumerate() {
            let cost = bitmatrix.row_distance(row, other) + 1;
            if cost < diff[other] {
                from[other] = Some(row);
                diff[other] = cost;
            }
            if diff[other] < best_diff {
                best_diff = diff[other];
                best = Some(position);
            }
        }
    }

    Ok(schedule)
}

fn first_minimum(pending: &[usize], diff: &[usize]) -> Option<usize> {
    let mut best = None;
    let mut best_diff = usize::MAX;
    for (position, &row) in pending.iter().enumerate() {
        if diff[row] < best_diff {
            best_diff = diff[row];
            best = Some(position);
        }
    }
    best
}
