//! Schedule operations and their execution
//!
//! A schedule addresses packets by (device, packet). Devices `0..inputs` are
//! read-only sources and devices `inputs..inputs + outputs` are the buffers
//! being computed. Each device buffer is split into chunks of `w` packets;
//! the whole schedule runs once per chunk.
//!
//! Operations run strictly in order. Later operations may read output
//! packets written by earlier ones.

use crate::config::CostWeights;
use crate::error::{CodingError, Result};
use std::ops::Range;

/// One packet of one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketRef {
    pub device: usize,
    pub packet: usize,
}

impl PacketRef {
    #[inline]
    pub fn new(device: usize, packet: usize) -> Self {
        Self { device, packet }
    }
}

/// A single schedule step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// dst = src
    Copy { src: PacketRef, dst: PacketRef },
    /// dst ^= src
    Xor { src: PacketRef, dst: PacketRef },
    /// dst = 0, for output rows with no contributing inputs
    Zero { dst: PacketRef },
}

impl Operation {
    /// Packet written by this operation
    pub fn dst(&self) -> PacketRef {
        match *self {
            Operation::Copy { dst, .. } | Operation::Xor { dst, .. } | Operation::Zero { dst } => {
                dst
            }
        }
    }

    /// Packet read by this operation, if any
    pub fn src(&self) -> Option<PacketRef> {
        match *self {
            Operation::Copy { src, .. } | Operation::Xor { src, .. } => Some(src),
            Operation::Zero { .. } => None,
        }
    }
}

/// Operation counts for a schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    pub len: usize,
    pub copies: usize,
    pub xors: usize,
    pub zeros: usize,
}

impl ScheduleStats {
    /// Weighted cost estimate; zero fills are charged as copies
    pub fn cost(&self, weights: &CostWeights) -> u64 {
        (self.copies + self.zeros) as u64 * weights.copy + self.xors as u64 * weights.xor
    }
}

/// Ordered list of packet operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    inputs: usize,
    outputs: usize,
    w: u32,
    ops: Vec<Operation>,
}

impl Schedule {
    pub(crate) fn new(inputs: usize, outputs: usize, w: u32) -> Self {
        Self {
            inputs,
            outputs,
            w,
            ops: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, op: Operation) {
        debug_assert!(op.dst().device >= self.inputs, "schedule writes to an input");
        debug_assert!(op.dst().device < self.inputs + self.outputs);
        self.ops.push(op);
    }

    /// Number of source devices
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Number of devices written by the schedule
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn w(&self) -> u32 {
        self.w
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn stats(&self) -> ScheduleStats {
        let mut stats = ScheduleStats {
            len: self.ops.len(),
            ..ScheduleStats::default()
        };
        for op in &self.ops {
            match op {
                Operation::Copy { .. } => stats.copies += 1,
                Operation::Xor { .. } => stats.xors += 1,
                Operation::Zero { .. } => stats.zeros += 1,
            }
        }
        stats
    }

    /// Run the schedule over caller buffers
    ///
    /// Every buffer must have the same length, a multiple of
    /// `w * packet_size`.
    pub fn execute(
        &self,
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        packet_size: usize,
    ) -> Result<()> {
        if inputs.len() != self.inputs {
            return Err(CodingError::BufferCountMismatch {
                expected: self.inputs,
                actual: inputs.len(),
            });
        }
        if outputs.len() != self.outputs {
            return Err(CodingError::BufferCountMismatch {
                expected: self.outputs,
                actual: outputs.len(),
            });
        }
        if packet_size == 0 {
            return Err(CodingError::InvalidParameters(
                "packet_size must be at least 1".to_string(),
            ));
        }

        let chunk = packet_size * self.w as usize;
        let Some(len) = inputs
            .first()
            .map(|b| b.len())
            .or_else(|| outputs.first().map(|b| b.len()))
        else {
            return Ok(());
        };
        if len % chunk != 0 {
            return Err(CodingError::BufferSizeMismatch {
                expected: len.div_ceil(chunk) * chunk,
                actual: len,
            });
        }
        let lengths = inputs
            .iter()
            .map(|b| b.len())
            .chain(outputs.iter().map(|b| b.len()));
        for actual in lengths {
            if actual != len {
                return Err(CodingError::BufferSizeMismatch {
                    expected: len,
                    actual,
                });
            }
        }

        for offset in (0..len).step_by(chunk) {
            for op in &self.ops {
                self.apply(op, inputs, outputs, offset, packet_size);
            }
        }

        Ok(())
    }

    fn apply(
        &self,
        op: &Operation,
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        offset: usize,
        packet_size: usize,
    ) {
        let range = |p: PacketRef| {
            let start = offset + p.packet * packet_size;
            start..start + packet_size
        };

        match *op {
            Operation::Zero { dst } => {
                outputs[dst.device - self.inputs][range(dst)].fill(0);
            }
            Operation::Copy { src, dst } | Operation::Xor { src, dst } => {
                let xor = matches!(op, Operation::Xor { .. });
                let dst_range = range(dst);
                if src.device < self.inputs {
                    let source = &inputs[src.device][range(src)];
                    let target = &mut outputs[dst.device - self.inputs][dst_range];
                    combine(target, source, xor);
                } else {
                    let (source, target) = split_packets(
                        outputs,
                        src.device - self.inputs,
                        range(src),
                        dst.device - self.inputs,
                        dst_range,
                    );
                    combine(target, source, xor);
                }
            }
        }
    }
}

#[inline]
fn combine(target: &mut [u8], source: &[u8], xor: bool) {
    if xor {
        for (t, s) in target.iter_mut().zip(source) {
            *t ^= *s;
        }
    } else {
        target.copy_from_slice(source);
    }
}

/// Borrow a source packet and a distinct destination packet from the
/// output buffers at the same time
fn split_packets<'a>(
    buffers: &'a mut [&mut [u8]],
    src_device: usize,
    src: Range<usize>,
    dst_device: usize,
    dst: Range<usize>,
) -> (&'a [u8], &'a mut [u8]) {
    use std::cmp::Ordering;

    match src_device.cmp(&dst_device) {
        Ordering::Equal => {
            let buffer = &mut *buffers[src_device];
            debug_assert!(src.end <= dst.start || dst.end <= src.start);
            if src.start < dst.start {
                let (low, high) = buffer.split_at_mut(dst.start);
                (&low[src], &mut high[..dst.len()])
            } else {
                let (low, high) = buffer.split_at_mut(src.start);
                (&high[..src.len()], &mut low[dst])
            }
        }
        Ordering::Less => {
            let (low, high) = buffers.split_at_mut(dst_device);
            (&low[src_device][src], &mut high[0][dst])
        }
        Ordering::Greater => {
            let (low, high) = buffers.split_at_mut(src_device);
            (&high[0][src], &mut low[dst_device][dst])
        }
    }
}
