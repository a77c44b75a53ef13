//! Schedule compilation and decoding schedule generation
//!
//! Every compiled schedule, dumb or smart, must produce for each output
//! bit-row exactly the XOR of the input bit-rows its bitmatrix row selects.

use cauchyrs::schedule::{compile, dumb_schedule, generate, smart_schedule};
use cauchyrs::{
    galois_field, BitMatrix, CodingError, ErasureSet, MatrixFactory, Operation,
    OriginalCauchyMatrixFactory, Schedule, SchedulingMode,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Helpers
// ============================================================================

/// Direct evaluation: output packet r = XOR of input packets c with bit (r, c)
fn evaluate(bitmatrix: &BitMatrix, inputs: &[Vec<u8>], packet_size: usize) -> Vec<Vec<u8>> {
    let w = bitmatrix.w() as usize;
    let len = inputs[0].len();
    let chunk = w * packet_size;
    let mut outputs = vec![vec![0u8; len]; bitmatrix.rows() / w];
    for offset in (0..len).step_by(chunk) {
        for row in 0..bitmatrix.rows() {
            for col in bitmatrix.row_ones(row) {
                let dst = offset + (row % w) * packet_size;
                let src = offset + (col % w) * packet_size;
                for b in 0..packet_size {
                    outputs[row / w][dst + b] ^= inputs[col / w][src + b];
                }
            }
        }
    }
    outputs
}

fn execute(schedule: &Schedule, inputs: &[Vec<u8>], packet_size: usize) -> Vec<Vec<u8>> {
    let len = inputs[0].len();
    let mut outputs = vec![vec![0x5Au8; len]; schedule.outputs()];
    let input_refs: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();
    let mut output_refs: Vec<&mut [u8]> = outputs.iter_mut().map(Vec::as_mut_slice).collect();
    schedule
        .execute(&input_refs, &mut output_refs, packet_size)
        .unwrap();
    outputs
}

fn random_inputs(rng: &mut StdRng, devices: usize, len: usize) -> Vec<Vec<u8>> {
    (0..devices)
        .map(|_| {
            let mut buffer = vec![0u8; len];
            rng.fill(buffer.as_mut_slice());
            buffer
        })
        .collect()
}

fn cauchy_bitmatrix(k: usize, m: usize, w: u32) -> BitMatrix {
    let field = galois_field(w).unwrap();
    let matrix = OriginalCauchyMatrixFactory.produce(field, k, m, &[]).unwrap();
    BitMatrix::from_coding_matrix(&matrix, field).unwrap()
}

// ============================================================================
// Compiler
// ============================================================================

#[test]
fn test_cauchy_schedules_match_direct_sum() {
    let mut rng = StdRng::seed_from_u64(7);
    for (k, m, w, packet_size) in [(4, 2, 8, 1), (6, 3, 4, 4), (3, 2, 16, 2), (2, 2, 3, 5)] {
        let bitmatrix = cauchy_bitmatrix(k, m, w);
        let inputs = random_inputs(&mut rng, k, 3 * w as usize * packet_size);
        let expected = evaluate(&bitmatrix, &inputs, packet_size);

        let dumb = compile(&bitmatrix, k, m, w, SchedulingMode::Dumb).unwrap();
        let smart = compile(&bitmatrix, k, m, w, SchedulingMode::Smart).unwrap();
        assert_eq!(execute(&dumb, &inputs, packet_size), expected);
        assert_eq!(execute(&smart, &inputs, packet_size), expected);
        assert!(smart.len() <= dumb.len(), "k={} m={} w={}", k, m, w);
    }
}

#[test]
fn test_smart_saves_work_on_dense_matrices() {
    let bitmatrix = cauchy_bitmatrix(8, 4, 8);
    let dumb = dumb_schedule(&bitmatrix, 8, 4, 8).unwrap();
    let smart = smart_schedule(&bitmatrix, 8, 4, 8).unwrap();
    assert!(smart.stats().xors < dumb.stats().xors);
}

#[test]
fn test_every_output_is_written_before_read() {
    let bitmatrix = cauchy_bitmatrix(5, 3, 8);
    let schedule = smart_schedule(&bitmatrix, 5, 3, 8).unwrap();
    let mut written = std::collections::HashSet::new();
    for op in schedule.ops() {
        if let Some(src) = op.src() {
            if src.device >= schedule.inputs() {
                assert!(written.contains(&src), "{:?} read before written", src);
            }
        }
        match op {
            Operation::Xor { dst, .. } => assert!(written.contains(dst)),
            Operation::Copy { dst, .. } | Operation::Zero { dst } => {
                written.insert(*dst);
            }
        }
    }
    assert_eq!(written.len(), 3 * 8);
}

#[test]
fn test_schedule_dimension_errors() {
    let bitmatrix = cauchy_bitmatrix(3, 2, 4);
    assert!(matches!(
        compile(&bitmatrix, 3, 3, 4, SchedulingMode::Smart),
        Err(CodingError::MalformedMatrix(_))
    ));
    assert!(matches!(
        compile(&BitMatrix::new(0, 8, 4), 2, 0, 4, SchedulingMode::Smart),
        Err(CodingError::EmptyBitmatrix { rows: 0, cols: 8 })
    ));
}

// ============================================================================
// Decoding schedules
// ============================================================================

/// Encode, wipe the erased blocks and rebuild them with a decoding schedule
fn rebuild(k: usize, m: usize, w: u32, erased: &[usize], mode: SchedulingMode) {
    let packet_size = 2;
    let bitmatrix = cauchy_bitmatrix(k, m, w);
    let mut rng = StdRng::seed_from_u64((k * 100 + m * 10) as u64 + erased.len() as u64);
    let data = random_inputs(&mut rng, k, w as usize * packet_size);
    let parity = evaluate(&bitmatrix, &data, packet_size);
    let blocks: Vec<Vec<u8>> = data.into_iter().chain(parity).collect();

    let erasures = ErasureSet::new(k, m, erased).unwrap();
    let decoding = generate(&bitmatrix, k, m, w, &erasures, mode).unwrap();

    let sources: Vec<Vec<u8>> = decoding
        .sources()
        .iter()
        .map(|&s| {
            assert!(!erasures.is_erased(s), "erased block {} used as a source", s);
            blocks[s].clone()
        })
        .collect();
    let rebuilt = execute(decoding.schedule(), &sources, packet_size);

    let expected_targets: Vec<usize> = erasures
        .data_erasures()
        .chain(erasures.parity_erasures())
        .collect();
    assert_eq!(decoding.targets(), expected_targets);
    for (target, block) in decoding.targets().iter().zip(&rebuilt) {
        assert_eq!(block, &blocks[*target], "block {} for erasures {:?}", target, erased);
    }
}

#[test]
fn test_decoding_every_pair_of_erasures() {
    let (k, m, w) = (4, 2, 8);
    for a in 0..k + m {
        rebuild(k, m, w, &[a], SchedulingMode::Smart);
        for b in a + 1..k + m {
            rebuild(k, m, w, &[a, b], SchedulingMode::Smart);
            rebuild(k, m, w, &[b, a], SchedulingMode::Dumb);
        }
    }
}

#[test]
fn test_decoding_all_data_erased() {
    rebuild(3, 3, 4, &[0, 1, 2], SchedulingMode::Smart);
    rebuild(3, 3, 4, &[2, 0, 1], SchedulingMode::Dumb);
}

#[test]
fn test_decoding_too_many_erasures() {
    let bitmatrix = cauchy_bitmatrix(4, 2, 8);
    assert!(matches!(
        ErasureSet::new(4, 2, &[0, 1, 2]),
        Err(CodingError::UnrecoverableErasure(_))
    ));
    let foreign = ErasureSet::new(3, 3, &[0]).unwrap();
    assert!(matches!(
        generate(&bitmatrix, 4, 2, 8, &foreign, SchedulingMode::Smart),
        Err(CodingError::InvalidParameters(_))
    ));
}

// ============================================================================
// Property tests
// ============================================================================

fn random_bitmatrix() -> impl Strategy<Value = (BitMatrix, usize, usize, u32)> {
    (1usize..5, 1usize..4, 1u32..7).prop_flat_map(|(k, m, w)| {
        let cells = k * m * (w as usize) * (w as usize);
        prop::collection::vec(any::<bool>(), cells).prop_map(move |bits| {
            let wu = w as usize;
            let mut bitmatrix = BitMatrix::new(m * wu, k * wu, w);
            for (i, bit) in bits.into_iter().enumerate() {
                bitmatrix.set(i / (k * wu), i % (k * wu), bit);
            }
            (bitmatrix, k, m, w)
        })
    })
}

proptest! {
    /// Property: dumb and smart schedules both compute the bitmatrix product
    #[test]
    fn prop_schedules_match_direct_sum(
        (bitmatrix, k, m, w) in random_bitmatrix(),
        packet_size in 1usize..4,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let inputs = random_inputs(&mut rng, k, 2 * w as usize * packet_size);
        let expected = evaluate(&bitmatrix, &inputs, packet_size);

        let dumb = dumb_schedule(&bitmatrix, k, m, w).unwrap();
        let smart = smart_schedule(&bitmatrix, k, m, w).unwrap();
        prop_assert_eq!(execute(&dumb, &inputs, packet_size), expected.clone());
        prop_assert_eq!(execute(&smart, &inputs, packet_size), expected);
        prop_assert!(smart.len() <= dumb.len());
    }
}
