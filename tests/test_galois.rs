//! Galois field arithmetic across every supported word size
//!
//! Table-backed fields (w ≤ 16) and shift-multiply fields (w > 16) must obey
//! the same field laws; the property tests draw w from the whole range.

use cauchyrs::{galois_field, CodingError, GaloisField};
use proptest::prelude::*;

fn mask(w: u32) -> u32 {
    ((1u64 << w) - 1) as u32
}

// ============================================================================
// Unit tests
// ============================================================================

#[test]
fn test_rejects_unsupported_word_sizes() {
    assert!(matches!(
        GaloisField::new(0),
        Err(CodingError::InvalidParameters(_))
    ));
    assert!(matches!(
        galois_field(33),
        Err(CodingError::InvalidParameters(_))
    ));
}

#[test]
fn test_shared_fields_are_reused() {
    let a = galois_field(8).unwrap();
    let b = galois_field(8).unwrap();
    assert!(std::ptr::eq(a, b));
    assert_eq!(a.w(), 8);
}

#[test]
fn test_gf16_known_products() {
    let field = galois_field(16).unwrap();
    // x^15 · x = x^16 = x^12 + x^3 + x + 1
    assert_eq!(field.multiply(0x8000, 2), 0x100B);
    assert_eq!(field.times_x(0x8000), 0x100B);
}

#[test]
fn test_gf32_wraps_through_polynomial() {
    let field = galois_field(32).unwrap();
    // x^31 · x = x^32 = x^22 + x^2 + x + 1
    assert_eq!(field.multiply(0x8000_0000, 2), 0x0040_0007);
    let inverse = field.inverse(0x1234_5678).unwrap();
    assert_eq!(field.multiply(0x1234_5678, inverse), 1);
}

#[test]
fn test_every_nonzero_gf4_element_has_inverse() {
    let field = GaloisField::new(4).unwrap();
    for a in 1..16 {
        let inverse = field.inverse(a).unwrap();
        assert_eq!(field.multiply(a, inverse), 1, "a = {}", a);
    }
    assert_eq!(field.inverse(0), None);
    assert_eq!(field.divide(5, 0), None);
}

#[test]
fn test_n_ones_of_identity_and_zero() {
    for w in [1u32, 4, 8, 16, 32] {
        let field = galois_field(w).unwrap();
        assert_eq!(field.n_ones(1), w);
        assert_eq!(field.n_ones(0), 0);
    }
}

// ============================================================================
// Property tests
// ============================================================================

fn field_elements() -> impl Strategy<Value = (u32, u32, u32, u32)> {
    (1u32..=32).prop_flat_map(|w| {
        let m = mask(w);
        (
            Just(w),
            any::<u32>().prop_map(move |v| v & m),
            any::<u32>().prop_map(move |v| v & m),
            any::<u32>().prop_map(move |v| v & m),
        )
    })
}

proptest! {
    /// Property: products stay in the field
    #[test]
    fn prop_multiply_closed((w, a, b, _c) in field_elements()) {
        let field = galois_field(w).unwrap();
        prop_assert!(field.contains(field.multiply(a, b)));
    }

    /// Property: multiplication is commutative and associative
    #[test]
    fn prop_multiply_commutative_associative((w, a, b, c) in field_elements()) {
        let field = galois_field(w).unwrap();
        prop_assert_eq!(field.multiply(a, b), field.multiply(b, a));
        prop_assert_eq!(
            field.multiply(field.multiply(a, b), c),
            field.multiply(a, field.multiply(b, c))
        );
    }

    /// Property: multiplication distributes over XOR
    #[test]
    fn prop_multiply_distributes((w, a, b, c) in field_elements()) {
        let field = galois_field(w).unwrap();
        prop_assert_eq!(
            field.multiply(a, field.add(b, c)),
            field.add(field.multiply(a, b), field.multiply(a, c))
        );
    }

    /// Property: (a / b) · b = a for nonzero b
    #[test]
    fn prop_divide_inverts_multiply((w, a, b, _c) in field_elements()) {
        prop_assume!(b != 0);
        let field = galois_field(w).unwrap();
        let quotient = field.divide(a, b).unwrap();
        prop_assert_eq!(field.multiply(quotient, b), a);
    }

    /// Property: a^(2^w - 1) = 1 for nonzero a
    #[test]
    fn prop_multiplicative_order((w, a, _b, _c) in field_elements()) {
        prop_assume!(a != 0);
        let field = galois_field(w).unwrap();
        prop_assert_eq!(field.pow(a, field.order() - 1), 1);
    }

    /// Property: times_x agrees with multiplying by 2 wherever 2 is an element
    #[test]
    fn prop_times_x_is_multiply_by_two((w, a, _b, _c) in field_elements()) {
        prop_assume!(w > 1);
        let field = galois_field(w).unwrap();
        prop_assert_eq!(field.times_x(a), field.multiply(a, 2));
    }
}
