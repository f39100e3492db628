//! End-to-end properties of the minimal perfect hash function.

use linehash::{BuildError, DefaultMphf, Mphf};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Generate `count` distinct random digests with a fixed seed.
fn distinct_digests(count: usize, seed: u64) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(count);
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        let key = rng.gen::<u64>();
        if seen.insert(key) {
            keys.push(key);
        }
    }
    keys
}

/// Perfection and minimality in one sweep: every key hits, every value is
/// in range, and no value repeats.
fn assert_bijection<const W: usize, const O: usize, const UPPER: bool>(
    mph: &Mphf<W, O, UPPER>,
    keys: &[u64],
) {
    assert_eq!(mph.len(), keys.len());
    let mut taken = vec![false; keys.len()];
    for &key in keys {
        let value = mph.index_u64(key).expect("member key missed every level");
        assert!(value < keys.len(), "value {value} out of range");
        assert!(!taken[value], "two keys mapped to {value}");
        taken[value] = true;
    }
}

fn build_and_check<const W: usize, const O: usize>(keys: &[u64], gamma: f64) {
    let mph = Mphf::<W, O>::from_digests(keys.to_vec(), gamma).unwrap();
    assert_bijection(&mph, keys);
}

// ============================================================================
// Perfection and minimality
// ============================================================================

#[test]
fn test_tiny_fixed_set() {
    let keys = vec![7u64, 11, 13];
    let mph = DefaultMphf::from_digests(keys.clone(), 2.0).unwrap();
    assert_bijection(&mph, &keys);
    assert!(mph.levels() >= 1);
}

#[test]
fn test_million_random_digests() {
    let keys = distinct_digests(1_000_000, 0xFEED);
    let mph = DefaultMphf::from_digests(keys.clone(), 2.0).unwrap();
    assert_bijection(&mph, &keys);

    let bpe = mph.bits() as f64 / keys.len() as f64;
    assert!(bpe < 4.5, "bits per element {bpe}");
}

#[test]
fn test_all_line_and_offset_variants() {
    let keys = distinct_digests(20_000, 0xBEEF);
    build_and_check::<1, 16>(&keys, 2.0);
    build_and_check::<2, 16>(&keys, 2.0);
    build_and_check::<4, 16>(&keys, 2.0);
    build_and_check::<8, 16>(&keys, 2.0);
    build_and_check::<16, 16>(&keys, 2.0);
    build_and_check::<1, 32>(&keys, 2.0);
    build_and_check::<2, 32>(&keys, 2.0);
    build_and_check::<4, 32>(&keys, 2.0);
    build_and_check::<8, 32>(&keys, 2.0);
    build_and_check::<16, 32>(&keys, 2.0);
}

#[test]
fn test_gamma_range() {
    let keys = distinct_digests(30_000, 0xACE);
    for gamma in [1.1, 1.5, 2.0, 3.0, 5.0] {
        build_and_check::<4, 16>(&keys, gamma);
    }
}

// ============================================================================
// Boundary cases
// ============================================================================

#[test]
fn test_empty_set() {
    let mph = DefaultMphf::from_digests(Vec::new(), 2.0).unwrap();
    assert_eq!(mph.levels(), 0);
    assert_eq!(mph.len(), 0);
    assert!(mph.is_empty());
    for probe in [0u64, 1, u64::MAX] {
        assert_eq!(mph.index_u64(probe), None);
    }
    assert!(mph.bits() > 0);
}

#[test]
fn test_single_key() {
    let mph = DefaultMphf::from_digests(vec![0x1234_5678_9ABC_DEF0], 2.0).unwrap();
    assert_eq!(mph.index_u64(0x1234_5678_9ABC_DEF0), Some(0));
    assert_eq!(mph.len(), 1);
}

#[test]
fn test_offset_overflow_vs_upper_rank() {
    // One sampling stride of 64-bit lines covers 1365 lines (65520 payload
    // bits); 60k keys at γ=2 blow past that in level 0.
    let keys = distinct_digests(60_000, 0xF00);
    let err = Mphf::<1, 16, false>::from_digests(keys.clone(), 2.0).unwrap_err();
    assert_eq!(err, BuildError::OffsetOverflow);

    let mph = Mphf::<1, 16, true>::from_digests(keys.clone(), 2.0).unwrap();
    assert_bijection(&mph, &keys);
}

#[test]
fn test_invalid_gamma_rejected() {
    for gamma in [1.0, 0.99, 0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = DefaultMphf::from_digests(vec![1, 2, 3], gamma).unwrap_err();
        assert_eq!(err, BuildError::InvalidGamma);
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_byte_identical_across_input_order() {
    let keys = distinct_digests(25_000, 0xD1CE);
    let reference = DefaultMphf::from_digests(keys.clone(), 2.0).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..3 {
        let mut shuffled = keys.clone();
        shuffled.shuffle(&mut rng);
        let rebuilt = DefaultMphf::from_digests(shuffled, 2.0).unwrap();
        assert_eq!(rebuilt.to_bytes(), reference.to_bytes());
        assert_eq!(rebuilt.bits(), reference.bits());
        assert_eq!(rebuilt.levels(), reference.levels());
    }
}

// ============================================================================
// Byte-string keys
// ============================================================================

#[test]
fn test_string_keys_bijection() {
    let keys = ["alpha", "beta", "gamma"];
    let mph = DefaultMphf::from_keys(&keys.map(str::as_bytes), 2.0).unwrap();
    let mut values: Vec<usize> = keys.iter().map(|k| mph.index(k.as_bytes()).unwrap()).collect();
    values.sort_unstable();
    assert_eq!(values, vec![0, 1, 2]);
}

#[test]
fn test_many_string_keys() {
    let owned: Vec<String> = (0..50_000).map(|i| format!("urn:object:{i:08}")).collect();
    let mph = DefaultMphf::from_keys(&owned, 2.0).unwrap();

    let mut taken = vec![false; owned.len()];
    for key in &owned {
        let value = mph.index(key.as_bytes()).expect("member key missed");
        assert!(value < owned.len());
        assert!(!taken[value]);
        taken[value] = true;
    }
}

// ============================================================================
// Space accounting
// ============================================================================

#[test]
fn test_bits_scale_with_gamma() {
    let keys = distinct_digests(100_000, 0xB175);
    let at2 = DefaultMphf::from_digests(keys.clone(), 2.0).unwrap();
    let at4 = DefaultMphf::from_digests(keys.clone(), 4.0).unwrap();
    assert!(at2.bits() < at4.bits());

    let bpe = at2.bits() as f64 / keys.len() as f64;
    assert!(bpe > 2.0 && bpe < 4.5, "bits per element {bpe}");
}

#[test]
fn test_wider_offset_costs_space() {
    let keys = distinct_digests(100_000, 0x0FF5);
    let o16 = Mphf::<4, 16>::from_digests(keys.clone(), 2.0).unwrap();
    let o32 = Mphf::<4, 32>::from_digests(keys.clone(), 2.0).unwrap();
    // Same line count, fewer payload bits per line with the wider offset.
    assert!(o32.bits() >= o16.bits());
}
