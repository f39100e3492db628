//! Deterministic input generation for the benchmark driver.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

fn rng_for(seed: Option<u64>, stream: u64) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s ^ stream),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Generate `count` distinct 64-bit digests.
///
/// Construction requires distinct keys, so duplicates from the generator
/// are filtered out (at realistic counts a 64-bit duplicate is vanishingly
/// rare anyway).
pub fn distinct_digests(count: usize, seed: Option<u64>) -> Vec<u64> {
    let mut rng = rng_for(seed, 0);
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

/// Sample member keys uniformly for the query plan.
pub fn query_plan(keys: &[u64], count: usize, seed: Option<u64>) -> Vec<u64> {
    if keys.is_empty() {
        return Vec::new();
    }
    let mut rng = rng_for(seed, 0x5157_CC1B_7272_0A95);
    (0..count)
        .map(|_| keys[rng.gen_range(0..keys.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_digests_are_distinct_and_seeded() {
        let a = distinct_digests(10_000, Some(42));
        let b = distinct_digests(10_000, Some(42));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), a.len());
    }

    #[test]
    fn test_query_plan_draws_members() {
        let keys = distinct_digests(1_000, Some(7));
        let plan = query_plan(&keys, 5_000, Some(7));
        assert_eq!(plan.len(), 5_000);
        let members: HashSet<u64> = keys.iter().copied().collect();
        assert!(plan.iter().all(|k| members.contains(k)));
    }

    #[test]
    fn test_query_plan_empty_keys() {
        assert!(query_plan(&[], 100, Some(1)).is_empty());
    }
}
