//! Level-peeling construction, queries, and storage accounting.
//!
//! # Construction
//!
//! Each level hashes the remaining keys into a fresh bit domain of about
//! γ·n bits (rounded up to a whole number of cache lines). Keys that land
//! alone on a bit are resolved there; every member of a colliding group is
//! remixed and carried to the next level. Sorting the keys first turns
//! collision detection into a scan for runs of equal fingerprints, and
//! lets the bitmap be emitted strictly left to right through a one-line
//! cursor that fills in the rank metadata as it goes.
//!
//! # Query
//!
//! A query walks the levels, rehashing with the same remix chain, until it
//! finds its set bit. The answer is the bit's global rank, assembled from
//! three pieces that are all on the query's path anyway: the upper-rank
//! sample for the line's stride, the line's embedded offset, and an
//! in-line popcount.

#[cfg(not(test))]
use alloc::vec;
#[cfg(not(test))]
use alloc::vec::Vec;

use crate::binary::ReadError;
use crate::hash::{fastrange64, hash_bytes, remix};
use crate::line::CacheLine;

/// Default load factor: about two level-0 bits per key.
pub const DEFAULT_GAMMA: f64 = 2.0;

/// Lines between two upper-rank samples for a given line geometry.
const fn sampling_stride(payload_bits: usize, offset_bits: usize) -> usize {
    ((1u64 << offset_bits) / payload_bits as u64) as usize
}

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// The load factor must be finite and greater than 1.0.
    InvalidGamma,
    /// A line offset would exceed its field width. Only possible with the
    /// upper rank tier disabled; enable it or widen the offset field.
    OffsetOverflow,
}

impl core::fmt::Display for BuildError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BuildError::InvalidGamma => write!(f, "load factor must be finite and > 1.0"),
            BuildError::OffsetOverflow => write!(
                f,
                "offset field exhausted; enable the upper rank tier or widen the offset"
            ),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for BuildError {}

// =============================================================================
// The hash function
// =============================================================================

/// A minimal perfect hash function over a static set of 64-bit digests.
///
/// `W` is the cache line size in 64-bit words, `O` the embedded offset
/// width in bits, `UPPER` whether the upper rank tier exists. Without the
/// upper tier the offsets alone must index every set bit, which caps the
/// bitmap at `2^O` bits; construction fails cleanly past that point.
///
/// The structure is immutable once built; queries are pure reads and the
/// type is `Send + Sync`.
#[derive(Clone, Debug)]
pub struct Mphf<const W: usize, const O: usize = 16, const UPPER: bool = true> {
    bit_vector: Vec<CacheLine<W, O>>,
    level_bases: Vec<usize>,
    upper_rank: Vec<usize>,
    n: usize,
}

impl<const W: usize, const O: usize, const UPPER: bool> Mphf<W, O, UPPER> {
    const PAYLOAD: usize = CacheLine::<W, O>::PAYLOAD_BITS;
    const SAMPLING: usize = sampling_stride(CacheLine::<W, O>::PAYLOAD_BITS, O);

    /// Build from byte-string keys; digests come from [`hash_bytes`].
    ///
    /// Keys must be distinct (and must not collide in their 64-bit
    /// digests; see [`hash_bytes`]).
    pub fn from_keys<K: AsRef<[u8]>>(keys: &[K], gamma: f64) -> Result<Self, BuildError> {
        let mut digests = Vec::with_capacity(keys.len());
        for key in keys {
            digests.push(hash_bytes(key.as_ref()));
        }
        Self::from_digests(digests, gamma)
    }

    /// Build from distinct 64-bit key digests.
    ///
    /// The buffer is consumed: construction sorts it in place and reuses
    /// it as scratch across levels. Duplicate digests violate the
    /// contract; the peeling loop would carry the duplicates forever.
    /// Debug builds panic on the first level instead of hanging.
    pub fn from_digests(mut keys: Vec<u64>, gamma: f64) -> Result<Self, BuildError> {
        let () = CacheLine::<W, O>::VALID;
        if !gamma.is_finite() || gamma <= 1.0 {
            return Err(BuildError::InvalidGamma);
        }

        let n = keys.len();
        let mut level_bases = vec![0usize];
        let mut cursor = Cursor::<W, O, UPPER>::new();
        let mut level_base = 0usize;
        let mut level = 0usize;

        while !keys.is_empty() {
            let count = keys.len();
            let domain = ((count as f64 * gamma) as usize).div_ceil(Self::PAYLOAD) * Self::PAYLOAD;
            cursor.reserve_total((level_base + domain) / Self::PAYLOAD);

            if level > 0 {
                for key in keys.iter_mut() {
                    *key = remix(*key);
                }
            }
            keys.sort_unstable();

            if level == 0 {
                debug_assert!(
                    keys.windows(2).all(|pair| pair[0] != pair[1]),
                    "duplicate key digests; construction requires a distinct key set"
                );
            }

            // Expected carry-over is n·γ·e^(−γ); core has no f64::exp, so
            // the no_std reserve hint is a coarse constant.
            #[cfg(any(test, feature = "std"))]
            let carry_hint = (count as f64 * gamma * (-gamma).exp()) as usize;
            #[cfg(not(any(test, feature = "std")))]
            let carry_hint = count / 3;
            let mut collision: Vec<u64> = Vec::with_capacity(carry_hint);

            let mut i = 0;
            while i < count {
                let fingerprint = fastrange64(keys[i], domain as u64) as usize + level_base;
                cursor.advance_to(fingerprint / Self::PAYLOAD)?;

                let mut j = i + 1;
                while j < count
                    && fastrange64(keys[j], domain as u64) as usize + level_base == fingerprint
                {
                    j += 1;
                }
                if j - i > 1 {
                    // The whole equivalence class moves on, not just the
                    // runners-up: the surviving bit must identify one key.
                    collision.extend_from_slice(&keys[i..j]);
                } else {
                    cursor.set_bit(fingerprint % Self::PAYLOAD);
                }
                i = j;
            }

            level_base += domain;
            cursor.advance_to(level_base / Self::PAYLOAD)?;
            level_bases.push(level_base);
            keys = collision;
            level += 1;
        }

        let Cursor {
            lines, upper_rank, ..
        } = cursor;
        Ok(Self {
            bit_vector: lines,
            level_bases,
            upper_rank,
            n,
        })
    }

    /// Evaluate the function for a byte-string key.
    #[inline]
    pub fn index(&self, key: &[u8]) -> Option<usize> {
        self.index_u64(hash_bytes(key))
    }

    /// Evaluate the function for a 64-bit key digest.
    ///
    /// For a member of the constructed set this returns its distinct value
    /// in `[0, len())`. For any other digest the result is unspecified: it
    /// may be `None` (every level missed) or an arbitrary member's value.
    #[inline]
    pub fn index_u64(&self, digest: u64) -> Option<usize> {
        let mut key = digest;
        for level in 0..self.levels() {
            let level_base = self.level_bases[level];
            let domain = (self.level_bases[level + 1] - level_base) as u64;
            let fingerprint = fastrange64(key, domain) as usize + level_base;
            let idx = fingerprint / Self::PAYLOAD;
            let bit = fingerprint % Self::PAYLOAD;
            let line = &self.bit_vector[idx];
            if line.is_set(bit) {
                let mut result = line.offset() + line.rank(bit);
                if UPPER {
                    result += self.upper_rank[idx / Self::SAMPLING];
                }
                return Some(result);
            }
            key = remix(key);
        }
        None
    }

    /// Number of peeling levels.
    #[inline]
    pub fn levels(&self) -> usize {
        self.level_bases.len() - 1
    }

    /// Number of keys in the constructed set.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the constructed set was empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Total storage footprint in bits, metadata and fixed overhead
    /// included.
    pub fn bits(&self) -> usize {
        let word = core::mem::size_of::<usize>();
        8 * (self.level_bases.len() * word
            + self.upper_rank.len() * word
            + self.bit_vector.len() * (CacheLine::<W, O>::LINE_BITS / 8)
            + core::mem::size_of::<Self>())
    }

    pub(crate) fn level_bases(&self) -> &[usize] {
        &self.level_bases
    }

    pub(crate) fn lines(&self) -> &[CacheLine<W, O>] {
        &self.bit_vector
    }

    /// Reassemble a structure from its serialized parts, rebuilding the
    /// upper rank tier and the key count in one pass over the lines. Every
    /// embedded offset is cross-checked against the recomputed running
    /// count, so a corrupted image fails here instead of answering
    /// queries wrong.
    pub(crate) fn from_parts(
        level_bases: Vec<usize>,
        bit_vector: Vec<CacheLine<W, O>>,
    ) -> Result<Self, ReadError> {
        let () = CacheLine::<W, O>::VALID;
        if level_bases.first() != Some(&0) {
            return Err(ReadError::Inconsistent);
        }
        for pair in level_bases.windows(2) {
            let span = pair[1].checked_sub(pair[0]).ok_or(ReadError::Inconsistent)?;
            if span == 0 || span % Self::PAYLOAD != 0 {
                return Err(ReadError::Inconsistent);
            }
        }
        let total_bits = *level_bases.last().unwrap_or(&0);
        if total_bits / Self::PAYLOAD != bit_vector.len() {
            return Err(ReadError::Inconsistent);
        }
        if !UPPER && bit_vector.len() >= Self::SAMPLING {
            // Offsets alone cannot index a full sampling stride; the
            // builder fails on the stride boundary itself, so no valid
            // image reaches it either.
            return Err(ReadError::Inconsistent);
        }

        let mut upper_rank = if UPPER { vec![0usize] } else { Vec::new() };
        let mut total = 0usize;
        let mut since_sample = 0usize;
        for (i, line) in bit_vector.iter().enumerate() {
            if line.offset() != since_sample {
                return Err(ReadError::Inconsistent);
            }
            let ones = line.payload_ones();
            total += ones;
            since_sample += ones;
            if UPPER && (i + 1) % Self::SAMPLING == 0 {
                upper_rank.push(total);
                since_sample = 0;
            }
        }

        Ok(Self {
            bit_vector,
            level_bases,
            upper_rank,
            n: total,
        })
    }
}

// =============================================================================
// Construction cursor
// =============================================================================

/// Emits cache lines in increasing global order during construction,
/// filling in offsets and upper-rank samples as line boundaries pass.
struct Cursor<const W: usize, const O: usize, const UPPER: bool> {
    lines: Vec<CacheLine<W, O>>,
    upper_rank: Vec<usize>,
    current: CacheLine<W, O>,
    current_idx: usize,
    /// Payload bits set since the last upper-rank sample.
    prefix_sum: usize,
}

impl<const W: usize, const O: usize, const UPPER: bool> Cursor<W, O, UPPER> {
    const SAMPLING: usize = sampling_stride(CacheLine::<W, O>::PAYLOAD_BITS, O);

    fn new() -> Self {
        Self {
            lines: Vec::new(),
            upper_rank: if UPPER { vec![0] } else { Vec::new() },
            current: CacheLine::new(),
            current_idx: 0,
            prefix_sum: 0,
        }
    }

    fn reserve_total(&mut self, total_lines: usize) {
        self.lines
            .reserve(total_lines.saturating_sub(self.lines.len()));
    }

    #[inline]
    fn set_bit(&mut self, idx_in_line: usize) {
        self.current.set_payload(idx_in_line);
        self.prefix_sum += 1;
    }

    /// Flush whole lines until the cursor sits on `target`.
    fn advance_to(&mut self, target: usize) -> Result<(), BuildError> {
        while self.current_idx < target {
            self.lines.push(self.current);
            self.current_idx += 1;
            if self.current_idx % Self::SAMPLING == 0 {
                if UPPER {
                    let last = self.upper_rank.last().copied().unwrap_or(0);
                    self.upper_rank.push(last + self.prefix_sum);
                    self.prefix_sum = 0;
                } else {
                    return Err(BuildError::OffsetOverflow);
                }
            }
            self.current = CacheLine::new();
            self.current.set_offset(self.prefix_sum);
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
