//! # Linehash
//!
//! Cache-line minimal perfect hashing for Rust.
//!
//! Given a static set of N distinct keys, [`Mphf`] maps every member to a
//! distinct integer in `[0, N)` while storing only a few bits per key. A
//! query reads a single cache line per probed level: each line embeds the
//! rank metadata needed to turn a set bit into a global rank, so the hot
//! path is one memory access, a handful of popcounts, and no data-dependent
//! branches inside the line.
//!
//! ## Structure
//!
//! - **Levels.** Construction peels the key set level by level: keys that
//!   land alone on a bit are done, colliding keys are remixed and carried
//!   to the next level. At the default load factor the carry-over shrinks
//!   geometrically, so almost all queries resolve in one or two probes.
//! - **Lines.** The bitmap is an array of fixed-size lines
//!   ([`CacheLine`]). The low `P` bits of a line are payload, the top `O`
//!   bits hold the count of payload bits since the last upper-rank sample.
//! - **Upper rank.** A second tier samples the cumulative count every
//!   `2^O / P` lines, so the embedded offsets never overflow.
//!
//! ## Quick Start
//!
//! ```
//! use linehash::Mphf;
//!
//! // Any distinct 64-bit digests work as keys.
//! let keys: Vec<u64> = (0..1000u64)
//!     .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15))
//!     .collect();
//!
//! let mph = Mphf::<4, 16>::from_digests(keys.clone(), 2.0).unwrap();
//!
//! let mut values: Vec<usize> = keys.iter().map(|&k| mph.index_u64(k).unwrap()).collect();
//! values.sort_unstable();
//! assert_eq!(values, (0..1000).collect::<Vec<_>>());
//! ```
//!
//! ## Parameters
//!
//! The line geometry is compile-time: `Mphf<W, O, UPPER>` uses lines of
//! `64·W` bits with an `O`-bit offset field (`W ∈ {1, 2, 4, 8, 16}`,
//! `O ∈ {16, 32}`). [`DefaultMphf`] picks 256-bit lines with 16-bit
//! offsets. The load factor γ is a runtime argument; larger γ costs space
//! and buys fewer levels.
//!
//! ## Caveats
//!
//! Keys must be distinct: an MPHF has no way to represent duplicates, and
//! construction will not terminate on them. Queries for keys outside the
//! constructed set return an unspecified result (possibly `None`, possibly
//! some member's value); callers that need a membership test must keep a
//! separate filter.
//!
//! ## Features
//!
//! - `std` (default) - stream serialization and `std::error::Error` impls
//! - `cli` (default) - the `linehash` benchmark driver binary

// Use no_std unless std feature is enabled or we're in test mode
#![cfg_attr(not(any(test, feature = "std")), no_std)]

// When using no_std, we need to explicitly link the alloc crate
#[cfg(not(any(test, feature = "std")))]
extern crate alloc;

// When using std, re-export alloc types from std for compatibility
#[cfg(any(test, feature = "std"))]
extern crate std as alloc;

// =============================================================================
// Core modules
// =============================================================================

/// Bit-mixing primitives shared by construction and queries.
pub mod hash;

/// Fixed-size cache-line bitmap with an embedded rank offset.
pub mod line;

/// Level-peeling construction, queries, and storage accounting.
pub mod mphf;

/// Tagged binary serialization.
pub mod binary;

// =============================================================================
// Public re-exports
// =============================================================================

pub use binary::ReadError;
pub use line::CacheLine;
pub use mphf::{BuildError, Mphf, DEFAULT_GAMMA};

/// Default variant: 256-bit lines, 16-bit offsets, upper rank enabled.
pub type DefaultMphf = Mphf<4>;
