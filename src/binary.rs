//! Tagged binary serialization.
//!
//! # Layout
//!
//! Every integer is written as a little-endian `u64`, so images are
//! portable across word sizes and byte orders:
//!
//! ```text
//! u64              TAG (0xF1B5)
//! u64              number of level bases
//! u64 × n_bases    level bases
//! u64              number of cache lines
//! u64 × n_lines·W  cache-line words, low payload words first
//! ```
//!
//! The upper rank tier and the key count are not stored: loading rebuilds
//! both in a single pass over the lines, cross-checking every embedded
//! offset against the recomputed running count on the way. A corrupted or
//! mismatched image fails with a [`ReadError`] instead of answering
//! queries wrong.
//!
//! [`Mphf::to_bytes`]/[`Mphf::from_bytes`] work on byte slices; with the
//! `std` feature [`Mphf::write_to`]/[`Mphf::read_from`] wrap any
//! `io::Write`/`io::Read`.

#[cfg(not(test))]
use alloc::vec::Vec;

use crate::line::CacheLine;
use crate::mphf::Mphf;

/// Magic tag leading every serialized image.
pub const TAG: u64 = 0xF1B5;

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced when decoding a serialized image.
#[derive(Debug)]
pub enum ReadError {
    /// The leading tag did not match [`TAG`].
    BadTag(u64),
    /// The input ended before the declared structure was complete.
    Truncated,
    /// Structurally inconsistent image: bad sizes, unaligned or
    /// non-increasing level bases, offsets that contradict the bitmap, or
    /// a line count the offset width cannot index.
    Inconsistent,
    /// Underlying I/O failure.
    #[cfg(any(test, feature = "std"))]
    Io(std::io::Error),
}

impl core::fmt::Display for ReadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReadError::BadTag(found) => write!(f, "bad magic tag {found:#x}"),
            ReadError::Truncated => write!(f, "input ended mid-structure"),
            ReadError::Inconsistent => write!(f, "structurally inconsistent image"),
            #[cfg(any(test, feature = "std"))]
            ReadError::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ReadError::Truncated
        } else {
            ReadError::Io(e)
        }
    }
}

// =============================================================================
// Slice codec
// =============================================================================

struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn u64(&mut self) -> Result<u64, ReadError> {
        if self.bytes.len() < 8 {
            return Err(ReadError::Truncated);
        }
        let (head, tail) = self.bytes.split_at(8);
        self.bytes = tail;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(head);
        Ok(u64::from_le_bytes(buf))
    }

    fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl<const W: usize, const O: usize, const UPPER: bool> Mphf<W, O, UPPER> {
    /// Serialize into a byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let bases = self.level_bases();
        let lines = self.lines();
        let mut out = Vec::with_capacity(8 * (3 + bases.len() + lines.len() * W));
        out.extend_from_slice(&TAG.to_le_bytes());
        out.extend_from_slice(&(bases.len() as u64).to_le_bytes());
        for &base in bases {
            out.extend_from_slice(&(base as u64).to_le_bytes());
        }
        out.extend_from_slice(&(lines.len() as u64).to_le_bytes());
        for line in lines {
            for &word in line.words() {
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
        out
    }

    /// Decode from a byte slice. The slice must contain exactly one image;
    /// trailing bytes are rejected as inconsistent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReadError> {
        let mut reader = ByteReader { bytes };
        let tag = reader.u64()?;
        if tag != TAG {
            return Err(ReadError::BadTag(tag));
        }

        let n_bases = reader.u64()? as usize;
        if (n_bases as u64).saturating_mul(8) > reader.remaining() as u64 {
            return Err(ReadError::Truncated);
        }
        let mut bases = Vec::with_capacity(n_bases);
        for _ in 0..n_bases {
            bases.push(reader.u64()? as usize);
        }

        let n_lines = reader.u64()? as usize;
        if (n_lines as u64).saturating_mul(8 * W as u64) > reader.remaining() as u64 {
            return Err(ReadError::Truncated);
        }
        let mut lines = Vec::with_capacity(n_lines);
        for _ in 0..n_lines {
            let mut words = [0u64; W];
            for word in words.iter_mut() {
                *word = reader.u64()?;
            }
            lines.push(CacheLine::from_words(words));
        }

        if reader.remaining() != 0 {
            return Err(ReadError::Inconsistent);
        }
        Self::from_parts(bases, lines)
    }
}

// =============================================================================
// Stream wrappers
// =============================================================================

/// Declared-size ceilings for the stream path. A slice decode can check
/// declared sizes against the input length; a stream cannot, so anything
/// past these bounds is rejected before the read loops start.
#[cfg(any(test, feature = "std"))]
const MAX_STREAM_BASES: usize = 1 << 20;
#[cfg(any(test, feature = "std"))]
const MAX_STREAM_LINES: usize = 1 << 24;

#[cfg(any(test, feature = "std"))]
fn read_u64<R: std::io::Read>(reader: &mut R) -> Result<u64, ReadError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(any(test, feature = "std"))]
impl<const W: usize, const O: usize, const UPPER: bool> Mphf<W, O, UPPER> {
    /// Write the serialized image to a stream.
    pub fn write_to<Wr: std::io::Write>(&self, writer: &mut Wr) -> std::io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Read one serialized image from a stream. Bytes past the image are
    /// left unread.
    pub fn read_from<R: std::io::Read>(reader: &mut R) -> Result<Self, ReadError> {
        let tag = read_u64(reader)?;
        if tag != TAG {
            return Err(ReadError::BadTag(tag));
        }

        let n_bases = read_u64(reader)? as usize;
        if n_bases > MAX_STREAM_BASES {
            return Err(ReadError::Inconsistent);
        }
        let mut bases = Vec::with_capacity(n_bases);
        for _ in 0..n_bases {
            bases.push(read_u64(reader)? as usize);
        }

        let n_lines = read_u64(reader)? as usize;
        if n_lines > MAX_STREAM_LINES {
            return Err(ReadError::Inconsistent);
        }
        let mut lines = Vec::with_capacity(n_lines);
        for _ in 0..n_lines {
            let mut words = [0u64; W];
            for word in words.iter_mut() {
                *word = read_u64(reader)?;
            }
            lines.push(CacheLine::from_words(words));
        }
        Self::from_parts(bases, lines)
    }
}
