//! The bit-packed data package and its positioned reader.
//!
//! A `Package` is an append-only stream of arbitrary-width bit fields plus a
//! list of out-of-band readout-cycle positions. Two matched write/read pairs
//! are provided:
//!
//! - `write`/`read` move multi-bit fields MSB-first: the first bit on the
//!   wire is the most significant bit of the value.
//! - `write_ex`/`read_ex` move fields LSB-first: bits are packed starting
//!   from the least significant bit of the value into progressively higher
//!   bit positions of each storage byte.
//!
//! `write` is realized as a sequence of single-bit `write_ex` calls, so the
//! two pairs share one physical bit order; mixing the pairs across a single
//! field is not meaningful.
//!
//! # Example
//! ```
//! use chip_codec_core::package::Package;
//!
//! let mut package = Package::new();
//! package.write(0b101, 3).unwrap();
//! package.write(0b11, 2).unwrap();
//!
//! let mut reader = package.reader();
//! assert_eq!(reader.read(3).unwrap(), 0b101);
//! assert_eq!(reader.read(2).unwrap(), 0b11);
//! ```

use crate::error::{PackageError, Result};

/// Number of bits in one storage byte.
const BITS_PER_ITEM: usize = 8;

/// Number of bits in the 64-bit transfer word.
pub const BITS_PER_WORD: usize = 64;

/// Bit mask covering the lowest `n_bits` bits of a 64-bit word.
fn mask(n_bits: usize) -> u64 {
    if n_bits >= BITS_PER_WORD {
        u64::MAX
    } else {
        (1u64 << n_bits) - 1
    }
}

/// Validate a (value, width) pair before writing.
fn check_value(value: u64, n_bits: usize) -> Result<()> {
    if n_bits > BITS_PER_WORD {
        return Err(PackageError::TooManyBits { requested: n_bits }.into());
    }
    if n_bits < BITS_PER_WORD {
        let max_value = mask(n_bits);
        if value > max_value {
            return Err(PackageError::ValueOutOfRange {
                value,
                n_bits,
                max_value,
            }
            .into());
        }
    }
    Ok(())
}

/// Append-only bit buffer with readout-cycle annotations.
///
/// # Invariants
/// - `end_position <= 8 * data.len()`
/// - `end_position > 8 * (data.len() - 1)` when `data` is non-empty
/// - `readout_positions` is monotonically non-decreasing
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Storage bytes; the last byte may be partially filled
    data: Vec<u8>,
    /// Logical end of the stream in bits
    end_position: usize,
    /// Readout-cycle annotations; never consumed by decoders
    readout_positions: Vec<usize>,
}

impl Package {
    /// Create an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full package size in bits.
    pub fn size(&self) -> usize {
        self.end_position
    }

    /// Underlying storage bytes (the last byte may be partially filled).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Readout-cycle positions recorded so far.
    pub fn readout_positions(&self) -> &[usize] {
        &self.readout_positions
    }

    /// Write `n_bits` of `value` MSB-first.
    ///
    /// The first bit appended is `(value >> (n_bits - 1)) & 1`.
    ///
    /// # Errors
    /// - `PackageError::TooManyBits` if `n_bits > 64`
    /// - `PackageError::ValueOutOfRange` if `value >= 2^n_bits`
    pub fn write(&mut self, value: u64, n_bits: usize) -> Result<()> {
        check_value(value, n_bits)?;
        for n in 0..n_bits {
            let shift = n_bits - n - 1;
            let bit = (value >> shift) & 1;
            self.write_ex(bit, 1)?;
        }
        Ok(())
    }

    /// Write `n_bits` of `value` LSB-first.
    ///
    /// Bits are taken from the least significant end of `value` and packed
    /// into the current byte starting at the current bit shift; a fresh
    /// zero-initialized byte is appended whenever the current one is full.
    ///
    /// # Errors
    /// Same as [`Package::write`].
    pub fn write_ex(&mut self, value: u64, n_bits: usize) -> Result<()> {
        check_value(value, n_bits)?;

        let mut n_written = 0;
        while n_written < n_bits {
            let current_shift = self.end_position % BITS_PER_ITEM;
            let byte_index = self.end_position / BITS_PER_ITEM;
            if byte_index == self.data.len() {
                self.data.push(0);
            }
            let n_to_write = (BITS_PER_ITEM - current_shift).min(n_bits - n_written);
            let bits = (value >> n_written) & mask(n_to_write);
            self.data[byte_index] |= (bits as u8) << current_shift;
            n_written += n_to_write;
            self.end_position += n_to_write;
        }
        Ok(())
    }

    /// Append the full bit content of another package, in 64-bit chunks
    /// through the MSB-first pair.
    pub fn append(&mut self, other: &Package) -> Result<()> {
        let mut reader = other.reader();
        while !reader.at_end() {
            let n_to_read = BITS_PER_WORD.min(other.size() - reader.position());
            let value = reader.read(n_to_read)?;
            self.write(value, n_to_read)?;
        }
        Ok(())
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn finalize_byte(&mut self) -> Result<()> {
        let n_written = self.end_position % BITS_PER_ITEM;
        if n_written != 0 {
            self.write(0, BITS_PER_ITEM - n_written)?;
        }
        Ok(())
    }

    /// Record the current end position as a readout-cycle boundary.
    ///
    /// This is an out-of-band annotation only; it does not change the bit
    /// stream and decoders never rely on it.
    pub fn next_readout_cycle(&mut self) {
        self.readout_positions.push(self.end_position);
    }

    /// Reader positioned at the beginning of the package.
    pub fn reader(&self) -> PackageReader<'_> {
        PackageReader {
            package: self,
            position: 0,
        }
    }

    /// Reader positioned at the end of the package.
    ///
    /// Useful together with [`PackageReader::rewind`] to consume trailers.
    pub fn reader_at_end(&self) -> PackageReader<'_> {
        PackageReader {
            package: self,
            position: self.end_position,
        }
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.end_position == other.end_position && self.data == other.data
    }
}

impl Eq for Package {}

/// Read-only cursor over a package, holding a bit position.
///
/// Equality ties a reader to both its package (by identity) and its
/// position; distances between readers of different packages are rejected.
#[derive(Debug, Clone, Copy)]
pub struct PackageReader<'a> {
    package: &'a Package,
    position: usize,
}

impl<'a> PackageReader<'a> {
    /// Current bit position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the reader reached the logical end of the package.
    pub fn at_end(&self) -> bool {
        self.position >= self.package.size()
    }

    /// Read `n_bits` MSB-first: the first bit of the stream becomes the most
    /// significant bit of the result.
    ///
    /// # Errors
    /// - `PackageError::TooManyBits` if `n_bits > 64`
    /// - `PackageError::UnexpectedEof` if fewer than `n_bits` bits remain
    pub fn read(&mut self, n_bits: usize) -> Result<u64> {
        self.read_with_flag(n_bits, false)
    }

    /// Like [`PackageReader::read`], but an exhausted stream yields zeros for
    /// the missing trailing bits and leaves the reader at the end.
    pub fn read_relaxed(&mut self, n_bits: usize) -> Result<u64> {
        self.read_with_flag(n_bits, true)
    }

    /// Read `n_bits` LSB-first: the first bit of the stream becomes the least
    /// significant bit of the result.
    ///
    /// # Errors
    /// Same as [`PackageReader::read`].
    pub fn read_ex(&mut self, n_bits: usize) -> Result<u64> {
        self.read_ex_with_flag(n_bits, false)
    }

    /// Like [`PackageReader::read_ex`], but an exhausted stream yields zeros
    /// for the missing bits and leaves the reader at the end.
    pub fn read_ex_relaxed(&mut self, n_bits: usize) -> Result<u64> {
        self.read_ex_with_flag(n_bits, true)
    }

    fn read_with_flag(&mut self, n_bits_requested: usize, use_zeros: bool) -> Result<u64> {
        let n_bits = self.check_available(n_bits_requested, use_zeros)?;

        let mut result = 0u64;
        for _ in 0..n_bits {
            result = (result << 1) | self.read_ex_with_flag(1, false)?;
        }
        Ok(pad_missing(result, n_bits_requested - n_bits))
    }

    fn read_ex_with_flag(&mut self, n_bits_requested: usize, use_zeros: bool) -> Result<u64> {
        let n_bits = self.check_available(n_bits_requested, use_zeros)?;

        let mut result = 0u64;
        let mut n_read = 0;
        while n_read < n_bits {
            let shift = self.position % BITS_PER_ITEM;
            let n_to_read = (BITS_PER_ITEM - shift).min(n_bits - n_read);
            let byte = self.package.data[self.position / BITS_PER_ITEM];
            let bits = ((byte >> shift) as u64) & mask(n_to_read);
            result |= bits << n_read;
            n_read += n_to_read;
            self.position += n_to_read;
        }
        Ok(pad_missing(result, n_bits_requested - n_bits))
    }

    /// Validate a read request and return the number of bits actually
    /// available to consume.
    fn check_available(&self, n_bits_requested: usize, use_zeros: bool) -> Result<usize> {
        if n_bits_requested > BITS_PER_WORD {
            return Err(PackageError::TooManyBits {
                requested: n_bits_requested,
            }
            .into());
        }
        let bits_left = self.package.size().saturating_sub(self.position);
        if n_bits_requested > bits_left && !use_zeros {
            return Err(PackageError::UnexpectedEof {
                requested: n_bits_requested,
                available: bits_left,
            }
            .into());
        }
        Ok(n_bits_requested.min(bits_left))
    }

    /// Move the reader forward by `delta` bits without reading.
    pub fn advance(&mut self, delta: usize) {
        self.position += delta;
    }

    /// Move the reader backward by `delta` bits.
    ///
    /// # Errors
    /// `PackageError::NegativeDelta` if `delta` exceeds the current position.
    pub fn rewind(&mut self, delta: usize) -> Result<()> {
        if delta > self.position {
            return Err(PackageError::NegativeDelta {
                delta,
                position: self.position,
            }
            .into());
        }
        self.position -= delta;
        Ok(())
    }

    /// Non-negative bit distance from `other` to `self`.
    ///
    /// # Errors
    /// - `PackageError::ReaderMismatch` if the readers reference different
    ///   packages
    /// - `PackageError::NegativeDelta` if `other` is ahead of `self`
    pub fn distance_from(&self, other: &PackageReader<'_>) -> Result<usize> {
        if !std::ptr::eq(self.package, other.package) {
            return Err(PackageError::ReaderMismatch.into());
        }
        if self.position < other.position {
            return Err(PackageError::NegativeDelta {
                delta: other.position - self.position,
                position: self.position,
            }
            .into());
        }
        Ok(self.position - other.position)
    }
}

impl PartialEq for PackageReader<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.package, other.package) && self.position == other.position
    }
}

impl Eq for PackageReader<'_> {}

/// Shift read bits up to make room for zero-filled missing low bits.
fn pad_missing(value: u64, n_missing: usize) -> u64 {
    if n_missing >= BITS_PER_WORD {
        0
    } else {
        value << n_missing
    }
}
