//! Low-level reading of RHS header fields.
//!
//! Every multi-byte field in the header is little-endian. Strings use the Qt
//! `QString` serialisation: a `u32` byte count followed by UTF-16LE code
//! units, with `0xFFFFFFFF` marking a null string.

use crate::error::{Result, RhsError};
use byteorder::{ByteOrder, LittleEndian};

/// Length prefix that marks a null `QString`.
pub const QSTRING_NULL: u32 = 0xFFFF_FFFF;

/// Forward-only cursor over an immutable byte buffer.
///
/// A failed read leaves the position untouched and returns an error carrying
/// the offset it started at; callers abort the decode on any error.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consumes exactly `n` bytes.
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(RhsError::TruncatedInput {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    // ========================================================================
    // Fixed-width numeric fields
    // ========================================================================

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        self.take(2).map(LittleEndian::read_i16)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.take(4).map(LittleEndian::read_i32)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.take(4).map(LittleEndian::read_f32)
    }

    // ========================================================================
    // QString
    // Layout: [u32 byte length | 0xFFFFFFFF] [UTF-16LE code units]
    // ========================================================================

    /// Reads a length-prefixed UTF-16 string.
    ///
    /// The null sentinel yields an empty string after consuming only the
    /// prefix. An odd byte length reads `len / 2` code units. Unpaired
    /// surrogates are replaced with U+FFFD.
    pub fn read_qstring(&mut self) -> Result<String> {
        let start = self.pos;
        let length = self.read_u32()?;
        if length == QSTRING_NULL {
            return Ok(String::new());
        }

        let available = self.remaining();
        if length as usize > available {
            self.pos = start;
            return Err(RhsError::MalformedLength {
                offset: start,
                declared: length,
                available,
            });
        }

        let units = length as usize / 2;
        let bytes = self.take(units * 2)?;
        let mut code_units = vec![0u16; units];
        LittleEndian::read_u16_into(bytes, &mut code_units);
        Ok(String::from_utf16_lossy(&code_units))
    }
}
