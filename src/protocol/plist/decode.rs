use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::PlistValue;

const MAGIC: &[u8; 8] = b"bplist00";
const TRAILER_LEN: usize = 32;
const MAX_PREALLOC: usize = 1024;

/// Errors that can occur during plist decoding
#[derive(Debug, Error)]
pub enum PlistDecodeError {
    /// Payload does not start with `bplist00`
    #[error("invalid magic header")]
    InvalidMagic,

    /// A read ran past the end of the payload
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        have: usize,
    },

    /// Trailer describes an impossible layout
    #[error("invalid trailer")]
    InvalidTrailer,

    /// Unknown object marker byte
    #[error("invalid object type marker: 0x{0:02x}")]
    InvalidObjectMarker(u8),

    /// Object reference outside the offset table
    #[error("invalid object reference: {0}")]
    InvalidReference(u64),

    /// String bytes are not valid text
    #[error("string is not valid UTF-8/UTF-16")]
    InvalidString,

    /// Dictionary key is not a string
    #[error("dictionary key is not a string")]
    NonStringKey,

    /// Object graph references itself
    #[error("circular reference detected")]
    CircularReference,

    /// Integer does not fit in 64 bits
    #[error("integer overflow")]
    IntegerOverflow,
}

/// Decode binary plist data into a `PlistValue`
///
/// # Errors
///
/// Returns [`PlistDecodeError`] if the payload is truncated or malformed.
pub fn decode(data: &[u8]) -> Result<PlistValue, PlistDecodeError> {
    if data.len() < MAGIC.len() + TRAILER_LEN {
        return Err(PlistDecodeError::BufferTooSmall {
            needed: MAGIC.len() + TRAILER_LEN,
            have: data.len(),
        });
    }
    if &data[..MAGIC.len()] != MAGIC {
        return Err(PlistDecodeError::InvalidMagic);
    }

    let reader = Reader { data };
    let trailer_start = data.len() - TRAILER_LEN;
    let offset_size = usize::from(data[trailer_start + 6]);
    let ref_size = usize::from(data[trailer_start + 7]);
    let num_objects = reader.sized_uint(trailer_start + 8, 8)?;
    let root = reader.sized_uint(trailer_start + 16, 8)?;
    let table_start = reader.sized_uint(trailer_start + 24, 8)?;

    if !matches!(offset_size, 1 | 2 | 4 | 8) || !matches!(ref_size, 1 | 2 | 4 | 8) {
        return Err(PlistDecodeError::InvalidTrailer);
    }
    let count = usize::try_from(num_objects).map_err(|_| PlistDecodeError::InvalidTrailer)?;
    let table_start = usize::try_from(table_start).map_err(|_| PlistDecodeError::InvalidTrailer)?;
    let table_len = count
        .checked_mul(offset_size)
        .ok_or(PlistDecodeError::InvalidTrailer)?;
    reader.slice(table_start, table_len)?;

    let offsets = (0..count)
        .map(|i| reader.sized_uint(table_start + i * offset_size, offset_size))
        .collect::<Result<Vec<_>, _>>()?;

    let decoder = Decoder {
        reader,
        offsets,
        ref_size,
    };
    decoder.object(root, &mut HashSet::new())
}

#[derive(Clone, Copy)]
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn slice(&self, pos: usize, len: usize) -> Result<&'a [u8], PlistDecodeError> {
        let end = pos.checked_add(len).ok_or(PlistDecodeError::IntegerOverflow)?;
        self.data
            .get(pos..end)
            .ok_or(PlistDecodeError::BufferTooSmall {
                needed: end,
                have: self.data.len(),
            })
    }

    fn byte(&self, pos: usize) -> Result<u8, PlistDecodeError> {
        Ok(self.slice(pos, 1)?[0])
    }

    fn sized_uint(&self, pos: usize, size: usize) -> Result<u64, PlistDecodeError> {
        if size > 8 {
            return Err(PlistDecodeError::IntegerOverflow);
        }
        Ok(self
            .slice(pos, size)?
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}

struct Decoder<'a> {
    reader: Reader<'a>,
    offsets: Vec<u64>,
    ref_size: usize,
}

impl Decoder<'_> {
    fn object(&self, index: u64, seen: &mut HashSet<u64>) -> Result<PlistValue, PlistDecodeError> {
        if !seen.insert(index) {
            return Err(PlistDecodeError::CircularReference);
        }

        let offset = usize::try_from(index)
            .ok()
            .and_then(|i| self.offsets.get(i))
            .copied()
            .ok_or(PlistDecodeError::InvalidReference(index))?;
        let pos = usize::try_from(offset).map_err(|_| PlistDecodeError::InvalidReference(index))?;
        let marker = self.reader.byte(pos)?;

        let value = self.value(marker, pos + 1, seen)?;
        seen.remove(&index);
        Ok(value)
    }

    fn value(
        &self,
        marker: u8,
        pos: usize,
        seen: &mut HashSet<u64>,
    ) -> Result<PlistValue, PlistDecodeError> {
        let low = marker & 0x0F;
        match marker >> 4 {
            0x0 => match low {
                0x8 => Ok(PlistValue::Boolean(false)),
                0x9 => Ok(PlistValue::Boolean(true)),
                0x0 | 0xF => Ok(PlistValue::Data(Vec::new())),
                _ => Err(PlistDecodeError::InvalidObjectMarker(marker)),
            },
            0x1 => self.integer(pos, low),
            0x2 => self.real(pos, low),
            0x3 => {
                let bytes = self.reader.slice(pos, 8)?;
                Ok(PlistValue::Date(f64::from_bits(be_u64(bytes))))
            }
            0x4 => {
                let (len, start) = self.length(pos, low)?;
                Ok(PlistValue::Data(self.reader.slice(start, len)?.to_vec()))
            }
            0x5 => {
                let (len, start) = self.length(pos, low)?;
                let bytes = self.reader.slice(start, len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| PlistDecodeError::InvalidString)?;
                Ok(PlistValue::String(s.to_string()))
            }
            0x6 => {
                let (len, start) = self.length(pos, low)?;
                let byte_len = len.checked_mul(2).ok_or(PlistDecodeError::IntegerOverflow)?;
                let bytes = self.reader.slice(start, byte_len)?;
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units)
                    .map(PlistValue::String)
                    .map_err(|_| PlistDecodeError::InvalidString)
            }
            // UIDs only appear in keyed archives; surface them as plain integers
            0x8 => {
                let uid = self.reader.sized_uint(pos, usize::from(low) + 1)?;
                Ok(PlistValue::from(uid))
            }
            0xA => {
                let (count, start) = self.length(pos, low)?;
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
                for i in 0..count {
                    let index = self.reference(start, i)?;
                    items.push(self.object(index, seen)?);
                }
                Ok(PlistValue::Array(items))
            }
            0xD => {
                let (count, start) = self.length(pos, low)?;
                let mut dict = HashMap::with_capacity(count.min(MAX_PREALLOC));
                for i in 0..count {
                    let key = match self.object(self.reference(start, i)?, seen)? {
                        PlistValue::String(key) => key,
                        _ => return Err(PlistDecodeError::NonStringKey),
                    };
                    let value = self.object(self.reference(start, count + i)?, seen)?;
                    dict.insert(key, value);
                }
                Ok(PlistValue::Dictionary(dict))
            }
            _ => Err(PlistDecodeError::InvalidObjectMarker(marker)),
        }
    }

    fn reference(&self, start: usize, i: usize) -> Result<u64, PlistDecodeError> {
        self.reader.sized_uint(start + i * self.ref_size, self.ref_size)
    }

    fn integer(&self, pos: usize, exp: u8) -> Result<PlistValue, PlistDecodeError> {
        let len = 1usize << exp;
        let bytes = self.reader.slice(pos, len)?;
        match len {
            // 1, 2 and 4 byte integers are unsigned, 8 byte ones are signed
            1 | 2 | 4 => Ok(PlistValue::Integer(
                bytes.iter().fold(0i64, |acc, b| (acc << 8) | i64::from(*b)),
            )),
            8 => Ok(PlistValue::Integer(i64::from_be_bytes(to_array(bytes)))),
            16 => {
                let value = u128::from_be_bytes(to_array(bytes));
                u64::try_from(value)
                    .map(PlistValue::from)
                    .map_err(|_| PlistDecodeError::IntegerOverflow)
            }
            _ => Err(PlistDecodeError::IntegerOverflow),
        }
    }

    fn real(&self, pos: usize, exp: u8) -> Result<PlistValue, PlistDecodeError> {
        match exp {
            2 => {
                let bytes = self.reader.slice(pos, 4)?;
                Ok(PlistValue::Real(f64::from(f32::from_be_bytes(to_array(bytes)))))
            }
            3 => {
                let bytes = self.reader.slice(pos, 8)?;
                Ok(PlistValue::Real(f64::from_bits(be_u64(bytes))))
            }
            _ => Err(PlistDecodeError::InvalidObjectMarker(0x20 | exp)),
        }
    }

    /// Object length from the marker nibble, or from a trailing int object when 0xF
    fn length(&self, pos: usize, nibble: u8) -> Result<(usize, usize), PlistDecodeError> {
        if nibble != 0x0F {
            return Ok((usize::from(nibble), pos));
        }
        let marker = self.reader.byte(pos)?;
        if marker >> 4 != 0x1 {
            return Err(PlistDecodeError::InvalidObjectMarker(marker));
        }
        let size = 1usize << (marker & 0x0F);
        let len = self.reader.sized_uint(pos + 1, size)?;
        let len = usize::try_from(len).map_err(|_| PlistDecodeError::IntegerOverflow)?;
        Ok((len, pos + 1 + size))
    }
}

fn be_u64(bytes: &[u8]) -> u64 {
    u64::from_be_bytes(to_array(bytes))
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
