//! Decompression for both scheme versions.

use flate2::read::ZlibDecoder;
use std::io::{self, Read};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::types::{SllzHeader, Version};

/// Decompresses a complete envelope-framed stream.
///
/// # Errors
///
/// Returns [`Error::SizeMismatch`] when the payload does not produce exactly
/// the number of bytes the envelope declares.
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let header = SllzHeader::parse(data)?;

    let payload = data
        .get(header.header_size as usize..)
        .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;

    let expected = header.decompressed_size as usize;
    match header.version {
        Version::V1 => decompress_v1(payload, expected),
        Version::V2 => decompress_v2(payload, expected),
    }
}

/// Reads flag bits MSB first, refilling from the payload as soon as the
/// current byte is exhausted. The refill happens eagerly after the eighth
/// bit, before the bytes of the token that bit describes, because the
/// compressor reserves flag slots in exactly that position.
struct FlagReader {
    current: u8,
    bits: u8,
}

impl FlagReader {
    fn new(payload: &[u8], position: &mut usize) -> Result<Self> {
        let current = take(payload, position, 1)?[0];
        Ok(FlagReader { current, bits: 8 })
    }

    fn read_bit(&mut self, payload: &[u8], position: &mut usize) -> Result<bool> {
        let bit = self.current & 0x80 != 0;
        self.current <<= 1;
        self.bits -= 1;

        if self.bits == 0 {
            self.current = take(payload, position, 1)?[0];
            self.bits = 8;
        }

        Ok(bit)
    }
}

fn take<'a>(payload: &'a [u8], position: &mut usize, count: usize) -> Result<&'a [u8]> {
    let slice = position
        .checked_add(count)
        .and_then(|end| payload.get(*position..end))
        .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
    *position += count;
    Ok(slice)
}

fn decompress_v1(payload: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected);
    let mut position = 0;
    let mut flags = FlagReader::new(payload, &mut position)?;

    while output.len() < expected {
        if flags.read_bit(payload, &mut position)? {
            let word = take(payload, &mut position, 2)?;
            let word = u16::from_le_bytes([word[0], word[1]]);

            let distance = 1 + (word >> 4) as usize;
            let length = 3 + (word & 0x0F) as usize;

            if distance > output.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "backward reference beyond the start of the output",
                )
                .into());
            }

            // Copy forward one byte at a time so references into the bytes
            // being produced (distance < length) expand correctly.
            for _ in 0..length {
                let byte = output[output.len() - distance];
                output.push(byte);
            }
        } else {
            output.push(take(payload, &mut position, 1)?[0]);
        }
    }

    if output.len() != expected {
        return Err(Error::SizeMismatch {
            expected,
            actual: output.len(),
        });
    }

    Ok(output)
}

fn decompress_v2(payload: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected);
    let mut position = 0;

    while output.len() < expected {
        let size_field = take(payload, &mut position, 3)?;
        let stored_raw = size_field[0] & 0x80 != 0;
        let framed_size = ((size_field[0] & 0x7F) as usize) << 16
            | (size_field[1] as usize) << 8
            | size_field[2] as usize;

        let chunk_size = take(payload, &mut position, 2)?;
        let chunk_size = u16::from_be_bytes([chunk_size[0], chunk_size[1]]) as usize + 1;

        let body_size = framed_size.checked_sub(5).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "chunk smaller than its framing")
        })?;
        let body = take(payload, &mut position, body_size)?;

        if stored_raw {
            // Stored chunks carry their bytes verbatim. No known compressor
            // emits them, but the bit is part of the format.
            if body.len() != chunk_size {
                return Err(Error::SizeMismatch {
                    expected: chunk_size,
                    actual: body.len(),
                });
            }
            output.extend_from_slice(body);
        } else {
            let inflated = zlib_decompress(body)?;
            if inflated.len() != chunk_size {
                return Err(Error::SizeMismatch {
                    expected: chunk_size,
                    actual: inflated.len(),
                });
            }
            output.extend_from_slice(&inflated);
        }

        // Trailing padding after every chunk; past the end of the payload
        // after the final one, which no read follows.
        position += 5;
    }

    if output.len() != expected {
        return Err(Error::SizeMismatch {
            expected,
            actual: output.len(),
        });
    }

    Ok(output)
}

fn zlib_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut output)?;
    Ok(output)
}
