//! Compression entry points for both scheme versions.

use bon::Builder;
use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::types::{Endianness, SllzHeader, Version, HEADER_SIZE};
use crate::window::find_match;

/// Largest slice the chunked scheme compresses at once.
const CHUNK_SIZE: usize = 0x10000;

/// Smallest input the chunked scheme accepts; anything shorter cannot
/// amortize the per-chunk framing.
pub const MIN_V2_INPUT: usize = 0x1B;

/// Options for how a stream should be compressed
#[derive(Debug, Clone, Copy, Builder)]
pub struct CompressOptions {
    /// The scheme version to apply
    #[builder(default)]
    pub version: Version,

    /// Byte order of the envelope fields
    #[builder(default)]
    pub endianness: Endianness,
}

/// Compresses `data` into a complete envelope-framed stream.
///
/// # Errors
///
/// Returns [`Error::UndersizedInput`] when [`Version::V2`] is requested for
/// an input shorter than [`MIN_V2_INPUT`] bytes.
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn compress(data: &[u8], options: CompressOptions) -> Result<Vec<u8>> {
    let payload = match options.version {
        Version::V1 => compress_v1(data),
        Version::V2 => compress_v2(data)?,
    };

    let header = SllzHeader {
        endianness: options.endianness,
        version: options.version,
        header_size: HEADER_SIZE,
        decompressed_size: data.len() as u32,
        compressed_size: (payload.len() + HEADER_SIZE as usize) as u32,
    };

    let mut output = Vec::with_capacity(HEADER_SIZE as usize + payload.len());
    header.write_to(&mut output)?;
    output.extend_from_slice(&payload);

    Ok(output)
}

/// Flag bits describing the token stream, packed MSB first in groups of
/// eight. A new flag byte slot is reserved as soon as a group fills, before
/// the bytes of the token that filled it, mirroring the decoder's eager
/// refill.
struct FlagWriter {
    position: usize,
    current: u8,
    bits: u8,
}

impl FlagWriter {
    fn new(output: &mut Vec<u8>) -> Self {
        output.push(0);
        FlagWriter {
            position: 0,
            current: 0,
            bits: 0,
        }
    }

    fn push(&mut self, bit: bool, output: &mut Vec<u8>) {
        if bit {
            self.current |= 1 << (7 - self.bits);
        }
        self.bits += 1;

        if self.bits == 8 {
            output[self.position] = self.current;
            self.current = 0;
            self.bits = 0;
            self.position = output.len();
            output.push(0);
        }
    }

    fn finish(self, output: &mut Vec<u8>) {
        output[self.position] = self.current;
    }
}

fn compress_v1(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() / 2 + 1);
    let mut flags = FlagWriter::new(&mut output);
    let mut position = 0;

    while position < data.len() {
        match find_match(data, position) {
            Some(found) => {
                flags.push(true, &mut output);

                let word = (((found.distance - 1) << 4) | ((found.length - 3) & 0x0F)) as u16;
                output.extend_from_slice(&word.to_le_bytes());

                position += found.length;
            }
            None => {
                flags.push(false, &mut output);
                output.push(data[position]);
                position += 1;
            }
        }
    }

    flags.finish(&mut output);
    output
}

fn compress_v2(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < MIN_V2_INPUT {
        return Err(Error::UndersizedInput(data.len()));
    }

    let mut output = Vec::new();

    for chunk in data.chunks(CHUNK_SIZE) {
        let compressed = zlib_compress(chunk)?;

        // The 3-byte field counts itself plus the 2-byte size that follows.
        let framed_size = compressed.len() + 5;
        output.push((framed_size >> 16) as u8);
        output.push((framed_size >> 8) as u8);
        output.push(framed_size as u8);
        output.write_u16::<BigEndian>((chunk.len() - 1) as u16)?;
        output.extend_from_slice(&compressed);
        output.extend_from_slice(&[0u8; 5]);
    }

    Ok(output)
}

fn zlib_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
