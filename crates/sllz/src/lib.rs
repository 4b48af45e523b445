//! This library handles the **SLLZ** compression format used by the *Yakuza*
//! game series to shrink entries inside its PAR archives.
//!
//! # SLLZ Stream Documentation
//!
//! A compressed stream is a 16-byte envelope followed immediately by a
//! version-specific payload.
//!
//! ## Envelope
//!
//! | Offset (bytes) | Field               | Description                                          |
//! |----------------|---------------------|------------------------------------------------------|
//! | 0x0000         | Magic number        | 4 bytes: "SLLZ"                                      |
//! | 0x0004         | Endianness          | 1 byte: 0 = little endian, 1 = big endian            |
//! | 0x0005         | Version             | 1 byte: compression scheme, 1 or 2                   |
//! | 0x0006         | Header size         | 2 bytes: offset of the payload, always 0x10          |
//! | 0x0008         | Decompressed size   | 4 bytes: length of the original data                 |
//! | 0x000C         | Compressed size     | 4 bytes: length of the stream including the envelope |
//!
//! The endianness byte governs the envelope's own multi-byte fields. The
//! version 1 match word is always little endian and the version 2 chunk
//! framing is always big endian, regardless of the envelope setting.
//!
//! ## Version 1 payload
//!
//! A token stream guided by flag bits, packed MSB first into flag bytes of
//! eight tokens each:
//!
//! - **Flag 0**: one literal byte copied to the output.
//! - **Flag 1**: a little-endian 16-bit word encoding a backward reference:
//!   bits \[15:4\] hold `distance - 1` (1 to 4096) and bits \[3:0\] hold
//!   `length - 3` (3 to 18). The referenced run may overlap the bytes being
//!   produced; decoders copy forward one byte at a time.
//!
//! Decoding stops once the declared decompressed size has been produced.
//!
//! ## Version 2 payload
//!
//! The input is cut into chunks of at most 65536 bytes, each compressed as
//! an independent zlib stream and framed as:
//!
//! | Size (bytes) | Field                      | Description                                      |
//! |--------------|----------------------------|--------------------------------------------------|
//! | 3            | Framed size                | Big endian: compressed length + 5                |
//! | 2            | Decompressed size          | Big endian: chunk decompressed length - 1        |
//! | *n*          | Compressed bytes           | A zlib stream                                    |
//! | 5            | Padding                    | Zero bytes                                       |
//!
//! The high bit of the framed-size field marks a chunk stored without
//! compression; the decoder honors it, the compressor never emits it.
//! Inputs shorter than 0x1B bytes are rejected for version 2.

pub mod compress;
pub mod decompress;
pub mod error;
pub mod types;
pub mod window;

pub use compress::{compress, CompressOptions};
pub use decompress::decompress;
pub use error::{Error, Result};
pub use types::{Endianness, SllzHeader, Version};
