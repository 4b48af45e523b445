//! This library handles reading from and creating **PAR** archives used by
//! the *Yakuza* game series.
//!
//! # PAR Archive Format Documentation
//!
//! A PAR file is a hierarchical container: a fixed header, two name tables,
//! two descriptor tables, and a sector-aligned data region. Folders and
//! files live in separate, globally ordered tables; a folder addresses its
//! children purely as `(first index, count)` ranges into those tables,
//! assigned breadth first with the root at folder index 0.
//!
//! ## Header
//!
//! | Offset (bytes) | Field               | Description                                             |
//! |----------------|---------------------|---------------------------------------------------------|
//! | 0x0000         | Magic number        | 4 bytes: "PARC"                                         |
//! | 0x0004         | Platform            | 1 byte: platform marker, 0x02 for PC releases           |
//! | 0x0005         | Endianness          | 1 byte: 0 = little endian tables, otherwise big endian  |
//! | 0x0006         | Size flags          | 2 bytes: extended-size and relocation markers           |
//! | 0x0008         | Version             | 4 bytes: format generation, commonly 0x00020001         |
//! | 0x000C         | Data size           | 4 bytes: zero in the generations handled here           |
//! | 0x0010         | Folder count        | 4 bytes: number of folder descriptors, root included    |
//! | 0x0014         | Folder table offset | 4 bytes: offset of the folder descriptor table          |
//! | 0x0018         | File count          | 4 bytes: number of file descriptors                     |
//! | 0x001C         | File table offset   | 4 bytes: offset of the file descriptor table            |
//!
//! Every multi-byte field after the endianness byte honors it.
//!
//! ## Name tables
//!
//! Directly after the header: one fixed 64-byte slot per folder, then one
//! per file, NUL padded, in the same global order as the descriptor tables.
//! An empty folder name stands for the synthetic root placeholder `.`.
//!
//! ## Folder descriptors
//!
//! 32 bytes each: sub-folder count, first sub-folder index, file count,
//! first file index, attribute bitmask, and three reserved words.
//!
//! ## File descriptors
//!
//! 32 bytes each: compression flag (0x80000000 marks a compressed entry),
//! decompressed size, stored size, data offset low half, attribute bitmask,
//! data offset high half, and a 64-bit Unix timestamp. Compressed entries
//! hold a complete [`sllz`] stream.
//!
//! ## Data region
//!
//! File bytes are placed from the first 2048-byte boundary after the file
//! table. Entries larger than one sector start on a sector boundary;
//! smaller entries pack into the remainder of the current block until it
//! runs out. The stream is padded to a sector boundary at the end.
//!
//! ## Nested archives
//!
//! An entry whose name ends in `.par` may itself be a complete PAR stream,
//! optionally compressed. Recursive decoding substitutes such entries with
//! their decoded trees, and building turns folders named that way back into
//! nested archive entries.

pub mod error;
pub mod read;
pub mod tree;
pub mod types;
pub mod view;
pub mod write;

pub use error::{Error, Result};
pub use read::{ParArchive, ReadOptions};
pub use tree::{ParEntry, ParFile, ParFolder};
pub use view::DataView;
pub use write::{write, write_with_progress, EntryCompression, WriteEvent, WriteOptions};
