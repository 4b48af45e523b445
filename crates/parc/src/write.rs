//! Encoding entry trees into PAR archives.
//!
//! Building runs as a two-stage pipeline: a parallel fan-out compressing
//! file leaves in isolation, then a single-threaded serialization pass. The
//! stages never overlap because every table offset depends on every leaf's
//! final stored length.

use binrw::{BinWrite, Endian};
use bon::Builder;
use rayon::prelude::*;
use sllz::CompressOptions;
use std::io::{Cursor, Write};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::tree::{is_archive_name, ParEntry, ParFile, ParFolder};
use crate::types::{
    FileRecord, FolderRecord, ParHeader, COMPRESSED_FLAG, FILE_RECORD_SIZE, FOLDER_RECORD_SIZE,
    HEADER_SIZE, MAGIC, NAME_SIZE, SECTOR_SIZE,
};
use crate::view::DataView;

/// Compression applied to eligible file entries while building.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EntryCompression {
    /// Store every entry as-is.
    None,

    /// Windowed byte compression.
    #[default]
    V1,

    /// Chunked zlib compression.
    V2,
}

impl EntryCompression {
    fn version(self) -> Option<sllz::Version> {
        match self {
            EntryCompression::None => None,
            EntryCompression::V1 => Some(sllz::Version::V1),
            EntryCompression::V2 => Some(sllz::Version::V2),
        }
    }
}

/// Options for how an archive should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct WriteOptions {
    /// Compression applied to eligible file entries
    #[builder(default)]
    pub compression: EntryCompression,

    /// Wrap the tree in a synthetic `.` folder, the layout convention of
    /// archives shipped with the games
    #[builder(default)]
    pub include_dots: bool,

    /// Header platform marker
    #[builder(default = 0x02)]
    pub platform_id: u8,

    /// Header endianness byte; zero writes little-endian tables
    #[builder(default = 0x01)]
    pub endianness: u8,

    /// Header format generation marker
    #[builder(default = 0x0002_0001)]
    pub version: u32,
}

/// Progress notifications emitted while building an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent {
    /// A folder named as an archive is about to be packed.
    NestedArchive(String),

    /// A file is about to be handed to the compressor.
    Compressing(String),

    /// A file went through the compressor; the result may have been kept
    /// or discarded per the size policy.
    Compressed(String),
}

/// Callback receiving [`WriteEvent`] notifications. Invoked from worker
/// threads during the compression stage.
pub type Progress<'a> = &'a (dyn Fn(&WriteEvent) + Sync);

/// Encodes a tree into a complete archive stream.
pub fn write(root: ParFolder, options: &WriteOptions) -> Result<Vec<u8>> {
    write_with_progress(root, options, &|_| {})
}

/// Encodes a tree into a complete archive stream, reporting progress.
///
/// Nothing is returned unless the whole build succeeds; there is no partial
/// output to clean up after a failure.
#[instrument(skip_all, err)]
pub fn write_with_progress(
    mut root: ParFolder,
    options: &WriteOptions,
    progress: Progress<'_>,
) -> Result<Vec<u8>> {
    if options.include_dots {
        root = wrap_in_dot(root);
    }

    pack_nested_archives(&mut root, options, progress)?;
    compress_entries(&mut root, options, progress)?;
    serialize(&root, options)
}

fn wrap_in_dot(mut root: ParFolder) -> ParFolder {
    let mut dot = ParFolder::new(".");
    std::mem::swap(&mut dot.children, &mut root.children);
    root.add_child(ParEntry::Folder(dot));
    root
}

/// Replaces every folder carrying the archive extension with a file entry
/// holding a fully built nested archive, depth first. Nested archives are
/// never compressed themselves.
fn pack_nested_archives(
    folder: &mut ParFolder,
    options: &WriteOptions,
    progress: Progress<'_>,
) -> Result<()> {
    let children = std::mem::take(&mut folder.children);

    for (name, entry) in children {
        let packed = match entry {
            ParEntry::Folder(sub) if is_archive_name(&sub.name) => {
                progress(&WriteEvent::NestedArchive(sub.name.clone()));

                let file_name = sub.name.clone();
                let bytes = write_with_progress(sub, options, progress)?;
                ParEntry::File(ParFile::new(file_name, bytes))
            }
            ParEntry::Folder(mut sub) => {
                pack_nested_archives(&mut sub, options, progress)?;
                ParEntry::Folder(sub)
            }
            file => file,
        };

        folder.children.insert(name, packed);
    }

    Ok(())
}

/// The parallel stage: every eligible leaf is compressed on the worker
/// pool against its own buffer, and the `try_for_each` join is the barrier
/// the serialization stage requires.
#[instrument(skip_all)]
fn compress_entries(
    root: &mut ParFolder,
    options: &WriteOptions,
    progress: Progress<'_>,
) -> Result<()> {
    let Some(version) = options.compression.version() else {
        return Ok(());
    };

    let mut leaves = Vec::new();
    collect_files(root, &mut leaves);

    leaves
        .into_par_iter()
        .try_for_each(|file| compress_file(file, version, progress))
}

fn collect_files<'a>(folder: &'a mut ParFolder, leaves: &mut Vec<&'a mut ParFile>) {
    for entry in folder.children_mut() {
        match entry {
            ParEntry::File(file) => leaves.push(file),
            ParEntry::Folder(sub) => collect_files(sub, leaves),
        }
    }
}

fn compress_file(file: &mut ParFile, version: sllz::Version, progress: Progress<'_>) -> Result<()> {
    if !file.can_be_compressed || file.is_compressed || file.data.is_empty() {
        return Ok(());
    }

    progress(&WriteEvent::Compressing(file.name.clone()));

    let original_len = file.data.len() as i64;
    match sllz::compress(
        file.data.as_bytes(),
        CompressOptions::builder().version(version).build(),
    ) {
        Ok(compressed) => {
            let saved = original_len - compressed.len() as i64;

            // A compressed entry has to pay for itself: small entries must
            // not grow, anything of a sector or more must save a sector.
            if saved >= 0 && (original_len < SECTOR_SIZE as i64 || saved >= SECTOR_SIZE as i64) {
                file.data = DataView::from(compressed);
                file.is_compressed = true;
            }
        }
        Err(sllz::Error::UndersizedInput(size)) => {
            debug!("storing `{}` uncompressed, {size} bytes is too small to chunk", file.name);
        }
        Err(err) => return Err(err.into()),
    }

    progress(&WriteEvent::Compressed(file.name.clone()));

    Ok(())
}

/// The sequential stage: breadth-first index assignment, table layout, and
/// the single forward write of the whole stream.
#[instrument(skip_all, err)]
fn serialize(root: &ParFolder, options: &WriteOptions) -> Result<Vec<u8>> {
    let mut folders: Vec<&ParFolder> = vec![root];
    let mut files: Vec<&ParFile> = Vec::new();
    let mut folder_records: Vec<FolderRecord> = Vec::new();

    // Visiting folders in the order they were appended makes every child
    // range contiguous in the global tables.
    let mut next = 0;
    while next < folders.len() {
        let folder = folders[next];
        next += 1;

        let mut record = FolderRecord {
            first_folder_index: folders.len() as u32,
            first_file_index: files.len() as u32,
            attributes: folder.attributes,
            reserved: folder.reserved,
            ..Default::default()
        };

        for entry in folder.children() {
            match entry {
                ParEntry::Folder(sub) => {
                    record.folder_count += 1;
                    folders.push(sub);
                }
                ParEntry::File(file) => {
                    record.file_count += 1;
                    files.push(file);
                }
            }
        }

        folder_records.push(record);
    }

    let name_table_size = (NAME_SIZE * (folders.len() + files.len())) as u32;
    let folder_table_offset = HEADER_SIZE + name_table_size;
    let file_table_offset = folder_table_offset + FOLDER_RECORD_SIZE * folders.len() as u32;
    let data_start = align(
        (file_table_offset + FILE_RECORD_SIZE * files.len() as u32) as u64,
        SECTOR_SIZE,
    );

    let file_records = place_files(&files, data_start);

    let endian = if options.endianness == 0 {
        Endian::Little
    } else {
        Endian::Big
    };

    let header = ParHeader {
        size_flags: 0,
        version: options.version,
        data_size: 0,
        folder_count: folders.len() as u32,
        folder_table_offset,
        file_count: files.len() as u32,
        file_table_offset,
    };

    let mut writer = Cursor::new(Vec::new());
    writer.write_all(MAGIC)?;
    writer.write_all(&[options.platform_id, options.endianness])?;
    header.write_options(&mut writer, endian, ())?;

    for folder in &folders {
        write_name(&mut writer, &folder.name)?;
    }
    for file in &files {
        write_name(&mut writer, &file.name)?;
    }

    for record in &folder_records {
        record.write_options(&mut writer, endian, ())?;
    }
    for record in &file_records {
        record.write_options(&mut writer, endian, ())?;
    }

    let mut output = writer.into_inner();
    for (record, file) in file_records.iter().zip(&files) {
        output.resize(record.full_offset() as usize, 0);
        output.extend_from_slice(file.data.as_bytes());
    }

    let padded = align(output.len() as u64, SECTOR_SIZE) as usize;
    output.resize(padded, 0);

    Ok(output)
}

/// Assigns every file its data offset, reproducing the block-packing
/// policy observable in shipped archives: entries over a sector force an
/// aligned start, smaller entries pack into the remainder of the current
/// block until it runs out.
fn place_files(files: &[&ParFile], data_start: u64) -> Vec<FileRecord> {
    let mut position = data_start;
    let mut block_remaining = 0u64;
    let mut records = Vec::with_capacity(files.len());

    for file in files {
        let stored = file.data.len() as u64;

        if stored > SECTOR_SIZE || stored >= block_remaining {
            block_remaining = SECTOR_SIZE - stored % SECTOR_SIZE;
            position = align(position, SECTOR_SIZE);
        } else {
            block_remaining -= stored;
        }

        records.push(FileRecord {
            compression_flag: if file.is_compressed { COMPRESSED_FLAG } else { 0 },
            decompressed_size: file.decompressed_size,
            data_size: stored as u32,
            data_offset: position as u32,
            attributes: file.attributes,
            data_offset_high: (position >> 32) as u32,
            timestamp: file.timestamp,
        });

        position += stored;
    }

    records
}

fn align(position: u64, alignment: u64) -> u64 {
    position.next_multiple_of(alignment)
}

fn write_name(writer: &mut Cursor<Vec<u8>>, name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_SIZE {
        return Err(Error::NameTooLong(name.to_owned()));
    }

    let mut slot = [0u8; NAME_SIZE];
    slot[..bytes.len()].copy_from_slice(bytes);
    writer.write_all(&slot)?;

    Ok(())
}
