//! Decoding PAR archives into entry trees.

use binrw::{BinRead, Endian};
use bon::Builder;
use byteorder::ReadBytesExt;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::tree::{is_archive_name, ParEntry, ParFile, ParFolder};
use crate::types::{FileRecord, FolderRecord, ParHeader, MAGIC, NAME_SIZE};
use crate::view::DataView;

/// Options for how an archive stream should be decoded
#[derive(Debug, Clone, Copy, Builder)]
pub struct ReadOptions {
    /// Decode entries named with the archive extension as nested trees
    #[builder(default)]
    pub recursive: bool,

    /// Yield an empty tree for a zero-length stream instead of failing
    #[builder(default)]
    pub allow_empty: bool,
}

/// A decoded archive: the entry tree plus the header markers needed to
/// rewrite it faithfully.
///
/// ```no_run
/// fn list_contents(bytes: Vec<u8>) -> parc::error::Result<()> {
///     let archive = parc::ParArchive::read(
///         bytes.into(),
///         parc::ReadOptions::builder().recursive(true).build(),
///     )?;
///
///     for (path, entry) in archive.root().walk() {
///         if let Some(file) = entry.as_file() {
///             println!("{path}: {} bytes", file.decompressed_size);
///         }
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParArchive {
    /// Platform marker from the header.
    pub platform_id: u8,

    /// Endianness byte from the header; zero means little-endian tables.
    pub endianness: u8,

    /// Extended-size and relocation markers, preserved verbatim.
    pub size_flags: u16,

    /// Format generation marker.
    pub version: u32,

    root: ParFolder,
}

impl ParArchive {
    /// Decodes an archive stream.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroLengthArchive`] for an empty stream unless
    /// [`ReadOptions::allow_empty`] is set, [`Error::BadMagic`] when the
    /// stream opens with anything but `PARC`, and
    /// [`Error::IndexRangeViolation`] when a folder descriptor addresses
    /// children outside the tables.
    #[instrument(skip(data), fields(size = data.len()), err)]
    pub fn read(data: DataView, options: ReadOptions) -> Result<ParArchive> {
        if data.is_empty() {
            if options.allow_empty {
                return Ok(ParArchive {
                    platform_id: 0x02,
                    endianness: 0x01,
                    size_flags: 0,
                    version: 0x0002_0001,
                    root: ParFolder::root(),
                });
            }
            return Err(Error::ZeroLengthArchive);
        }

        let mut reader = Cursor::new(data.as_bytes());

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::BadMagic);
        }

        let platform_id = reader.read_u8()?;
        let endianness = reader.read_u8()?;
        let endian = if endianness == 0 {
            Endian::Little
        } else {
            Endian::Big
        };

        let header = ParHeader::read_options(&mut reader, endian, ())?;

        let folder_names = read_names(&mut reader, header.folder_count, true)?;
        let file_names = read_names(&mut reader, header.file_count, false)?;

        reader.seek(SeekFrom::Start(header.folder_table_offset as u64))?;
        let folder_records = (0..header.folder_count)
            .map(|_| FolderRecord::read_options(&mut reader, endian, ()).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        reader.seek(SeekFrom::Start(header.file_table_offset as u64))?;
        let file_records = (0..header.file_count)
            .map(|_| FileRecord::read_options(&mut reader, endian, ()).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        let files = file_names
            .into_iter()
            .zip(file_records)
            .map(|(name, record)| file_from_record(name, record, &data))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = TreeBuilder {
            records: &folder_records,
            names: &folder_names,
            folder_taken: vec![false; folder_records.len()],
            files: files.into_iter().map(Some).collect(),
            options,
        };
        let root = builder.build(0)?;

        Ok(ParArchive {
            platform_id,
            endianness,
            size_flags: header.size_flags,
            version: header.version,
            root,
        })
    }

    /// The root folder of the tree.
    pub fn root(&self) -> &ParFolder {
        &self.root
    }

    /// The root folder, mutably.
    pub fn root_mut(&mut self) -> &mut ParFolder {
        &mut self.root
    }

    /// Consumes the archive and returns its tree.
    pub fn into_root(self) -> ParFolder {
        self.root
    }
}

fn read_names(reader: &mut Cursor<&[u8]>, count: u32, folder: bool) -> Result<Vec<String>> {
    (0..count)
        .map(|_| {
            let mut slot = [0u8; NAME_SIZE];
            reader.read_exact(&mut slot)?;

            let end = slot.iter().rposition(|&byte| byte != 0).map_or(0, |p| p + 1);
            let name = String::from_utf8_lossy(&slot[..end]).into_owned();

            // An unnamed folder slot is the synthetic root placeholder.
            Ok(if folder && name.is_empty() {
                ".".to_owned()
            } else {
                name
            })
        })
        .collect()
}

fn file_from_record(name: String, record: FileRecord, data: &DataView) -> Result<ParFile> {
    let view = data
        .view(record.full_offset() as usize, record.data_size as usize)
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("data range of `{name}` reaches outside the stream"),
            )
        })?;

    Ok(ParFile {
        name,
        attributes: record.attributes,
        timestamp: record.timestamp,
        is_compressed: record.is_compressed(),
        // Whatever encoding the source archive chose must survive rewrites.
        can_be_compressed: false,
        decompressed_size: record.decompressed_size,
        data: view,
    })
}

struct TreeBuilder<'a> {
    records: &'a [FolderRecord],
    names: &'a [String],
    folder_taken: Vec<bool>,
    files: Vec<Option<ParFile>>,
    options: ReadOptions,
}

impl TreeBuilder<'_> {
    fn build(&mut self, index: usize) -> Result<ParFolder> {
        if self.folder_taken.get(index).copied() != Some(false) {
            return Err(Error::IndexRangeViolation { index });
        }
        self.folder_taken[index] = true;

        let record = self.records[index];
        let mut folder = ParFolder::new(self.names[index].clone());
        folder.attributes = record.attributes;
        folder.reserved = record.reserved;

        let first_folder = record.first_folder_index as usize;
        let folder_end = first_folder
            .checked_add(record.folder_count as usize)
            .filter(|&end| end <= self.records.len())
            .ok_or(Error::IndexRangeViolation { index })?;

        // Descriptors are laid out breadth first, so children always sit at
        // larger indices than their parent; anything else is a cycle.
        if record.folder_count > 0 && first_folder <= index {
            return Err(Error::IndexRangeViolation { index });
        }

        for child_index in first_folder..folder_end {
            let child = self.build(child_index)?;
            folder.add_child(ParEntry::Folder(child));
        }

        let first_file = record.first_file_index as usize;
        let file_end = first_file
            .checked_add(record.file_count as usize)
            .filter(|&end| end <= self.files.len())
            .ok_or(Error::IndexRangeViolation { index })?;

        for file_index in first_file..file_end {
            let file = self.files[file_index]
                .take()
                .ok_or(Error::IndexRangeViolation { index })?;

            let entry = if self.options.recursive && is_archive_name(&file.name) {
                self.decode_nested(file)?
            } else {
                ParEntry::File(file)
            };
            folder.add_child(entry);
        }

        Ok(folder)
    }

    fn decode_nested(&self, file: ParFile) -> Result<ParEntry> {
        let bytes = if file.is_compressed {
            DataView::from(sllz::decompress(file.data.as_bytes())?)
        } else {
            file.data.clone()
        };

        let nested = ParArchive::read(bytes, self.options)?;
        let mut folder = nested.into_root();
        folder.name = file.name;

        Ok(ParEntry::Folder(folder))
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::read::{ParArchive, ReadOptions};
    use crate::view::DataView;

    #[test]
    fn foreign_magic_is_rejected() {
        let archive = ParArchive::read(
            DataView::new(b"CRAP\x02\x01\x00\x00".to_vec()),
            ReadOptions::builder().build(),
        );

        assert!(matches!(archive, Err(Error::BadMagic)));
    }

    #[test]
    fn zero_length_stream_honors_the_policy() {
        let rejected = ParArchive::read(DataView::default(), ReadOptions::builder().build());
        assert!(matches!(rejected, Err(Error::ZeroLengthArchive)));

        let allowed = ParArchive::read(
            DataView::default(),
            ReadOptions::builder().allow_empty(true).build(),
        )
        .unwrap();
        assert!(allowed.root().is_empty());
    }

    #[test]
    fn truncated_header_is_an_io_error() {
        let archive = ParArchive::read(
            DataView::new(b"PARC\x02\x01".to_vec()),
            ReadOptions::builder().build(),
        );

        assert!(matches!(archive, Err(Error::BinRWError(_) | Error::IOError(_))));
    }
}
