//! Base types for the on-disk structure of PAR archives.
//!
//! Every multi-byte field after the header's endianness byte honors that
//! byte, so these records carry no fixed byte order of their own and are
//! read and written with an explicit [`binrw::Endian`].

use binrw::{BinRead, BinWrite};

/// Magic bytes opening every archive.
pub const MAGIC: &[u8; 4] = b"PARC";

/// Size of the fixed header, including the magic.
pub const HEADER_SIZE: u32 = 32;

/// Size of one name slot in the name tables.
pub const NAME_SIZE: usize = 64;

/// Size of one folder descriptor.
pub const FOLDER_RECORD_SIZE: u32 = 32;

/// Size of one file descriptor.
pub const FILE_RECORD_SIZE: u32 = 32;

/// Alignment of the data region, matching the medium's block size.
pub const SECTOR_SIZE: u64 = 2048;

/// Compression flag value marking a file entry as compressed.
pub const COMPRESSED_FLAG: u32 = 0x8000_0000;

/// Header fields following the magic, platform, and endianness bytes.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ParHeader {
    /// Extended-size and relocation markers; preserved, never interpreted.
    pub size_flags: u16,

    /// Format generation marker.
    pub version: u32,

    /// Total data size field; the generations handled here leave it zero.
    pub data_size: u32,

    /// Number of folder descriptors, the synthetic root included.
    pub folder_count: u32,

    /// Offset of the folder descriptor table.
    pub folder_table_offset: u32,

    /// Number of file descriptors.
    pub file_count: u32,

    /// Offset of the file descriptor table.
    pub file_table_offset: u32,
}

/// One 32-byte folder descriptor.
///
/// Children are addressed as `(first index, count)` ranges into the global
/// breadth-first descriptor tables; folders own no pointers of their own.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    /// Number of sub-folders.
    pub folder_count: u32,

    /// Global index of the first sub-folder.
    pub first_folder_index: u32,

    /// Number of files directly inside this folder.
    pub file_count: u32,

    /// Global index of the first file.
    pub first_file_index: u32,

    /// Platform file-attribute bitmask.
    pub attributes: u32,

    /// Generation-dependent words, preserved verbatim.
    pub reserved: [u32; 3],
}

/// One 32-byte file descriptor.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// [`COMPRESSED_FLAG`] when the stored bytes are compressed.
    pub compression_flag: u32,

    /// Size of the data once decompressed.
    pub decompressed_size: u32,

    /// Size of the stored data.
    pub data_size: u32,

    /// Low 32 bits of the data offset.
    pub data_offset: u32,

    /// Platform file-attribute bitmask.
    pub attributes: u32,

    /// High 32 bits of the data offset.
    pub data_offset_high: u32,

    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

impl FileRecord {
    /// The full data offset reassembled from its split low and high fields.
    pub fn full_offset(&self) -> u64 {
        ((self.data_offset_high as u64) << 32) | self.data_offset as u64
    }

    /// Whether the stored bytes are compressed.
    pub fn is_compressed(&self) -> bool {
        self.compression_flag == COMPRESSED_FLAG
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite, Endian};
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{FileRecord, FolderRecord, ParHeader};

    #[test]
    fn read_big_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x00, 0x00,
            0x00, 0x02, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x01, 0x20,
            0x00, 0x00, 0x00, 0x03,
            0x00, 0x00, 0x01, 0x60,
        ]);

        let expected = ParHeader {
            size_flags: 0,
            version: 0x0002_0001,
            data_size: 0,
            folder_count: 2,
            folder_table_offset: 0x120,
            file_count: 3,
            file_table_offset: 0x160,
        };

        assert_eq!(ParHeader::read_options(&mut input, Endian::Big, ())?, expected);

        Ok(())
    }

    #[test]
    fn read_little_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x00, 0x00,
            0x01, 0x00, 0x02, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0xA0, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0xC0, 0x00, 0x00, 0x00,
        ]);

        let expected = ParHeader {
            size_flags: 0,
            version: 0x0002_0001,
            data_size: 0,
            folder_count: 1,
            folder_table_offset: 0xA0,
            file_count: 1,
            file_table_offset: 0xC0,
        };

        assert_eq!(
            ParHeader::read_options(&mut input, Endian::Little, ())?,
            expected
        );

        Ok(())
    }

    #[test]
    fn write_folder_record() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x04,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let record = FolderRecord {
            folder_count: 1,
            first_folder_index: 2,
            file_count: 4,
            first_file_index: 0,
            attributes: 0x10,
            reserved: [0; 3],
        };

        let mut actual = Cursor::new(Vec::new());
        record.write_options(&mut actual, Endian::Big, ())?;
        assert_eq!(actual.into_inner(), expected);

        Ok(())
    }

    #[test]
    fn read_compressed_file_record() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x80, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x10, 0x00,
            0x00, 0x00, 0x08, 0x00,
            0x00, 0x00, 0x08, 0x00,
            0x00, 0x00, 0x00, 0x20,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x00, 0x5F, 0x5E, 0x10, 0x00,
        ]);

        let record = FileRecord::read_options(&mut input, Endian::Big, ())?;

        assert!(record.is_compressed());
        assert_eq!(record.decompressed_size, 0x1000);
        assert_eq!(record.data_size, 0x800);
        assert_eq!(record.full_offset(), 0x1_0000_0800);
        assert_eq!(record.timestamp, 0x5F5E_1000);

        Ok(())
    }

    #[test]
    fn file_record_round_trips_both_endians() -> Result<()> {
        let record = FileRecord {
            compression_flag: 0,
            decompressed_size: 123,
            data_size: 123,
            data_offset: 2048,
            attributes: 0x20,
            data_offset_high: 0,
            timestamp: 1_600_000_000,
        };

        for endian in [Endian::Big, Endian::Little] {
            let mut bytes = Cursor::new(Vec::new());
            record.write_options(&mut bytes, endian, ())?;
            let bytes = bytes.into_inner();
            assert_eq!(bytes.len(), 32);

            let mut reader = Cursor::new(bytes);
            assert_eq!(FileRecord::read_options(&mut reader, endian, ())?, record);
        }

        Ok(())
    }
}
