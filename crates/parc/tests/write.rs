use parc::{
    DataView, EntryCompression, ParArchive, ParEntry, ParFile, ParFolder, ReadOptions,
    WriteOptions,
};
use pretty_assertions::assert_eq;
use tracing::info;
use tracing_test::traced_test;

const SAMPLE_TEXT: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
    Sed pulvinar leo nec pulvinar pellentesque. Sed id dui et nisl tincidunt dignissim. \
    Suspendisse ullamcorper eget ipsum et vehicula. Maecenas scelerisque dapibus rutrum.";

/// Deterministic byte soup that should not compress.
fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 32) as u8
        })
        .collect()
}

fn file_with_date(name: &str, data: Vec<u8>, timestamp: u64) -> ParFile {
    let mut file = ParFile::new(name, data);
    file.timestamp = timestamp;
    file
}

fn sample_tree() -> ParFolder {
    let mut data = ParFolder::new("data");
    data.add_child(ParEntry::File(file_with_date(
        "a.txt",
        SAMPLE_TEXT.as_bytes().repeat(20),
        1_600_000_000,
    )));
    data.add_child(ParEntry::File(file_with_date(
        "b.bin",
        noise(3000),
        1_600_000_001,
    )));

    let mut deep = ParFolder::new("deep");
    deep.add_child(ParEntry::File(file_with_date(
        "c.txt",
        b"short".to_vec(),
        1_600_000_002,
    )));
    data.add_child(ParEntry::Folder(deep));

    let mut root = ParFolder::root();
    root.add_child(ParEntry::Folder(data));
    root.add_child(ParEntry::File(file_with_date(
        "top.bin",
        noise(100),
        1_600_000_003,
    )));
    root
}

/// Structural equality for trees that went through an encode/decode cycle:
/// paths, decompressed contents, attributes, and timestamps all survive.
fn assert_same_leaves(expected: &ParFolder, actual: &ParFolder) {
    let expected_walk = expected.walk();
    let actual_walk = actual.walk();

    assert_eq!(
        expected_walk.iter().map(|(path, _)| path).collect::<Vec<_>>(),
        actual_walk.iter().map(|(path, _)| path).collect::<Vec<_>>(),
    );

    for ((path, expected_entry), (_, actual_entry)) in expected_walk.iter().zip(&actual_walk) {
        assert_eq!(expected_entry.attributes(), actual_entry.attributes(), "{path}");

        if let (Some(expected_file), Some(actual_file)) =
            (expected_entry.as_file(), actual_entry.as_file())
        {
            info!("comparing {path}");
            assert_eq!(expected_file.timestamp, actual_file.timestamp, "{path}");
            assert_eq!(
                expected_file.contents().unwrap(),
                actual_file.contents().unwrap(),
                "{path}"
            );
        }
    }
}

#[traced_test]
#[test]
fn stored_tree_round_trips() -> miette::Result<()> {
    let tree = sample_tree();

    let bytes = parc::write(
        tree.clone(),
        &WriteOptions::builder()
            .compression(EntryCompression::None)
            .build(),
    )?;
    let archive = ParArchive::read(DataView::new(bytes), ReadOptions::builder().build())?;

    assert_same_leaves(&tree, archive.root());

    Ok(())
}

#[traced_test]
#[test]
fn compressed_trees_round_trip() -> miette::Result<()> {
    for compression in [EntryCompression::V1, EntryCompression::V2] {
        let tree = sample_tree();

        let bytes = parc::write(
            tree.clone(),
            &WriteOptions::builder().compression(compression).build(),
        )?;
        let archive = ParArchive::read(DataView::new(bytes), ReadOptions::builder().build())?;

        assert_same_leaves(&tree, archive.root());
    }

    Ok(())
}

#[traced_test]
#[test]
fn dot_wrapping_moves_the_tree_under_a_placeholder() -> miette::Result<()> {
    let bytes = parc::write(
        sample_tree(),
        &WriteOptions::builder()
            .compression(EntryCompression::None)
            .include_dots(true)
            .build(),
    )?;
    let archive = ParArchive::read(DataView::new(bytes), ReadOptions::builder().build())?;

    let children: Vec<&str> = archive.root().children().map(ParEntry::name).collect();
    assert_eq!(children, vec!["."]);

    let dot = archive.root().child(".").and_then(ParEntry::as_folder).unwrap();
    assert_same_leaves(&sample_tree(), dot);

    Ok(())
}

/// End-to-end scenario: a compressible text file, an incompressible
/// binary, and a nested archive side by side.
#[traced_test]
#[test]
fn nested_archive_scenario() -> miette::Result<()> {
    let mut data = ParFolder::new("data");
    data.add_child(ParEntry::File(ParFile::new(
        "a.txt",
        b"repeat repeat repeat repeat repeat repeat repeat! ".to_vec(),
    )));
    data.add_child(ParEntry::File(ParFile::new("b.bin", noise(3000))));

    let mut inner = ParFolder::new("inner.par");
    inner.add_child(ParEntry::File(ParFile::new(
        "nested.txt",
        SAMPLE_TEXT.as_bytes().to_vec(),
    )));

    let mut root = ParFolder::root();
    root.add_child(ParEntry::Folder(data));
    root.add_child(ParEntry::Folder(inner));

    let bytes = parc::write(root, &WriteOptions::builder().build())?;

    // Without recursion the nested archive stays an opaque file entry.
    let flat = ParArchive::read(DataView::new(bytes.clone()), ReadOptions::builder().build())?;
    let nested_entry = flat.root().child("inner.par").unwrap();
    assert!(nested_entry.as_file().is_some());

    let archive = ParArchive::read(
        DataView::new(bytes),
        ReadOptions::builder().recursive(true).build(),
    )?;

    let paths: Vec<String> = archive
        .root()
        .walk()
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(
        paths,
        vec![
            "data",
            "data/a.txt",
            "data/b.bin",
            "inner.par",
            "inner.par/nested.txt",
        ]
    );

    let a = archive
        .root()
        .entry_at_path("data/a.txt")
        .and_then(ParEntry::as_file)
        .unwrap();
    assert!(a.is_compressed, "repetitive text has to shrink");
    assert_eq!(
        a.contents()?.as_ref(),
        b"repeat repeat repeat repeat repeat repeat repeat! "
    );

    let b = archive
        .root()
        .entry_at_path("data/b.bin")
        .and_then(ParEntry::as_file)
        .unwrap();
    assert!(!b.is_compressed, "noise does not shrink");
    assert_eq!(b.contents()?.as_ref(), noise(3000));

    let nested = archive
        .root()
        .entry_at_path("inner.par/nested.txt")
        .and_then(ParEntry::as_file)
        .unwrap();
    assert_eq!(nested.contents()?.as_ref(), SAMPLE_TEXT.as_bytes());

    Ok(())
}

#[traced_test]
#[test]
fn rewriting_a_decoded_archive_reproduces_the_bytes() -> miette::Result<()> {
    let original = parc::write(sample_tree(), &WriteOptions::builder().build())?;

    let archive = ParArchive::read(DataView::new(original.clone()), ReadOptions::builder().build())?;
    let rewritten = parc::write(
        archive.into_root(),
        &WriteOptions::builder().build(),
    )?;

    assert_eq!(original, rewritten);

    Ok(())
}

/// Checks the index-range invariant directly on the encoded tables: every
/// descriptor range stays inside the global arrays, and every folder and
/// file index below the root is claimed exactly once.
#[traced_test]
#[test]
fn encoded_child_ranges_partition_the_tables() -> miette::Result<()> {
    let bytes = parc::write(
        sample_tree(),
        &WriteOptions::builder()
            .compression(EntryCompression::None)
            .build(),
    )?;

    let read_u32 = |offset: usize| u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap());

    let folder_count = read_u32(0x10) as usize;
    let folder_table_offset = read_u32(0x14) as usize;
    let file_count = read_u32(0x18) as usize;

    assert_eq!(folder_count, 3);
    assert_eq!(file_count, 4);

    let mut folder_claims = vec![0usize; folder_count];
    let mut file_claims = vec![0usize; file_count];
    folder_claims[0] = 1;

    for index in 0..folder_count {
        let record = folder_table_offset + index * 32;
        let sub_count = read_u32(record) as usize;
        let first_sub = read_u32(record + 4) as usize;
        let leaf_count = read_u32(record + 8) as usize;
        let first_leaf = read_u32(record + 12) as usize;

        assert!(first_sub + sub_count <= folder_count, "folder {index}");
        assert!(first_leaf + leaf_count <= file_count, "folder {index}");

        for claimed in first_sub..first_sub + sub_count {
            folder_claims[claimed] += 1;
        }
        for claimed in first_leaf..first_leaf + leaf_count {
            file_claims[claimed] += 1;
        }
    }

    assert_eq!(folder_claims, vec![1; folder_count]);
    assert_eq!(file_claims, vec![1; file_count]);

    Ok(())
}

/// Checks the data-placement policy on the encoded stream: small entries
/// pack into the current block, larger ones take the next sector boundary,
/// and every descriptor points at its bytes.
#[traced_test]
#[test]
fn data_offsets_follow_the_block_packing_policy() -> miette::Result<()> {
    let mut root = ParFolder::root();
    let contents: [Vec<u8>; 4] = [noise(100), noise(100), noise(3000), noise(100)];
    for (index, data) in contents.iter().enumerate() {
        root.add_child(ParEntry::File(ParFile::new(
            format!("f{index}"),
            data.clone(),
        )));
    }

    let bytes = parc::write(
        root,
        &WriteOptions::builder()
            .compression(EntryCompression::None)
            .build(),
    )?;

    let read_u32 = |offset: usize| u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap());

    let file_table_offset = read_u32(0x1C) as usize;
    let offsets: Vec<usize> = (0..4)
        .map(|index| read_u32(file_table_offset + index * 32 + 12) as usize)
        .collect();

    assert_eq!(offsets, vec![2048, 2148, 4096, 7096]);

    for (offset, data) in offsets.iter().zip(&contents) {
        assert_eq!(&bytes[*offset..offset + data.len()], data.as_slice());
    }

    // The stream itself ends on a sector boundary.
    assert_eq!(bytes.len() % 2048, 0);

    Ok(())
}
