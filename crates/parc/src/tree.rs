//! The in-memory folder/file tree of an archive.
//!
//! The on-disk format addresses children through index ranges into flat
//! descriptor tables; none of that leaks in here. Folders genuinely own
//! their children and the flat encoding stays a concern of the codec in
//! [`crate::read`] and [`crate::write`].

use indexmap::IndexMap;
use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::view::DataView;

/// Attribute bitmask given to folders without one of their own.
pub const FOLDER_ATTRIBUTES: u32 = 0x0000_0010;

/// Attribute bitmask given to files without one of their own.
pub const FILE_ATTRIBUTES: u32 = 0x0000_0020;

/// Extension marking an entry as a nested archive.
pub const ARCHIVE_EXTENSION: &str = ".par";

/// Whether `name` carries the nested-archive extension.
pub fn is_archive_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(ARCHIVE_EXTENSION)
}

/// A folder or file inside the archive tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParEntry {
    /// A folder owning an ordered set of children.
    Folder(ParFolder),
    /// A file leaf owning or borrowing its bytes.
    File(ParFile),
}

impl ParEntry {
    /// The entry's name.
    pub fn name(&self) -> &str {
        match self {
            ParEntry::Folder(folder) => &folder.name,
            ParEntry::File(file) => &file.name,
        }
    }

    /// The entry's platform attribute bitmask.
    pub fn attributes(&self) -> u32 {
        match self {
            ParEntry::Folder(folder) => folder.attributes,
            ParEntry::File(file) => file.attributes,
        }
    }

    /// This entry as a folder, if it is one.
    pub fn as_folder(&self) -> Option<&ParFolder> {
        match self {
            ParEntry::Folder(folder) => Some(folder),
            ParEntry::File(_) => None,
        }
    }

    /// This entry as a file, if it is one.
    pub fn as_file(&self) -> Option<&ParFile> {
        match self {
            ParEntry::Folder(_) => None,
            ParEntry::File(file) => Some(file),
        }
    }
}

/// A folder and its children, in insertion order.
///
/// Insertion order is serialization order; a child added under a name that
/// already exists replaces the old child in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ParFolder {
    /// Folder name, at most 64 bytes once encoded.
    pub name: String,

    /// Platform attribute bitmask.
    pub attributes: u32,

    /// Format-reserved descriptor words, preserved across round-trips.
    pub reserved: [u32; 3],

    pub(crate) children: IndexMap<String, ParEntry>,
}

impl ParFolder {
    /// Creates an empty folder.
    pub fn new(name: impl Into<String>) -> Self {
        ParFolder {
            name: name.into(),
            attributes: FOLDER_ATTRIBUTES,
            reserved: [0; 3],
            children: IndexMap::new(),
        }
    }

    /// Creates the synthetic root placeholder.
    pub fn root() -> Self {
        ParFolder::new(".")
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether this folder has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Adds a child, replacing and returning any previous one with the
    /// same name.
    pub fn add_child(&mut self, entry: ParEntry) -> Option<ParEntry> {
        self.children.insert(entry.name().to_owned(), entry)
    }

    /// A direct child by name.
    pub fn child(&self, name: &str) -> Option<&ParEntry> {
        self.children.get(name)
    }

    /// A mutable direct child by name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut ParEntry> {
        self.children.get_mut(name)
    }

    /// Iterates the direct children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &ParEntry> {
        self.children.values()
    }

    /// Iterates the direct children mutably.
    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut ParEntry> {
        self.children.values_mut()
    }

    /// The entry at a `/`-separated path below this folder.
    pub fn entry_at_path(&self, path: &str) -> Option<&ParEntry> {
        let mut parts = path.split('/').filter(|part| !part.is_empty());
        let first = parts.next()?;

        let mut current = self.child(first)?;
        for part in parts {
            current = current.as_folder()?.child(part)?;
        }

        Some(current)
    }

    /// Removes the entry at a `/`-separated path, pruning any ancestor
    /// folders the removal leaves empty. The pruning stops at this folder:
    /// the root itself survives even when the tree empties out completely.
    ///
    /// # Errors
    ///
    /// [`Error::RootRemovalRejected`] when the path names this folder and
    /// [`Error::NotFound`] when any component is absent.
    pub fn remove(&mut self, path: &str) -> Result<ParEntry> {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        if parts.is_empty() {
            return Err(Error::RootRemovalRejected);
        }

        remove_at(self, &parts).ok_or_else(|| Error::NotFound(path.to_owned()))
    }

    /// Merges another folder's children into this one. Folders meeting
    /// folders merge recursively; everything else replaces whatever held
    /// the name before.
    pub fn merge(&mut self, other: ParFolder) {
        for (name, entry) in other.children {
            match (self.children.get_mut(&name), entry) {
                (Some(ParEntry::Folder(mine)), ParEntry::Folder(theirs)) => mine.merge(theirs),
                (_, entry) => {
                    self.children.insert(name, entry);
                }
            }
        }
    }

    /// Sorts children at every level by their lowercased name.
    pub fn sort_children(&mut self) {
        self.children
            .sort_by(|left, _, right, _| left.to_lowercase().cmp(&right.to_lowercase()));

        for entry in self.children.values_mut() {
            if let ParEntry::Folder(folder) = entry {
                folder.sort_children();
            }
        }
    }

    /// Every entry below this folder as `(path, entry)` pairs, depth first,
    /// with `/` separators and no leading separator.
    pub fn walk(&self) -> Vec<(String, &ParEntry)> {
        let mut entries = Vec::new();
        self.walk_into("", &mut entries);
        entries
    }

    fn walk_into<'a>(&'a self, prefix: &str, entries: &mut Vec<(String, &'a ParEntry)>) {
        for entry in self.children.values() {
            let path = if prefix.is_empty() {
                entry.name().to_owned()
            } else {
                format!("{prefix}/{}", entry.name())
            };

            if let ParEntry::Folder(folder) = entry {
                entries.push((path.clone(), entry));
                folder.walk_into(&path, entries);
            } else {
                entries.push((path, entry));
            }
        }
    }
}

fn remove_at(folder: &mut ParFolder, parts: &[&str]) -> Option<ParEntry> {
    let (head, rest) = parts.split_first()?;

    if rest.is_empty() {
        return folder.children.shift_remove(*head);
    }

    let ParEntry::Folder(sub) = folder.children.get_mut(*head)? else {
        return None;
    };

    let removed = remove_at(sub, rest)?;
    if sub.is_empty() {
        folder.children.shift_remove(*head);
    }

    Some(removed)
}

/// A file leaf.
///
/// The bytes sit behind a [`DataView`]: decoded archives hand out windows
/// into the source stream, assembled trees own fresh buffers, and either
/// way the stored form may still be compressed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParFile {
    /// File name, at most 64 bytes once encoded.
    pub name: String,

    /// Platform attribute bitmask.
    pub attributes: u32,

    /// Seconds since the Unix epoch.
    pub timestamp: u64,

    /// Whether the stored bytes are compressed.
    pub is_compressed: bool,

    /// Whether building an archive may compress this entry. False for
    /// entries whose stored encoding must survive verbatim: anything read
    /// back out of an archive, and nested archives themselves.
    pub can_be_compressed: bool,

    /// Size of the data once decompressed.
    pub decompressed_size: u32,

    pub(crate) data: DataView,
}

impl ParFile {
    /// Creates a file entry owning `data` as its uncompressed contents.
    pub fn new(name: impl Into<String>, data: impl Into<DataView>) -> Self {
        let name = name.into();
        let data = data.into();
        ParFile {
            can_be_compressed: !is_archive_name(&name),
            name,
            attributes: FILE_ATTRIBUTES,
            timestamp: 0,
            is_compressed: false,
            decompressed_size: data.len() as u32,
            data,
        }
    }

    /// The stored bytes, compressed or not.
    pub fn data(&self) -> &DataView {
        &self.data
    }

    /// Size of the stored bytes.
    pub fn stored_size(&self) -> usize {
        self.data.len()
    }

    /// The file contents, decompressing the stored bytes when needed.
    pub fn contents(&self) -> Result<Cow<'_, [u8]>> {
        if self.is_compressed {
            Ok(Cow::Owned(sllz::decompress(self.data.as_bytes())?))
        } else {
            Ok(Cow::Borrowed(self.data.as_bytes()))
        }
    }
}
