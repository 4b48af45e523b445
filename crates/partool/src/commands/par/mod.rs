pub mod add;
pub mod create;
pub mod extract;
pub mod list;
pub mod remove;

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::UNIX_EPOCH;

use miette::{miette, Context, IntoDiagnostic, Result};
use parc::{EntryCompression, ParEntry, ParFile, ParFolder, WriteEvent};
use tracing::info;
use walkdir::WalkDir;

#[derive(clap::Subcommand)]
pub enum ParCommands {
    /// Show contents of a PAR archive
    List(list::ListArgs),
    /// Extract a PAR archive into a directory
    Extract(extract::ExtractArgs),
    /// Create a PAR archive from a directory
    Create(create::CreateArgs),
    /// Add or replace files in a PAR archive
    Add(add::AddArgs),
    /// Remove an entry from a PAR archive
    Remove(remove::RemoveArgs),
}

impl ParCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            ParCommands::List(list) => list.handle(),
            ParCommands::Extract(extract) => extract.handle(),
            ParCommands::Create(create) => create.handle(),
            ParCommands::Add(add) => add.handle(),
            ParCommands::Remove(remove) => remove.handle(),
        }
    }
}

pub(crate) fn log_progress(event: &WriteEvent) {
    match event {
        WriteEvent::NestedArchive(name) => info!("creating nested archive {name}"),
        WriteEvent::Compressing(name) => info!("compressing {name}"),
        WriteEvent::Compressed(_) => {}
    }
}

pub(crate) fn compression_from_level(level: u8) -> Result<EntryCompression> {
    match level {
        0 => Ok(EntryCompression::None),
        1 => Ok(EntryCompression::V1),
        2 => Ok(EntryCompression::V2),
        other => Err(miette!("unknown compression algorithm {other}")),
    }
}

/// Builds an entry tree from a directory walk. File timestamps come from
/// the filesystem modification times.
pub(crate) fn read_directory(directory: &Path) -> Result<ParFolder> {
    let mut root = ParFolder::root();

    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.into_diagnostic()?;
        let relative = entry
            .path()
            .strip_prefix(directory)
            .into_diagnostic()?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let mut components = Vec::new();
        for component in relative.components() {
            components.push(component.as_os_str().to_str().ok_or_else(|| {
                miette!("unable to convert {} to a string", relative.display())
            })?);
        }

        if entry.file_type().is_dir() {
            ensure_folder(&mut root, &components);
            continue;
        }

        let data = std::fs::read(entry.path())
            .into_diagnostic()
            .context(format!("opening {}", entry.path().display()))?;

        let mut file = ParFile::new(components[components.len() - 1], data);
        file.timestamp = entry
            .metadata()
            .into_diagnostic()?
            .modified()
            .into_diagnostic()?
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        ensure_folder(&mut root, &components[..components.len() - 1])
            .add_child(ParEntry::File(file));
    }

    Ok(root)
}

fn ensure_folder<'a>(root: &'a mut ParFolder, components: &[&str]) -> &'a mut ParFolder {
    let mut current = root;

    for name in components {
        // A file already holding the name is replaced, matching the
        // replace-by-name behavior everywhere else.
        if !matches!(current.child(name), Some(ParEntry::Folder(_))) {
            current.add_child(ParEntry::Folder(ParFolder::new(*name)));
        }

        current = match current.child_mut(name) {
            Some(ParEntry::Folder(folder)) => folder,
            _ => unreachable!("folder was just inserted"),
        };
    }

    current
}

pub(crate) fn write_output(path: &Path, bytes: &[u8], overwrite: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).into_diagnostic()?;
        }
    }

    let mut out = if !overwrite {
        File::create_new(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))?
    } else {
        File::create(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))?
    };

    out.write_all(bytes).into_diagnostic()?;

    Ok(())
}
