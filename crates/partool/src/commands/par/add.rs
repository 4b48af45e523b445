use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use parc::{DataView, ParArchive, ParEntry, ReadOptions, WriteOptions};
use std::path::PathBuf;
use tracing::info;

use crate::commands::par::{compression_from_level, read_directory, write_output};

#[derive(Args)]
pub struct AddArgs {
    /// An input PAR archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A directory with the files to add or replace
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target PAR archive
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// SLLZ algorithm applied to the added entries (0 stores everything)
    #[arg(short, long, default_value_t = 1)]
    compression: u8,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl AddArgs {
    pub fn handle(&self) -> Result<()> {
        let bytes = std::fs::read(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;

        // The dot-wrapping convention cannot be inferred from an empty
        // stream, so nothing sensible can be merged into one.
        if bytes.is_empty() {
            return Err(miette!(
                "`{}` is an empty file; use `partool par create` instead",
                self.file.display()
            ));
        }

        info!("reading {}", self.file.display());
        let archive = ParArchive::read(
            DataView::new(bytes),
            ReadOptions::builder().recursive(true).allow_empty(true).build(),
        )?;

        let include_dots = archive
            .root()
            .child(".")
            .is_some_and(|entry| entry.as_folder().is_some());
        let options = WriteOptions::builder()
            .compression(compression_from_level(self.compression)?)
            .platform_id(archive.platform_id)
            .endianness(archive.endianness)
            .version(archive.version)
            .build();

        info!("reading {}", self.directory.display());
        let incoming = read_directory(&self.directory)?;

        let mut root = archive.into_root();
        if include_dots {
            if let Some(ParEntry::Folder(dot)) = root.child_mut(".") {
                dot.merge(incoming);
            }
        } else {
            root.merge(incoming);
        }
        root.sort_children();

        info!("creating {}", self.output.display());
        let bytes = parc::write_with_progress(root, &options, &super::log_progress)?;

        write_output(&self.output, &bytes, self.overwrite)
    }
}
