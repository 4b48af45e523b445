use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use parc::{DataView, ParArchive, ReadOptions, WriteOptions};
use std::path::PathBuf;
use tracing::info;

use crate::commands::par::write_output;

#[derive(Args)]
pub struct RemoveArgs {
    /// An input PAR archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The `/`-separated path of the entry to remove
    #[arg(short, long, value_name = "PATH")]
    path: String,

    /// A target PAR archive
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl RemoveArgs {
    pub fn handle(&self) -> Result<()> {
        let bytes = std::fs::read(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;

        let archive = ParArchive::read(
            DataView::new(bytes),
            ReadOptions::builder().recursive(true).allow_empty(true).build(),
        )?;

        let options = WriteOptions::builder()
            .platform_id(archive.platform_id)
            .endianness(archive.endianness)
            .version(archive.version)
            .build();

        let mut root = archive.into_root();

        info!("removing {}", self.path);
        root.remove(&self.path)?;

        info!("creating {}", self.output.display());
        let bytes = parc::write_with_progress(root, &options, &super::log_progress)?;

        write_output(&self.output, &bytes, self.overwrite)
    }
}
