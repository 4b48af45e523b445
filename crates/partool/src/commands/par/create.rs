use clap::Args;
use miette::{miette, Result};
use parc::WriteOptions;
use std::path::PathBuf;
use tracing::info;

use crate::commands::par::{compression_from_level, read_directory, write_output};

#[derive(Args)]
pub struct CreateArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target PAR archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// SLLZ algorithm applied to eligible entries (0 stores everything)
    #[arg(short, long, default_value_t = 1)]
    compression: u8,

    /// Wrap the contents in a `.` folder, the layout of shipped archives
    #[arg(long, default_value_t = false)]
    dots: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl CreateArgs {
    pub fn handle(&self) -> Result<()> {
        if !self.directory.is_dir() {
            return Err(miette!("`{}` is not a directory", self.directory.display()));
        }

        info!("reading {}", self.directory.display());
        let root = read_directory(&self.directory)?;

        info!("creating {}", self.file.display());
        let options = WriteOptions::builder()
            .compression(compression_from_level(self.compression)?)
            .include_dots(self.dots)
            .build();

        let bytes = parc::write_with_progress(root, &options, &super::log_progress)?;

        write_output(&self.file, &bytes, self.overwrite)
    }
}
