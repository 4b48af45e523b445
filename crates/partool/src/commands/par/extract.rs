use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use parc::{DataView, ParArchive, ReadOptions};
use std::{fs::File, io::Write, path::PathBuf};
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input PAR archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Unpack nested archives into directories named after them
    #[arg(short, long, default_value_t = false)]
    recursive: bool,

    /// Only extract files whose path contains this text
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,

    /// Allow overwriting the target files
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let bytes = std::fs::read(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;

        let archive = ParArchive::read(
            DataView::new(bytes),
            ReadOptions::builder().recursive(self.recursive).build(),
        )?;

        for (path, entry) in archive.root().walk() {
            let Some(file) = entry.as_file() else {
                continue;
            };

            if let Some(filter) = &self.filter {
                if !path.contains(filter.as_str()) {
                    continue;
                }
            }

            let target = self.directory.join(path.split('/').collect::<PathBuf>());
            info!("writing {}", target.display());

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).into_diagnostic()?;
            }

            let mut out = if !self.overwrite {
                File::create_new(&target)
                    .into_diagnostic()
                    .context(format!("creating {}", &target.display()))?
            } else {
                File::create(&target)
                    .into_diagnostic()
                    .context(format!("creating {}", &target.display()))?
            };

            out.write_all(&file.contents()?).into_diagnostic()?;
        }

        Ok(())
    }
}
