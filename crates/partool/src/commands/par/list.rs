use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use parc::{DataView, ParArchive, ReadOptions};
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input PAR archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// List the contents of nested archives
    #[arg(short, long, default_value_t = false)]
    recursive: bool,

    /// Only list entries whose path contains this text
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
}

impl ListArgs {
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

            let date = chrono::DateTime::from_timestamp(file.timestamp as i64, 0)
                .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();

            if file.is_compressed {
                println!(
                    "{path}\t{} bytes\t{date}\t{}",
                    file.decompressed_size,
                    "sllz".cyan(),
                );
            } else {
                println!("{path}\t{} bytes\t{date}", file.decompressed_size);
            }
        }

        Ok(())
    }
}
