pub mod par;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle PAR archives
    Par {
        #[command(subcommand)]
        command: par::ParCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Par { command } => command.handle(),
        }
    }
}
