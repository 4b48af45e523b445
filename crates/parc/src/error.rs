//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`sllz::Error`]
    #[error(transparent)]
    Sllz(#[from] sllz::Error),

    /// stream does not start with the PARC magic
    #[error("stream does not start with the PARC magic")]
    BadMagic,

    /// the archive stream is empty
    #[error("the archive stream is empty")]
    ZeroLengthArchive,

    /// name does not fit in a 64-byte name slot
    #[error("name `{0}` does not fit in a 64-byte name slot")]
    NameTooLong(String),

    /// a folder descriptor addresses children outside the tables
    #[error("folder descriptor {index} addresses children outside the descriptor tables")]
    IndexRangeViolation {
        /// Index of the offending folder descriptor.
        index: usize,
    },

    /// requested path is absent
    #[error("`{0}` does not exist in the archive")]
    NotFound(String),

    /// the tree root cannot be removed
    #[error("the archive root cannot be removed")]
    RootRemovalRejected,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
