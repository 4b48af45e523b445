//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// stream does not start with the SLLZ magic
    #[error("stream does not start with the SLLZ magic")]
    BadMagic,

    /// compression version is not 1 or 2
    #[error("unsupported compression version {0}")]
    UnsupportedVersion(u8),

    /// input below the minimum size for the chunked scheme
    #[error("input of {0} bytes is too small for chunked compression")]
    UndersizedInput(usize),

    /// decompressed output disagrees with the declared length
    #[error("decompressed {actual} bytes but the header declares {expected}")]
    SizeMismatch {
        /// Length declared by the envelope or chunk header.
        expected: usize,
        /// Length actually produced.
        actual: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
