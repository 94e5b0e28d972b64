//! Crate-wide error type.
//!
//! Terminal write failures never reach this type: the output sink absorbs
//! them (see [`crate::program::output`]). What remains are OS-level failures
//! while setting up the terminal and caller mistakes against the element
//! arena or position parser.

use crate::element::ElementId;

/// Errors surfaced by fallible engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Raw mode, size query, or reader thread failure.
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A position or size expression could not be parsed.
    #[error("invalid dimension expression: {0:?}")]
    InvalidDimension(String),

    /// The element id does not refer to a live element.
    #[error("unknown element {0:?}")]
    UnknownElement(ElementId),

    /// The engine was already torn down.
    #[error("screen has been destroyed")]
    Destroyed,
}

pub type Result<T> = std::result::Result<T, Error>;
