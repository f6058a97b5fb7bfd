//! Error types surfaced by the engine.

use crate::cell::Species;
use crate::config::ConfigError;

/// Malformed save data. A load that produces one of these leaves the
/// previous world untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("save data is empty")]
    MissingHeader,
    #[error("header needs 4 fields (width height cellWidth cellHeight), found {found}")]
    BadHeader { found: usize },
    #[error("header field {index} is not a non-negative integer: {value:?}")]
    BadInteger { index: usize, value: String },
    #[error("grid of {width}x{height} cells is too large")]
    OversizedGrid { width: usize, height: usize },
    #[error("expected {expected} rows after the header, found {found}")]
    MissingRows { expected: usize, found: usize },
    #[error("row {row} has {found} tokens instead of {expected}")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown element type {0:?}")]
    UnknownElement(String),
    #[error("{species} state field {index} is missing")]
    MissingField { species: Species, index: usize },
    #[error("{species} state field {index} is invalid: {value:?}")]
    BadField {
        species: Species,
        index: usize,
        value: String,
    },
}

/// Top-level error for file-backed operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad save data: {0}")]
    Format(#[from] FormatError),
    #[error("bad config: {0}")]
    Config(#[from] ConfigError),
}
