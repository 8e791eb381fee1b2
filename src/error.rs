//! Error types for the PDF reorder library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF reorder library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed document bytes
    #[error("Could not parse PDF: {0}")]
    Parse(String),

    /// Document has no pages
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Reorder target outside the current page range
    #[error("Position {position} is out of range for {len} pages")]
    OutOfRange { position: usize, len: usize },

    /// Composition, serialization or write failure while saving
    #[error("Save failed: {0}")]
    Save(#[source] Box<Error>),

    /// Page selection passed to compose is not usable
    #[error("Invalid page selection: {0}")]
    PageSelection(String),

    /// Operation needs a loaded document
    #[error("No document loaded")]
    NoDocument,

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No PDF files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The session task is no longer running
    #[error("Session closed")]
    SessionClosed,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Wrap an error as a save failure, leaving existing save failures alone
    pub fn into_save_error(self) -> Self {
        match self {
            Error::Save(_) => self,
            other => Error::Save(Box::new(other)),
        }
    }
}
