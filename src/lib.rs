//! PDF Reorder Library
//!
//! Combine PDF documents, reorder their pages and export the result, with
//! debounced auto-save of the reordering state. This library provides:
//! - A page registry mapping stable page identities to display positions
//! - Drag-style insertion moves between positions
//! - An auto-save coordinator (debounce, skip-if-unchanged, status reporting)
//! - A lopdf-backed document service for merging and composing PDFs
//! - An async host runtime that runs saves off the caller's task
//!
//! # Example
//!
//! ```no_run
//! use pdf_reorder::{LopdfService, Session, SessionConfig};
//!
//! let mut session = Session::new(LopdfService, SessionConfig::default())?;
//! session.on_file_loaded(&std::fs::read("intro.pdf")?)?;
//! session.on_file_loaded(&std::fs::read("appendix.pdf")?)?;
//!
//! // Move the last page to the front
//! let last = session.registry().len() - 1;
//! session.on_page_dragged(last, 0)?;
//!
//! let bytes = session.on_save_requested()?;
//! std::fs::write("reorganized.pdf", bytes.as_slice())?;
//! # Ok::<(), pdf_reorder::Error>(())
//! ```

pub mod autosave;
pub mod config;
pub mod error;
pub mod host;
pub mod pdf;
pub mod preview;
pub mod registry;
pub mod reorder;
pub mod session;

// Re-export commonly used items
pub use autosave::{SaveStatus, StatusObserver};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use host::{spawn_session, SessionHandle, SessionSnapshot};
pub use pdf::{DocumentService, LopdfService};
pub use session::Session;
