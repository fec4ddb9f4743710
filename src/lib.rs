#![warn(missing_docs)]

//! # pdf_linearize
//!
//! A linearized ("fast web view") PDF writer per ISO 32000-1:2008 Annex F.
//!
//! Given an in-memory document (a graph of indirect objects rooted at a
//! catalog with an ordered page list), the writer reorders and renumbers the
//! live objects so a sequential reader can render the first page from the
//! file prefix alone, and emits the page-offset and shared-object hint
//! tables that let later pages be fetched with a single seek.
//!
//! ## What the writer does
//!
//! - Partitions the object graph by per-page transitive closure into
//!   document-level, first-page, per-remaining-page and shared sets.
//! - Solves the byte layout in two passes, using fixed-width numeric fields
//!   so the linearization dictionary's own size never changes between
//!   sizing and emission.
//! - Emits everything in one forward pass: header, linearization
//!   dictionary, first-page cross-reference section, first-page objects,
//!   hint stream, remaining pages, shared objects, main cross-reference
//!   table.
//!
//! ## Quick start
//!
//! ```ignore
//! use pdf_linearize::{Document, LinearizedWriter, Object};
//!
//! let mut doc = Document::new("1.4");
//! // ... insert pages, content streams, fonts, catalog ...
//! let bytes = LinearizedWriter::to_bytes(&mut doc)?;
//! std::fs::write("out.pdf", bytes)?;
//! ```
//!
//! Failures are fatal to the write: either the sink receives a complete,
//! valid linearized file or the partial output must be discarded.

// Error handling
pub mod error;

// Core object model
pub mod document;
pub mod object;

// Linearized writing
pub mod writer;

// Re-exports
pub use document::Document;
pub use error::{Error, Result};
pub use object::{Object, ObjectRef};
pub use writer::LinearizedWriter;

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_linearize");
    }
}
