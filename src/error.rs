//! Error types for the linearized writer.
//!
//! Every error is fatal to the current write: the caller must discard any
//! partial output and may not retry against the same sink.

/// Result type alias for linearization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while producing a linearized file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document has no pages; a linearized file needs a first page.
    #[error("document has no pages")]
    EmptyDocument,

    /// A reachable reference has no live target in the indirect-object table.
    #[error("dangling reference: {0}")]
    DanglingReference(crate::object::ObjectRef),

    /// A reference names an object number this document never allocated.
    ///
    /// Such references are skipped during closure computation but are fatal
    /// when they sit on a required path (catalog, pages tree, page).
    #[error("reference outside this document: {0}")]
    CrossDocumentReference(crate::object::ObjectRef),

    /// Second-pass emission produced a different byte length than the size
    /// pass measured. The sink is in an inconsistent state and must be
    /// discarded.
    #[error("layout drift at object {object}: measured {measured} bytes, emitted {emitted}")]
    LayoutDrift {
        /// Object whose emission disagreed with its measured size
        object: crate::object::ObjectRef,
        /// Byte length recorded by the size pass
        measured: u64,
        /// Byte length produced during emission
        emitted: u64,
    },

    /// The byte sink reported an I/O failure.
    #[error("sink I/O error: {0}")]
    Sink(#[from] std::io::Error),

    /// A computed offset or length does not fit the 10-decimal-digit
    /// fixed-width cross-reference fields (files of 10 GB or more) or a
    /// 32-bit hint-table header field.
    #[error("offset or length {0} does not fit a fixed-width field")]
    FormatOverflow(u64),

    /// An object on a required structural path has the wrong type.
    #[error("invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },
}
