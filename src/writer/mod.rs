//! Linearized PDF writing pipeline.
//!
//! ## Architecture
//!
//! ```text
//! Document
//!     ↓
//! [ObjectCollector] (page closures → doc-level / first-page / shared sets)
//!     ↓
//! [Layout] (size pass → offsets → hint tables → fixed-width templates)
//!     ↓
//! [LinearizedWriter] (renumber + single forward emission pass)
//!     ↓
//! [ObjectSerializer / BitWriter] (tokens and bit-packed hint data)
//!     ↓
//! linearized PDF bytes
//! ```
//!
//! ```ignore
//! use pdf_linearize::{Document, LinearizedWriter};
//!
//! let mut doc: Document = build_document()?;
//! let bytes = LinearizedWriter::to_bytes(&mut doc)?;
//! ```

pub mod bits;
pub mod collect;
pub mod hints;
pub mod layout;
pub mod linearized;
pub mod serializer;

pub use bits::BitWriter;
pub use collect::{ObjectCollector, ObjectSets};
pub use hints::{
    bits_needed, delta_encoding, EncodedHints, HintTables, PageOffsetEntry, PageOffsetHeader,
    SharedObjectEntry, SharedObjectHeader,
};
pub use layout::{Layout, FIXED_WIDTH_MAX};
pub use linearized::LinearizedWriter;
pub use serializer::{write_eof, write_header, ObjectSerializer};
