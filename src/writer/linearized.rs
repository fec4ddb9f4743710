//! Linearized file emission.
//!
//! [`LinearizedWriter`] drives the whole pipeline: partition the object
//! graph, renumber the live set into the linearized order, solve the byte
//! layout, then emit every region in strictly increasing offset order. The
//! writer never seeks; everything whose value is only known late (the
//! linearization dictionary's offsets, the first-page trailer's `/Prev`) is
//! rendered into fixed-width fields that were sized with placeholders.
//!
//! Emission order:
//! 1. header and binary marker
//! 2. linearization dictionary (object 1)
//! 3. first-page cross-reference table and trailer
//! 4. document-level objects, then first-page objects
//! 5. hint stream
//! 6. remaining pages' objects, page by page, then shared objects
//! 7. main cross-reference table, trailer, `startxref`, `%%EOF`

use std::collections::HashMap;
use std::io::Write;

use super::collect::{ObjectCollector, ObjectSets};
use super::layout::{self, Layout};
use super::serializer::{header_len, write_header, ObjectSerializer};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};

/// Write pipeline phases. Transitions are strictly forward; a failure in
/// any phase abandons the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Collected,
    Sized,
    LaidOut,
    Emitting,
    Done,
}

/// Writes a document as a linearized (fast-web-view) PDF.
///
/// The writer takes exclusive use of the document for the duration of the
/// write: the live set is renumbered in place, and two synthetic objects
/// (linearization dictionary, hint stream) join the table until the write
/// finishes. A failed write leaves the sink unusable; the document itself
/// stays consistent unless the process is torn down mid-renumber.
pub struct LinearizedWriter<'a> {
    doc: &'a mut Document,
    phase: Phase,
    synthetic: Option<(ObjectRef, ObjectRef)>,
}

impl<'a> LinearizedWriter<'a> {
    /// Create a writer over a document.
    pub fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            phase: Phase::Init,
            synthetic: None,
        }
    }

    /// Linearize a document into a byte vector.
    pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        LinearizedWriter::new(doc).write_to(&mut out)?;
        Ok(out)
    }

    /// Linearize into the given sink.
    ///
    /// On error the sink contents are not a valid PDF and must be
    /// discarded; no bytes at all are written for failures detected before
    /// emission (empty document, overflow, collection failures).
    pub fn write_to<W: Write>(mut self, sink: &mut W) -> Result<()> {
        let result = self.run(sink);
        if let Some((lin, hint)) = self.synthetic.take() {
            self.doc.remove(lin);
            self.doc.remove(hint);
        }
        result
    }

    fn run<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        let (sets, layout) = self.prepare()?;
        self.emit(&sets, &layout, sink)?;
        self.phase = Phase::Done;
        log::debug!("linearized write complete: {} bytes", layout.total_length);
        Ok(())
    }

    /// Collection through layout; nothing touches the sink here.
    fn prepare(&mut self) -> Result<(ObjectSets, Layout)> {
        debug_assert_eq!(self.phase, Phase::Init);
        let sets = ObjectCollector::new(self.doc).collect()?;
        self.phase = Phase::Collected;

        // The two synthetic objects join the table so renumbering covers
        // them; their table entries are placeholders, emission renders both
        // regions from the solved layout.
        let lin_seed = self.doc.insert(placeholder_lin_dict());
        let hint_seed = self.doc.insert(placeholder_hint_stream());
        self.synthetic = Some((lin_seed, hint_seed));

        let map = renumber_map(&sets, lin_seed, hint_seed);
        let lin = map[&lin_seed];
        let hint = map[&hint_seed];
        self.doc.renumber(&map);
        let sets = sets.renumbered(&map);
        self.synthetic = Some((lin, hint));

        let order: Vec<ObjectRef> = sets
            .doc_level
            .iter()
            .chain(&sets.first_page)
            .chain(sets.remaining.iter().flatten())
            .chain(&sets.shared)
            .copied()
            .collect();
        let sizes = layout::measure_sizes(self.doc, order.into_iter())?;
        self.phase = Phase::Sized;

        let layout = layout::solve(self.doc, &sets, lin, hint, sizes)?;
        self.phase = Phase::LaidOut;
        Ok((sets, layout))
    }

    /// Single forward pass over the sink.
    fn emit<W: Write>(&mut self, sets: &ObjectSets, layout: &Layout, sink: &mut W) -> Result<()> {
        debug_assert_eq!(self.phase, Phase::LaidOut);
        self.phase = Phase::Emitting;
        let serializer = ObjectSerializer::compact();

        write_header(sink, self.doc.version())?;
        let mut cursor = header_len(self.doc.version());

        sink.write_all(&layout.lin_dict_bytes)?;
        cursor += layout.lin_dict_bytes.len() as u64;

        debug_assert_eq!(cursor, layout.first_page_xref_offset);
        sink.write_all(&layout.first_page_xref_bytes)?;
        cursor += layout.first_page_xref_bytes.len() as u64;

        for &r in sets.doc_level.iter().chain(&sets.first_page) {
            cursor = self.emit_object(r, cursor, layout, &serializer, sink)?;
        }

        debug_assert_eq!(cursor, layout.hint_stream_offset);
        sink.write_all(&layout.hint_stream_bytes)?;
        cursor += layout.hint_stream_bytes.len() as u64;

        for &r in sets.remaining.iter().flatten().chain(&sets.shared) {
            cursor = self.emit_object(r, cursor, layout, &serializer, sink)?;
        }

        debug_assert_eq!(cursor, layout.main_xref_offset);
        sink.write_all(&layout.main_xref_bytes)?;
        cursor += layout.main_xref_bytes.len() as u64;
        debug_assert_eq!(cursor, layout.total_length);
        Ok(())
    }

    /// Serialize one object and verify it against the size pass.
    fn emit_object<W: Write>(
        &self,
        r: ObjectRef,
        cursor: u64,
        layout: &Layout,
        serializer: &ObjectSerializer,
        sink: &mut W,
    ) -> Result<u64> {
        let obj = self.doc.get(r).ok_or(Error::DanglingReference(r))?;
        let bytes = serializer.serialize_indirect(r.id, r.gen, obj);
        let measured = layout.sizes[&r];
        if bytes.len() as u64 != measured {
            return Err(Error::LayoutDrift {
                object: r,
                measured,
                emitted: bytes.len() as u64,
            });
        }
        debug_assert_eq!(cursor, layout.positions[&r]);
        sink.write_all(&bytes)?;
        Ok(cursor + measured)
    }
}

/// Dense renumbering in linearized order: dictionary, document-level set,
/// first-page set, hint stream, remaining pages, shared objects.
fn renumber_map(
    sets: &ObjectSets,
    lin: ObjectRef,
    hint: ObjectRef,
) -> HashMap<ObjectRef, ObjectRef> {
    std::iter::once(lin)
        .chain(sets.doc_level.iter().copied())
        .chain(sets.first_page.iter().copied())
        .chain(std::iter::once(hint))
        .chain(sets.remaining.iter().flatten().copied())
        .chain(sets.shared.iter().copied())
        .enumerate()
        .map(|(i, r)| (r, ObjectRef::new(i as u32 + 1, 0)))
        .collect()
}

fn placeholder_lin_dict() -> Object {
    Object::dict(vec![("Linearized", Object::Integer(1))])
}

fn placeholder_hint_stream() -> Object {
    Object::Stream {
        dict: Dict::new(),
        data: bytes::Bytes::new(),
    }
}
