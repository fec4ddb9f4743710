//! Two-pass size and offset solver.
//!
//! The linearization dictionary declares byte offsets into a file whose
//! length it itself affects, so the layout is solved as estimate → measure →
//! finalize: every classified object is serialized once to record its exact
//! byte length, the variable-value sections (linearization dictionary,
//! first-page cross-reference section) are rendered from templates whose
//! numeric fields are 10-digit zero-padded so their lengths cannot change
//! when the final values are patched in, and the hint-stream length is
//! computed before offsets are assigned because the encoded table length
//! depends only on object sizes and counts, never on absolute positions.

use std::io::Write as _;

use indexmap::IndexMap;

use super::collect::ObjectSets;
use super::hints::{
    bits_needed, delta_encoding, HintTables, PageOffsetEntry, PageOffsetHeader, SharedObjectEntry,
    SharedObjectHeader,
};
use super::serializer::{header_len, write_eof, ObjectSerializer};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};

/// Largest value the 10-digit fixed-width offset fields can carry.
pub const FIXED_WIDTH_MAX: u64 = 9_999_999_999;

/// Cross-reference entry for the free-list head.
const FREE_ENTRY: &[u8] = b"0000000000 65535 f \n";

/// The solved byte layout of a linearized file.
///
/// Every field is final: emission only concatenates these buffers with the
/// re-serialized classified objects, verifying lengths as it goes.
#[derive(Debug)]
pub struct Layout {
    /// Measured envelope size of every classified object.
    pub sizes: IndexMap<ObjectRef, u64>,
    /// Byte position of every live object, ascending.
    pub positions: IndexMap<ObjectRef, u64>,
    /// Finalized linearization dictionary bytes.
    pub lin_dict_bytes: Vec<u8>,
    /// Finalized first-page cross-reference section bytes.
    pub first_page_xref_bytes: Vec<u8>,
    /// Finalized hint stream envelope bytes.
    pub hint_stream_bytes: Vec<u8>,
    /// Finalized main cross-reference section bytes.
    pub main_xref_bytes: Vec<u8>,
    /// Offset of the first-page `xref` keyword.
    pub first_page_xref_offset: u64,
    /// One past the last first-page-section object byte.
    pub end_of_first_page: u64,
    /// Offset of the hint stream envelope.
    pub hint_stream_offset: u64,
    /// Offset of the main `xref` keyword.
    pub main_xref_offset: u64,
    /// Total file length; the dictionary's `/L`.
    pub total_length: u64,
    /// Highest object number (the count of live objects).
    pub object_count: u32,
}

/// Serialize each object once and record its envelope length.
pub(crate) fn measure_sizes(
    doc: &Document,
    order: impl Iterator<Item = ObjectRef>,
) -> Result<IndexMap<ObjectRef, u64>> {
    let serializer = ObjectSerializer::compact();
    let mut sizes = IndexMap::new();
    for r in order {
        let obj = doc.get(r).ok_or(Error::DanglingReference(r))?;
        let len = serializer.serialize_indirect(r.id, r.gen, obj).len() as u64;
        sizes.insert(r, len);
    }
    Ok(sizes)
}

/// Solve the layout for a renumbered document.
///
/// `lin` and `hint` are the synthetic linearization-dictionary and
/// hint-stream objects; `sets` holds renumbered references.
pub(crate) fn solve(
    doc: &Document,
    sets: &ObjectSets,
    lin: ObjectRef,
    hint: ObjectRef,
    sizes: IndexMap<ObjectRef, u64>,
) -> Result<Layout> {
    let serializer = ObjectSerializer::compact();
    let page_count = sets.pages.len();
    let remaining_count: usize = sets.remaining.iter().map(Vec::len).sum();
    let object_count =
        (2 + sets.doc_level.len() + sets.first_page.len() + remaining_count + sets.shared.len())
            as u32;

    let page0 = sets.first_page[0];
    debug_assert_eq!(page0, sets.pages[0]);
    debug_assert_eq!(lin.id, 1);
    debug_assert_eq!(hint.id as usize, 2 + sets.doc_level.len() + sets.first_page.len());

    let root = doc.root().ok_or_else(|| Error::InvalidObjectType {
        expected: "Catalog reference".to_string(),
        found: "nothing".to_string(),
    })?;

    let first_shared_number = sets.shared.first().map(|r| r.id).unwrap_or(0);

    // Hint tables, provisional pass: the two absolute-offset header fields
    // are zero, which cannot change the encoded length.
    let tables = build_hint_tables(sets, &sizes, 0, first_shared_number, 0)?;
    let encoded = tables.encode();
    let hint_obj = hint_stream_object(&encoded.bytes, encoded.shared_table_offset);
    let hint_size = serializer.serialize_indirect(hint.id, hint.gen, &hint_obj).len() as u64;

    // Linearization dictionary, provisional pass.
    let lin_bytes = lin_dict_bytes(page0.id, page_count as u32, 0, 0, 0, 0, 0);
    let lin_size = lin_bytes.len() as u64;

    // First-page cross-reference section, provisional pass. It covers the
    // dense range 1..=k: the dictionary, document-level set, first-page set
    // and the hint stream.
    let first_page_span = 2 + sets.doc_level.len() + sets.first_page.len();
    let fp_zeros = vec![0u64; first_page_span];
    let fp_bytes = first_page_section(&fp_zeros, object_count, root, doc.info(), doc.id(), 0, 0);
    let fp_size = fp_bytes.len() as u64;

    // Offset assignment, in emission order.
    let mut positions: IndexMap<ObjectRef, u64> = IndexMap::new();
    let mut cursor = header_len(doc.version());
    positions.insert(lin, cursor);
    cursor += lin_size;
    let first_page_xref_offset = cursor;
    cursor += fp_size;
    for &r in sets.doc_level.iter().chain(&sets.first_page) {
        positions.insert(r, cursor);
        cursor += sizes[&r];
    }
    let end_of_first_page = cursor;
    let hint_stream_offset = cursor;
    positions.insert(hint, cursor);
    cursor += hint_size;
    for &r in sets.remaining.iter().flatten().chain(&sets.shared) {
        positions.insert(r, cursor);
        cursor += sizes[&r];
    }
    let main_xref_offset = cursor;

    let main_xref_bytes =
        main_section(&positions, object_count, root, doc.info(), doc.id(), main_xref_offset);
    let total_length = main_xref_offset + main_xref_bytes.len() as u64;

    // Nothing has touched the sink yet; refuse the layout outright if any
    // fixed-width field cannot hold its value.
    if total_length > FIXED_WIDTH_MAX {
        return Err(Error::FormatOverflow(total_length));
    }

    // Hint tables, final pass: identical except for the two offset fields.
    let page0_offset = to_u32(positions[&page0])?;
    let first_shared_offset = match sets.shared.first() {
        Some(r) => to_u32(positions[r])?,
        None => 0,
    };
    let tables = build_hint_tables(sets, &sizes, page0_offset, first_shared_number, first_shared_offset)?;
    let final_encoded = tables.encode();
    let hint_obj = hint_stream_object(&final_encoded.bytes, final_encoded.shared_table_offset);
    let hint_stream_bytes = serializer.serialize_indirect(hint.id, hint.gen, &hint_obj);
    if hint_stream_bytes.len() as u64 != hint_size {
        return Err(Error::LayoutDrift {
            object: hint,
            measured: hint_size,
            emitted: hint_stream_bytes.len() as u64,
        });
    }

    // `/T` points at the whitespace byte preceding the first entry of the
    // main table, i.e. the newline that ends the subsection header line.
    let subsection_header = format!("xref\n0 {}\n", object_count + 1);
    let t = main_xref_offset + subsection_header.len() as u64 - 1;

    let lin_dict_final = lin_dict_bytes(
        page0.id,
        page_count as u32,
        total_length,
        hint_stream_offset,
        hint_size,
        end_of_first_page,
        t,
    );
    debug_assert_eq!(lin_dict_final.len(), lin_bytes.len());

    let fp_positions: Vec<u64> = (1..=first_page_span as u32)
        .map(|id| positions[&ObjectRef::new(id, 0)])
        .collect();
    let first_page_xref_bytes = first_page_section(
        &fp_positions,
        object_count,
        root,
        doc.info(),
        doc.id(),
        main_xref_offset,
        first_page_xref_offset,
    );
    debug_assert_eq!(first_page_xref_bytes.len() as u64, fp_size);

    log::debug!(
        "layout solved: {} objects, first page ends at {}, hints at {} ({} bytes), main xref at {}, {} bytes total",
        object_count,
        end_of_first_page,
        hint_stream_offset,
        hint_size,
        main_xref_offset,
        total_length,
    );

    Ok(Layout {
        sizes,
        positions,
        lin_dict_bytes: lin_dict_final,
        first_page_xref_bytes,
        hint_stream_bytes,
        main_xref_bytes,
        first_page_xref_offset,
        end_of_first_page,
        hint_stream_offset,
        main_xref_offset,
        total_length,
        object_count,
    })
}

/// Render the linearization dictionary.
///
/// `/L`, `/H` and `/E`/`/T` carry 10-digit zero-padded values so the
/// rendered length is identical for placeholder and final values; `/O` and
/// `/N` are fixed before sizing and need no padding.
fn lin_dict_bytes(o: u32, n: u32, l: u64, h_off: u64, h_len: u64, e: u64, t: u64) -> Vec<u8> {
    format!(
        "1 0 obj\n<</Linearized 1/L {:010}/H [{:010} {:010}]/O {}/E {:010}/N {}/T {:010}>>\nendobj\n",
        l, h_off, h_len, o, e, n, t
    )
    .into_bytes()
}

/// Build the hint stream object around an encoded payload.
fn hint_stream_object(payload: &[u8], shared_table_offset: usize) -> Object {
    let mut dict = Dict::new();
    dict.insert("S".to_string(), Object::Integer(shared_table_offset as i64));
    Object::Stream {
        dict,
        data: bytes::Bytes::copy_from_slice(payload),
    }
}

/// Render the first-page cross-reference section: table, trailer,
/// `startxref`, `%%EOF`.
///
/// `/Prev` and the `startxref` operand are 10-digit zero-padded for the same
/// reason as the linearization dictionary: the section is sized before the
/// main table's position is known.
fn first_page_section(
    entry_positions: &[u64],
    object_count: u32,
    root: ObjectRef,
    info: Option<ObjectRef>,
    id: Option<&[Vec<u8>; 2]>,
    prev: u64,
    startxref: u64,
) -> Vec<u8> {
    let mut buf = format!("xref\n0 {}\n", entry_positions.len() + 1).into_bytes();
    buf.extend_from_slice(FREE_ENTRY);
    for &pos in entry_positions {
        write!(buf, "{:010} 00000 n \n", pos).unwrap();
    }
    write!(buf, "trailer\n<</Size {}/Root {} {} R", object_count + 1, root.id, root.gen).unwrap();
    if let Some(info) = info {
        write!(buf, "/Info {} {} R", info.id, info.gen).unwrap();
    }
    if let Some(id) = id {
        buf.extend_from_slice(b"/ID ");
        buf.extend(ObjectSerializer::compact().serialize(&id_array(id)));
    }
    write!(buf, "/Prev {:010}>>\n", prev).unwrap();
    write!(buf, "startxref\n{:010}\n%%EOF\n", startxref).unwrap();
    buf
}

/// Render the main cross-reference section: one subsection over every live
/// object, trailer (no `/Prev`), `startxref`, `%%EOF`.
fn main_section(
    positions: &IndexMap<ObjectRef, u64>,
    object_count: u32,
    root: ObjectRef,
    info: Option<ObjectRef>,
    id: Option<&[Vec<u8>; 2]>,
    main_xref_offset: u64,
) -> Vec<u8> {
    debug_assert_eq!(positions.len(), object_count as usize);
    let mut buf = format!("xref\n0 {}\n", object_count + 1).into_bytes();
    buf.extend_from_slice(FREE_ENTRY);
    let mut previous = 0;
    for (r, &pos) in positions {
        debug_assert!(r.id == previous + 1, "positions must be dense and ascending");
        previous = r.id;
        write!(buf, "{:010} 00000 n \n", pos).unwrap();
    }

    let mut trailer = Dict::new();
    trailer.insert("Size".to_string(), Object::Integer(object_count as i64 + 1));
    trailer.insert("Root".to_string(), Object::Reference(root));
    if let Some(info) = info {
        trailer.insert("Info".to_string(), Object::Reference(info));
    }
    if let Some(id) = id {
        trailer.insert("ID".to_string(), id_array(id));
    }
    buf.extend_from_slice(b"trailer\n");
    buf.extend(ObjectSerializer::compact().serialize(&Object::Dictionary(trailer)));
    buf.push(b'\n');
    write_eof(&mut buf, main_xref_offset).unwrap();
    buf
}

fn id_array(id: &[Vec<u8>; 2]) -> Object {
    Object::Array(vec![
        Object::String(id[0].clone()),
        Object::String(id[1].clone()),
    ])
}

/// Populate both hint tables from the solved sizes.
///
/// The content-stream and fractional-position fields are emitted in their
/// degenerate form: width-1 zero deltas and a zero-width numerator over
/// denominator 1.
fn build_hint_tables(
    sets: &ObjectSets,
    sizes: &IndexMap<ObjectRef, u64>,
    first_page_object_offset: u32,
    first_shared_number: u32,
    first_shared_offset: u32,
) -> Result<HintTables> {
    let section_of = |p: usize| -> &[ObjectRef] {
        if p == 0 {
            &sets.first_page
        } else {
            &sets.remaining[p - 1]
        }
    };

    let page_count = sets.pages.len();
    let mut object_counts = Vec::with_capacity(page_count);
    let mut page_lengths = Vec::with_capacity(page_count);
    for p in 0..page_count {
        let section = section_of(p);
        object_counts.push(section.len() as u32);
        let length: u64 = section.iter().map(|r| sizes[r]).sum();
        page_lengths.push(to_u32(length)?);
    }
    let (min_object_count, object_count_bits) = delta_encoding(&object_counts);
    let (min_page_length, page_length_bits) = delta_encoding(&page_lengths);

    let shared_refs: Vec<Vec<u32>> = (0..page_count)
        .map(|p| sets.shared_refs_of_page(p))
        .collect();
    let max_shared_count = shared_refs.iter().map(|v| v.len() as u32).max().unwrap_or(0);
    let max_shared_id = sets.shared.len().saturating_sub(1) as u32;

    let page_offset_entries = (0..page_count)
        .map(|p| PageOffsetEntry {
            object_count_delta: object_counts[p] - min_object_count,
            page_length_delta: page_lengths[p] - min_page_length,
            shared_refs: shared_refs[p].clone(),
            content_offset_delta: 0,
            content_length_delta: 0,
        })
        .collect();

    let page_offset_header = PageOffsetHeader {
        min_object_count,
        first_page_object_offset,
        object_count_bits,
        min_page_length,
        page_length_bits,
        min_content_offset: 0,
        content_offset_bits: 1,
        min_content_length: 0,
        content_length_bits: 1,
        shared_count_bits: bits_needed(max_shared_count),
        shared_id_bits: bits_needed(max_shared_id),
        numerator_bits: 0,
        denominator: 1,
    };

    let group_lengths: Vec<u32> = sets
        .shared
        .iter()
        .map(|r| to_u32(sizes[r]))
        .collect::<Result<_>>()?;
    let (min_group_length, group_length_bits) = delta_encoding(&group_lengths);
    let shared_object_entries = group_lengths
        .iter()
        .map(|&len| SharedObjectEntry {
            length_delta: len - min_group_length,
        })
        .collect();

    let shared_object_header = SharedObjectHeader {
        first_object_number: first_shared_number,
        first_object_offset: first_shared_offset,
        first_page_entries: 0,
        total_entries: sets.shared.len() as u32,
        min_group_length,
        group_length_bits,
    };

    Ok(HintTables {
        page_offset_header,
        page_offset_entries,
        shared_object_header,
        shared_object_entries,
    })
}

fn to_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::FormatOverflow(value))
}
