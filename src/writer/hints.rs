//! Hint table encoding.
//!
//! A linearized file carries a hint stream whose payload is the Page Offset
//! Hint Table followed by the Shared Object Hint Table (ISO 32000-1:2008,
//! Annex F). Both tables are a byte-aligned header of big-endian integers
//! followed by bit-packed arrays. Each array runs contiguously across all
//! pages (or entries) before the next array starts; field widths come from
//! the header and every delta is relative to a per-table minimum.

use super::bits::BitWriter;

/// Page Offset Hint Table header.
///
/// Field order and widths follow Annex F Table F.3; the three content-stream
/// related fields and the fractional-position pair are emitted in their
/// degenerate form (see the shipped defaults in the layout solver).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOffsetHeader {
    /// Least number of objects in any page.
    pub min_object_count: u32,
    /// Byte offset of the first page's page object.
    pub first_page_object_offset: u32,
    /// Bits per object-count delta.
    pub object_count_bits: u16,
    /// Least page length in bytes.
    pub min_page_length: u32,
    /// Bits per page-length delta.
    pub page_length_bits: u16,
    /// Least content-stream offset.
    pub min_content_offset: u32,
    /// Bits per content-stream-offset delta.
    pub content_offset_bits: u16,
    /// Least content-stream length.
    pub min_content_length: u32,
    /// Bits per content-stream-length delta.
    pub content_length_bits: u16,
    /// Bits per shared-object-reference count.
    pub shared_count_bits: u16,
    /// Bits per shared-object identifier.
    pub shared_id_bits: u16,
    /// Bits per fractional-position numerator.
    pub numerator_bits: u16,
    /// Fractional-position denominator.
    pub denominator: u16,
}

/// One page's worth of Page Offset Hint Table data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOffsetEntry {
    /// Object count minus the table minimum.
    pub object_count_delta: u32,
    /// Page byte length minus the table minimum.
    pub page_length_delta: u32,
    /// Shared-object identifiers referenced from this page, in shared-table
    /// order. Identifiers are zero-based indices into the shared table.
    pub shared_refs: Vec<u32>,
    /// Content-stream offset minus the table minimum.
    pub content_offset_delta: u32,
    /// Content-stream length minus the table minimum.
    pub content_length_delta: u32,
}

/// Shared Object Hint Table header (Annex F Table F.5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedObjectHeader {
    /// Object number of the first shared object.
    pub first_object_number: u32,
    /// Byte offset of the first shared object.
    pub first_object_offset: u32,
    /// Number of entries for objects in the first-page section.
    pub first_page_entries: u32,
    /// Total number of shared-object entries.
    pub total_entries: u32,
    /// Least shared-object group length in bytes.
    pub min_group_length: u32,
    /// Bits per group-length delta.
    pub group_length_bits: u16,
}

/// One shared object's worth of Shared Object Hint Table data.
///
/// The signature flag and group size are always emitted as zero: groups hold
/// one object and signatures are not computed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedObjectEntry {
    /// Group byte length minus the table minimum.
    pub length_delta: u32,
}

/// Both hint tables, ready to encode into the hint-stream payload.
#[derive(Debug, Clone, Default)]
pub struct HintTables {
    /// Page Offset Hint Table header.
    pub page_offset_header: PageOffsetHeader,
    /// One entry per page, page 0 first.
    pub page_offset_entries: Vec<PageOffsetEntry>,
    /// Shared Object Hint Table header.
    pub shared_object_header: SharedObjectHeader,
    /// One entry per shared object, in shared-table order.
    pub shared_object_entries: Vec<SharedObjectEntry>,
}

/// Encoded hint-stream payload.
#[derive(Debug, Clone)]
pub struct EncodedHints {
    /// Page Offset table immediately followed by the Shared Object table.
    pub bytes: Vec<u8>,
    /// Byte offset of the Shared Object table within `bytes` (the hint
    /// stream's `/S` value).
    pub shared_table_offset: usize,
}

impl HintTables {
    /// Encode both tables into the hint-stream payload.
    pub fn encode(&self) -> EncodedHints {
        let page_offset_bytes = self.encode_page_offset_table();
        let shared_table_offset = page_offset_bytes.len();

        let mut bytes = page_offset_bytes;
        bytes.extend(self.encode_shared_object_table());

        EncodedHints {
            bytes,
            shared_table_offset,
        }
    }

    fn encode_page_offset_table(&self) -> Vec<u8> {
        let h = &self.page_offset_header;
        let mut w = BitWriter::new();

        w.write_u32(h.min_object_count);
        w.write_u32(h.first_page_object_offset);
        w.write_u16(h.object_count_bits);
        w.write_u32(h.min_page_length);
        w.write_u16(h.page_length_bits);
        w.write_u32(h.min_content_offset);
        w.write_u16(h.content_offset_bits);
        w.write_u32(h.min_content_length);
        w.write_u16(h.content_length_bits);
        w.write_u16(h.shared_count_bits);
        w.write_u16(h.shared_id_bits);
        w.write_u16(h.numerator_bits);
        w.write_u16(h.denominator);

        let entries = &self.page_offset_entries;
        for e in entries {
            w.write_bits(e.object_count_delta as u64, h.object_count_bits);
        }
        for e in entries {
            w.write_bits(e.page_length_delta as u64, h.page_length_bits);
        }
        for e in entries {
            w.write_bits(e.shared_refs.len() as u64, h.shared_count_bits);
        }
        for e in entries {
            for &id in &e.shared_refs {
                w.write_bits(id as u64, h.shared_id_bits);
            }
        }
        for e in entries {
            // Fractional positions; numerator width is zero in the shipped
            // degenerate form, so this contributes no bits.
            for _ in &e.shared_refs {
                w.write_bits(0, h.numerator_bits);
            }
        }
        for e in entries {
            w.write_bits(e.content_offset_delta as u64, h.content_offset_bits);
        }
        for e in entries {
            w.write_bits(e.content_length_delta as u64, h.content_length_bits);
        }

        w.into_bytes()
    }

    fn encode_shared_object_table(&self) -> Vec<u8> {
        let h = &self.shared_object_header;
        let mut w = BitWriter::new();

        w.write_u32(h.first_object_number);
        w.write_u32(h.first_object_offset);
        w.write_u32(h.first_page_entries);
        w.write_u32(h.total_entries);
        w.write_u32(h.min_group_length);
        w.write_u16(h.group_length_bits);

        let entries = &self.shared_object_entries;
        for e in entries {
            w.write_bits(e.length_delta as u64, h.group_length_bits);
        }
        for _ in entries {
            w.write_bits(0, 1); // signature flag
        }
        for _ in entries {
            w.write_bits(0, 1); // group size beyond one object
        }

        w.into_bytes()
    }
}

/// Number of bits needed to represent a non-negative value.
///
/// Zero still occupies one bit, so a table of identical values collapses to
/// width 1 rather than width 0.
pub fn bits_needed(value: u32) -> u16 {
    if value == 0 {
        1
    } else {
        (32 - value.leading_zeros()) as u16
    }
}

/// Minimum and per-delta bit width for a set of values.
///
/// Returns `(0, 1)` for an empty set.
pub fn delta_encoding(values: &[u32]) -> (u32, u16) {
    let Some(&min) = values.iter().min() else {
        return (0, 1);
    };
    let max_delta = values.iter().map(|&v| v - min).max().unwrap_or(0);
    (min, bits_needed(max_delta))
}
