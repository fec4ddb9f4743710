//! Property tests over randomly generated documents and bit sequences.

mod common;

use common::*;
use pdf_linearize::writer::BitWriter;
use pdf_linearize::object::Dict;
use pdf_linearize::{Document, LinearizedWriter, Object};
use proptest::prelude::*;

/// `page_count` pages whose content streams take their lengths from
/// `lens`, cycling; optionally all sharing one font.
fn varied_doc(page_count: usize, share_font: bool, lens: &[usize]) -> Document {
    let mut doc = Document::new("1.4");
    let font = doc.insert(Object::dict(vec![
        ("Type", Object::name("Font")),
        ("Subtype", Object::name("Type1")),
        ("BaseFont", Object::name("Helvetica")),
    ]));

    let mut page_refs = Vec::new();
    for i in 0..page_count {
        let data = vec![b'q'; lens[i % lens.len()]];
        let content = doc.insert(Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::from(data),
        });
        let mut entries = vec![
            ("Type", Object::name("Page")),
            ("Contents", Object::Reference(content)),
        ];
        if share_font {
            entries.push((
                "Resources",
                Object::dict(vec![("Font", Object::dict(vec![("F1", Object::Reference(font))]))]),
            ));
        }
        page_refs.push(doc.insert(Object::dict(entries)));
    }

    let kids: Vec<Object> = page_refs.iter().map(|&r| Object::Reference(r)).collect();
    let pages = doc.insert(Object::dict(vec![
        ("Type", Object::name("Pages")),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count as i64)),
    ]));
    for &page in &page_refs {
        if let Some(Object::Dictionary(d)) = doc.get_mut(page) {
            d.insert("Parent".to_string(), Object::Reference(pages));
        }
    }
    let catalog = doc.insert(Object::dict(vec![
        ("Type", Object::name("Catalog")),
        ("Pages", Object::Reference(pages)),
    ]));
    doc.set_root(catalog);
    doc
}

proptest! {
    /// Bit concatenation law: writing fields of widths `n1..nk` then
    /// flushing emits exactly `ceil(sum/8)` bytes whose top bits are the
    /// fields' low bits MSB-first, zero-padded at the tail.
    #[test]
    fn prop_bitwriter_concatenation(
        fields in prop::collection::vec((any::<u32>(), 1u16..=24), 0..40)
    ) {
        let mut writer = BitWriter::new();
        let mut expected: Vec<bool> = Vec::new();
        for &(value, width) in &fields {
            writer.write_bits(value as u64, width);
            for i in (0..width).rev() {
                expected.push((value >> i) & 1 == 1);
            }
        }
        let bytes = writer.into_bytes();
        prop_assert_eq!(bytes.len(), expected.len().div_ceil(8));
        for (i, &bit) in expected.iter().enumerate() {
            let actual = (bytes[i / 8] >> (7 - i % 8)) & 1 == 1;
            prop_assert_eq!(actual, bit, "bit {}", i);
        }
        for i in expected.len()..bytes.len() * 8 {
            prop_assert_eq!((bytes[i / 8] >> (7 - i % 8)) & 1, 0, "padding bit {}", i);
        }
    }

    /// Universal output invariants over random small documents.
    #[test]
    fn prop_linearized_invariants(
        page_count in 1usize..5,
        share in any::<bool>(),
        lens in prop::collection::vec(1usize..150, 1..5)
    ) {
        let mut doc = varied_doc(page_count, share, &lens);
        let bytes = LinearizedWriter::to_bytes(&mut doc).unwrap();

        // The dictionary's self-describing fields hold.
        prop_assert_eq!(lin_value(&bytes, "L"), bytes.len() as u64);
        prop_assert_eq!(lin_value(&bytes, "N"), page_count as u64);
        let (h_offset, h_len) = hint_array(&bytes);
        prop_assert!(bytes[h_offset as usize..(h_offset + h_len) as usize].ends_with(b"endobj\n"));
        prop_assert_eq!(lin_value(&bytes, "E"), h_offset);

        // Every cross-reference entry points at its object's envelope.
        let main_offset = final_startxref(&bytes);
        let (_, entries) = parse_xref_at(&bytes, main_offset);
        for (i, &(offset, kind)) in entries.iter().enumerate().skip(1) {
            prop_assert_eq!(kind, 'n');
            prop_assert_eq!(offset, offset_of_object(&bytes, i as u32));
        }

        // Dense numbering, strictly increasing emission, two terminators.
        let scanned = scan_objects(&bytes);
        prop_assert_eq!(scanned.len() + 1, entries.len());
        prop_assert!(scanned.windows(2).all(|w| w[0].1 < w[1].1));
        let eof_count = bytes.windows(5).filter(|w| w == b"%%EOF").count();
        prop_assert_eq!(eof_count, 2);

        // Re-linearizing the renumbered document reproduces the bytes.
        let again = LinearizedWriter::to_bytes(&mut doc).unwrap();
        prop_assert_eq!(bytes, again);
    }

    /// The first-page cross-reference section always covers exactly the
    /// objects before the hint stream, and the main section covers all of
    /// them.
    #[test]
    fn prop_xref_coverage(page_count in 1usize..4, share in any::<bool>()) {
        let mut doc = varied_doc(page_count, share, &[40]);
        let bytes = LinearizedWriter::to_bytes(&mut doc).unwrap();

        let (h_offset, _) = hint_array(&bytes);
        let hint_number = scan_objects(&bytes)
            .into_iter()
            .find(|&(_, off)| off == h_offset)
            .expect("no object at /H offset")
            .0;

        let (first, fp_entries) = parse_xref_at(&bytes, first_xref_offset(&bytes));
        prop_assert_eq!(first, 0);
        // 0 (free) through the hint stream, densely.
        prop_assert_eq!(fp_entries.len() as u32, hint_number + 1);

        let (_, main_entries) = parse_xref_at(&bytes, final_startxref(&bytes));
        prop_assert_eq!(main_entries.len(), scan_objects(&bytes).len() + 1);
    }
}
