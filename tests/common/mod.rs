//! Shared helpers for the integration tests: document builders and a small
//! scanner for the produced byte stream.

#![allow(dead_code)]

use pdf_linearize::object::Dict;
use pdf_linearize::{Document, Object, ObjectRef};

/// One page, one content stream, one Type1 Helvetica font.
pub fn hello_world_doc() -> Document {
    multi_page_doc(1, true)
}

/// `page_count` pages; with `share_font` they all use one font object,
/// otherwise each page gets its own copy.
pub fn multi_page_doc(page_count: usize, share_font: bool) -> Document {
    let mut doc = Document::new("1.4");
    let shared_font = share_font.then(|| insert_font(&mut doc));

    let mut page_refs = Vec::new();
    for i in 0..page_count {
        let content = doc.insert(Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::from(format!("BT /F1 12 Tf 100 700 Td (Page {}) Tj ET", i)),
        });
        let font = shared_font.unwrap_or_else(|| insert_font(&mut doc));
        let page = doc.insert(Object::dict(vec![
            ("Type", Object::name("Page")),
            ("Contents", Object::Reference(content)),
            (
                "Resources",
                Object::dict(vec![("Font", Object::dict(vec![("F1", Object::Reference(font))]))]),
            ),
        ]));
        page_refs.push(page);
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

fn insert_font(doc: &mut Document) -> ObjectRef {
    doc.insert(Object::dict(vec![
        ("Type", Object::name("Font")),
        ("Subtype", Object::name("Type1")),
        ("BaseFont", Object::name("Helvetica")),
    ]))
}

/// Every `N G obj` keyword at a line start: `(object number, byte offset)`.
pub fn scan_objects(bytes: &[u8]) -> Vec<(u32, u64)> {
    let re = regex::bytes::Regex::new(r"(?m)^(\d+) (\d+) obj").unwrap();
    re.captures_iter(bytes)
        .map(|c| {
            let num = std::str::from_utf8(&c[1]).unwrap().parse().unwrap();
            (num, c.get(0).unwrap().start() as u64)
        })
        .collect()
}

/// Byte offset where the serialized form of object `num` begins.
pub fn offset_of_object(bytes: &[u8], num: u32) -> u64 {
    scan_objects(bytes)
        .into_iter()
        .find(|&(n, _)| n == num)
        .map(|(_, off)| off)
        .unwrap_or_else(|| panic!("object {} not found in output", num))
}

/// The value of a numeric linearization-dictionary entry such as `/L`, `/O`.
pub fn lin_value(bytes: &[u8], key: &str) -> u64 {
    let dict = lin_dict_text(bytes);
    let pattern = regex::Regex::new(&format!(r"/{} (\d+)", key)).unwrap();
    pattern
        .captures(&dict)
        .unwrap_or_else(|| panic!("missing /{} in {}", key, dict))[1]
        .parse()
        .unwrap()
}

/// The `/H [offset length]` pair of the linearization dictionary.
pub fn hint_array(bytes: &[u8]) -> (u64, u64) {
    let dict = lin_dict_text(bytes);
    let pattern = regex::Regex::new(r"/H \[(\d+) (\d+)\]").unwrap();
    let caps = pattern.captures(&dict).expect("missing /H");
    (caps[1].parse().unwrap(), caps[2].parse().unwrap())
}

fn lin_dict_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let start = text.find("1 0 obj").expect("object 1 missing");
    let end = text[start..].find("endobj").expect("object 1 unterminated");
    text[start..start + end].to_string()
}

/// Byte offset of the first cross-reference table (the first-page section).
pub fn first_xref_offset(bytes: &[u8]) -> u64 {
    let re = regex::bytes::Regex::new(r"xref\n0 ").unwrap();
    re.find(bytes).expect("no xref keyword").start() as u64
}

/// The operand of the file-final `startxref`.
pub fn final_startxref(bytes: &[u8]) -> u64 {
    let text = String::from_utf8_lossy(bytes);
    let tail = text.rfind("startxref\n").expect("missing startxref");
    let rest = &text[tail + "startxref\n".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap()
}

/// Parse a classical cross-reference table at `offset`:
/// `(first object number, entries)` where each entry is `(offset, type)`.
pub fn parse_xref_at(bytes: &[u8], offset: u64) -> (u32, Vec<(u64, char)>) {
    let mut pos = offset as usize;

    assert_eq!(read_line(bytes, &mut pos), "xref");
    let header = read_line(bytes, &mut pos);
    let mut parts = header.split(' ');
    let first: u32 = parts.next().unwrap().parse().unwrap();
    let count: usize = parts.next().unwrap().parse().unwrap();

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let line = read_line(bytes, &mut pos);
        let offset: u64 = line[0..10].parse().unwrap();
        let kind = line.as_bytes()[17] as char;
        entries.push((offset, kind));
    }
    (first, entries)
}

fn read_line<'a>(bytes: &'a [u8], pos: &mut usize) -> &'a str {
    let end = *pos + bytes[*pos..].iter().position(|&b| b == b'\n').expect("truncated table");
    let line = std::str::from_utf8(&bytes[*pos..end]).expect("table is not ascii");
    *pos = end + 1;
    line
}

/// The decoded hint-stream payload and the `/S` shared-table offset.
pub fn hint_payload(bytes: &[u8]) -> (Vec<u8>, usize) {
    let (h_off, h_len) = hint_array(bytes);
    let envelope = &bytes[h_off as usize..(h_off + h_len) as usize];
    let text = String::from_utf8_lossy(envelope);

    let s_re = regex::Regex::new(r"/S (\d+)").unwrap();
    let s: usize = s_re.captures(&text).expect("missing /S")[1].parse().unwrap();
    let len_re = regex::Regex::new(r"/Length (\d+)").unwrap();
    let len: usize = len_re.captures(&text).expect("missing /Length")[1]
        .parse()
        .unwrap();

    let data_start = text.find("stream\n").expect("missing stream keyword") + "stream\n".len();
    (envelope[data_start..data_start + len].to_vec(), s)
}

/// Big-endian u32 at `offset` of a buffer.
pub fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

/// Big-endian u16 at `offset` of a buffer.
pub fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes(buf[offset..offset + 2].try_into().unwrap())
}

/// MSB-first bit reader over a byte slice, for decoding hint-table arrays.
pub struct BitReader<'a> {
    data: &'a [u8],
    bit: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit: 0 }
    }

    /// Read `width` bits MSB-first.
    pub fn read(&mut self, width: u16) -> u64 {
        let mut value = 0u64;
        for _ in 0..width {
            let byte = self.data[self.bit / 8];
            let shift = 7 - (self.bit % 8);
            value = (value << 1) | ((byte >> shift) & 1) as u64;
            self.bit += 1;
        }
        value
    }
}
