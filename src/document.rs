//! In-memory PDF document model.
//!
//! [`Document`] is the object store the linearized writer consumes: a table
//! of live indirect objects plus the trailer-level state (`/Root`, `/Info`,
//! `/ID`). Pages are not stored separately; the ordered page list is derived
//! from the catalog's pages tree on demand.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};

/// A PDF document: live indirect objects plus trailer state.
#[derive(Debug, Clone)]
pub struct Document {
    /// Declared PDF version, e.g. "1.4".
    version: String,
    /// Live indirect objects, insertion-ordered.
    objects: IndexMap<ObjectRef, Object>,
    /// Catalog reference (trailer /Root).
    root: Option<ObjectRef>,
    /// Document information dictionary reference (trailer /Info).
    info: Option<ObjectRef>,
    /// File identifier pair (trailer /ID).
    id: Option<[Vec<u8>; 2]>,
    /// Next object number to allocate.
    next_id: u32,
}

impl Document {
    /// Create an empty document with the given PDF version (e.g. "1.4").
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            objects: IndexMap::new(),
            root: None,
            info: None,
            id: None,
            next_id: 1,
        }
    }

    /// Declared PDF version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Insert a new indirect object, allocating the next object number.
    pub fn insert(&mut self, obj: Object) -> ObjectRef {
        let r = ObjectRef::new(self.next_id, 0);
        self.next_id += 1;
        self.objects.insert(r, obj);
        r
    }

    /// Look up a live object.
    pub fn get(&self, r: ObjectRef) -> Option<&Object> {
        self.objects.get(&r)
    }

    /// Look up a live object for mutation.
    pub fn get_mut(&mut self, r: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(&r)
    }

    /// Remove an object from the live table.
    pub fn remove(&mut self, r: ObjectRef) -> Option<Object> {
        self.objects.shift_remove(&r)
    }

    /// Iterate over live objects in table order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectRef, &Object)> {
        self.objects.iter().map(|(r, o)| (*r, o))
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Set the catalog (trailer /Root).
    pub fn set_root(&mut self, r: ObjectRef) {
        self.root = Some(r);
    }

    /// Catalog reference, if set.
    pub fn root(&self) -> Option<ObjectRef> {
        self.root
    }

    /// Set the information dictionary (trailer /Info).
    pub fn set_info(&mut self, r: ObjectRef) {
        self.info = Some(r);
    }

    /// Information dictionary reference, if any.
    pub fn info(&self) -> Option<ObjectRef> {
        self.info
    }

    /// Set the file identifier pair (trailer /ID).
    pub fn set_id(&mut self, first: Vec<u8>, second: Vec<u8>) {
        self.id = Some([first, second]);
    }

    /// File identifier pair, if any.
    pub fn id(&self) -> Option<&[Vec<u8>; 2]> {
        self.id.as_ref()
    }

    /// Whether a reference names an object number this document never
    /// allocated. Object number 0 is the free-list head, never a target.
    pub fn is_foreign(&self, r: ObjectRef) -> bool {
        r.id >= self.next_id
    }

    /// Resolve a reference to its live target.
    ///
    /// Distinguishes a number outside this document's allocation horizon
    /// (`CrossDocumentReference`) from an allocated number with no live
    /// object (`DanglingReference`).
    pub fn resolve(&self, r: ObjectRef) -> Result<&Object> {
        if self.is_foreign(r) {
            return Err(Error::CrossDocumentReference(r));
        }
        self.objects.get(&r).ok_or(Error::DanglingReference(r))
    }

    /// Resolve a reference and require a dictionary (or stream) value.
    fn resolve_dict(&self, r: ObjectRef) -> Result<&crate::object::Dict> {
        let obj = self.resolve(r)?;
        obj.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: obj.type_name().to_string(),
        })
    }

    /// Catalog dictionary.
    pub fn catalog(&self) -> Result<&crate::object::Dict> {
        let root = self.root.ok_or_else(|| Error::InvalidObjectType {
            expected: "Catalog reference".to_string(),
            found: "nothing".to_string(),
        })?;
        self.resolve_dict(root)
    }

    /// Pages-tree root reference (catalog /Pages).
    pub fn pages_root(&self) -> Result<ObjectRef> {
        let catalog = self.catalog()?;
        catalog
            .get("Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::InvalidObjectType {
                expected: "Pages reference".to_string(),
                found: "nothing".to_string(),
            })
    }

    /// Outlines root reference (catalog /Outlines), if present.
    pub fn outlines_root(&self) -> Result<Option<ObjectRef>> {
        Ok(self.catalog()?.get("Outlines").and_then(Object::as_reference))
    }

    /// Ordered list of page objects, from walking the pages tree.
    ///
    /// Depth-first through /Kids, collecting /Type /Page leaves. Revisited
    /// nodes are skipped so a malformed cyclic tree terminates.
    pub fn pages(&self) -> Result<Vec<ObjectRef>> {
        let root = self.pages_root()?;
        let mut pages = Vec::new();
        let mut visited = std::collections::HashSet::new();
        self.walk_pages(root, &mut visited, &mut pages)?;
        Ok(pages)
    }

    fn walk_pages(
        &self,
        node: ObjectRef,
        visited: &mut std::collections::HashSet<ObjectRef>,
        pages: &mut Vec<ObjectRef>,
    ) -> Result<()> {
        if !visited.insert(node) {
            return Ok(());
        }
        let dict = self.resolve_dict(node)?;
        match dict.get("Type").and_then(Object::as_name) {
            Some("Page") => pages.push(node),
            _ => {
                if let Some(kids) = dict.get("Kids").and_then(Object::as_array) {
                    for kid in kids {
                        if let Some(r) = kid.as_reference() {
                            self.walk_pages(r, visited, pages)?;
                        }
                    }
                }
            },
        }
        Ok(())
    }

    /// Renumber the live table under a dense `old → new` map.
    ///
    /// Objects absent from the map are dropped; every `Reference` leaf in a
    /// kept object is rewritten through the map (unmapped leaves, such as
    /// object number 0 or foreign references, stay unchanged). The table is
    /// rebuilt in ascending new-number order and the trailer references are
    /// remapped. Callers must treat a document whose renumber was
    /// interrupted as unusable.
    pub(crate) fn renumber(&mut self, map: &HashMap<ObjectRef, ObjectRef>) {
        log::trace!("renumbering {} of {} live objects", map.len(), self.objects.len());

        let mut renumbered: Vec<(ObjectRef, Object)> = Vec::with_capacity(map.len());
        for (old, obj) in std::mem::take(&mut self.objects) {
            if let Some(&new) = map.get(&old) {
                renumbered.push((new, rewrite_refs(obj, map)));
            }
        }
        renumbered.sort_by_key(|(r, _)| r.id);

        self.next_id = renumbered.last().map(|(r, _)| r.id + 1).unwrap_or(1);
        self.objects = renumbered.into_iter().collect();
        self.root = self.root.map(|r| map.get(&r).copied().unwrap_or(r));
        self.info = self.info.map(|r| map.get(&r).copied().unwrap_or(r));
    }
}

/// Rewrite every reference leaf of a value through the renumbering map.
fn rewrite_refs(obj: Object, map: &HashMap<ObjectRef, ObjectRef>) -> Object {
    match obj {
        Object::Reference(r) => Object::Reference(map.get(&r).copied().unwrap_or(r)),
        Object::Array(items) => {
            Object::Array(items.into_iter().map(|o| rewrite_refs(o, map)).collect())
        },
        Object::Dictionary(dict) => Object::Dictionary(
            dict.into_iter()
                .map(|(k, v)| (k, rewrite_refs(v, map)))
                .collect(),
        ),
        Object::Stream { dict, data } => Object::Stream {
            dict: dict
                .into_iter()
                .map(|(k, v)| (k, rewrite_refs(v, map)))
                .collect(),
            data,
        },
        other => other,
    }
}
