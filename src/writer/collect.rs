//! Object-graph partitioning.
//!
//! Computes the transitive closure of every page and splits the live object
//! graph into the sets the linearized layout needs: document-level objects,
//! first-page-exclusive objects, per-remaining-page exclusive objects, and
//! objects shared between two or more pages. All sets are insertion-ordered
//! so repeated runs over the same document partition identically.
//!
//! Two traversal guards keep the partition meaningful: `Parent` keys (the
//! pages-tree back-pointer) are never followed, and a page dictionary other
//! than the traversal root is neither included nor expanded. Without them,
//! the parent/kids cycle makes every object reachable from every page.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::document::Document;
use crate::error::Result;
use crate::object::{Object, ObjectRef};

/// The partition of a document's live objects, in layout order.
#[derive(Debug)]
pub struct ObjectSets {
    /// Ordered page dictionaries.
    pub pages: Vec<ObjectRef>,
    /// Catalog, pages-tree root, info, outlines root, then every object
    /// reachable from the catalog that no page reaches.
    pub doc_level: Vec<ObjectRef>,
    /// Objects exclusive to page 0, page dictionary first.
    pub first_page: Vec<ObjectRef>,
    /// Objects exclusive to page `p`, at index `p - 1`.
    pub remaining: Vec<Vec<ObjectRef>>,
    /// Objects reachable from two or more pages, minus `doc_level`.
    pub shared: Vec<ObjectRef>,
    /// Per-page transitive closures, kept for hint-table construction.
    pub closures: Vec<IndexSet<ObjectRef>>,
}

impl ObjectSets {
    /// Map every reference in the partition through a renumbering map.
    ///
    /// References the map does not cover (never the case after a complete
    /// renumbering) are kept unchanged.
    pub(crate) fn renumbered(self, map: &HashMap<ObjectRef, ObjectRef>) -> Self {
        let remap = |r: ObjectRef| map.get(&r).copied().unwrap_or(r);
        Self {
            pages: self.pages.into_iter().map(remap).collect(),
            doc_level: self.doc_level.into_iter().map(remap).collect(),
            first_page: self.first_page.into_iter().map(remap).collect(),
            remaining: self
                .remaining
                .into_iter()
                .map(|page| page.into_iter().map(remap).collect())
                .collect(),
            shared: self.shared.into_iter().map(remap).collect(),
            closures: self
                .closures
                .into_iter()
                .map(|c| c.into_iter().map(remap).collect())
                .collect(),
        }
    }

    /// Shared-table indices referenced by page `p`, in shared-table order.
    pub fn shared_refs_of_page(&self, p: usize) -> Vec<u32> {
        self.shared
            .iter()
            .enumerate()
            .filter(|(_, r)| self.closures[p].contains(*r))
            .map(|(i, _)| i as u32)
            .collect()
    }
}

/// Partitions a document's object graph for linearization.
pub struct ObjectCollector<'a> {
    doc: &'a Document,
    page_dicts: HashSet<ObjectRef>,
}

impl<'a> ObjectCollector<'a> {
    /// Create a collector for the given document.
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            page_dicts: HashSet::new(),
        }
    }

    /// Compute the partition.
    pub fn collect(mut self) -> Result<ObjectSets> {
        let pages = self.doc.pages()?;
        if pages.is_empty() {
            return Err(crate::error::Error::EmptyDocument);
        }
        self.page_dicts = pages.iter().copied().collect();

        let closures: Vec<IndexSet<ObjectRef>> = pages
            .iter()
            .map(|&page| self.closure_of(page))
            .collect::<Result<_>>()?;

        // Number of page closures each object appears in.
        let mut membership: HashMap<ObjectRef, usize> = HashMap::new();
        for closure in &closures {
            for &r in closure {
                *membership.entry(r).or_default() += 1;
            }
        }

        let doc_level = self.doc_level_set(&membership)?;
        let doc_set: HashSet<ObjectRef> = doc_level.iter().copied().collect();

        // Classify page closures in page order; an object is handed to the
        // first rule that matches and never revisited.
        let mut classified: HashSet<ObjectRef> = HashSet::new();
        let mut first_page = Vec::new();
        let mut shared = Vec::new();
        for &r in &closures[0] {
            if doc_set.contains(&r) || !classified.insert(r) {
                continue;
            }
            if membership[&r] >= 2 {
                shared.push(r);
            } else {
                first_page.push(r);
            }
        }

        let mut remaining: Vec<Vec<ObjectRef>> = Vec::with_capacity(pages.len() - 1);
        for closure in &closures[1..] {
            let mut exclusive = Vec::new();
            for &r in closure {
                if doc_set.contains(&r) || !classified.insert(r) {
                    continue;
                }
                if membership[&r] >= 2 {
                    shared.push(r);
                } else {
                    exclusive.push(r);
                }
            }
            remaining.push(exclusive);
        }

        log::debug!(
            "collected {} pages: {} doc-level, {} first-page, {} shared, {} remaining-exclusive",
            pages.len(),
            doc_level.len(),
            first_page.len(),
            shared.len(),
            remaining.iter().map(Vec::len).sum::<usize>(),
        );

        Ok(ObjectSets {
            pages,
            doc_level,
            first_page,
            remaining,
            shared,
            closures,
        })
    }

    /// Transitive closure of one page, insertion-ordered, root included.
    fn closure_of(&self, root: ObjectRef) -> Result<IndexSet<ObjectRef>> {
        let mut seen = IndexSet::new();
        seen.insert(root);
        let mut stack = vec![root];

        while let Some(r) = stack.pop() {
            let obj = self.doc.resolve(r)?;
            let mut children = Vec::new();
            collect_refs(obj, &mut children);
            // Depth-first, left to right.
            for child in children.into_iter().rev() {
                if self.skip_in_closure(child, root) {
                    continue;
                }
                if seen.insert(child) {
                    stack.push(child);
                }
            }
        }
        Ok(seen)
    }

    /// Whether a reference is excluded from closure expansion: the free-list
    /// head, a number outside this document, or a foreign page dictionary.
    fn skip_in_closure(&self, r: ObjectRef, root: ObjectRef) -> bool {
        r.id == 0 || self.doc.is_foreign(r) || (self.page_dicts.contains(&r) && r != root)
    }

    /// The document-level list: the four seeds in discovery order, then the
    /// rest of the catalog/outlines closure restricted to objects no page
    /// reaches.
    fn doc_level_set(&self, membership: &HashMap<ObjectRef, usize>) -> Result<Vec<ObjectRef>> {
        let catalog = self
            .doc
            .root()
            .ok_or_else(|| crate::error::Error::InvalidObjectType {
                expected: "Catalog reference".to_string(),
                found: "nothing".to_string(),
            })?;
        self.doc.resolve(catalog)?;

        let mut doc_level: IndexSet<ObjectRef> = IndexSet::new();
        doc_level.insert(catalog);
        doc_level.insert(self.doc.pages_root()?);
        if let Some(info) = self.doc.info() {
            self.doc.resolve(info)?;
            doc_level.insert(info);
        }
        if let Some(outlines) = self.doc.outlines_root()? {
            self.doc.resolve(outlines)?;
            doc_level.insert(outlines);
        }

        let mut stack: Vec<ObjectRef> = doc_level.iter().copied().rev().collect();
        while let Some(r) = stack.pop() {
            let obj = self.doc.resolve(r)?;
            let mut children = Vec::new();
            collect_refs(obj, &mut children);
            for child in children.into_iter().rev() {
                if child.id == 0
                    || self.doc.is_foreign(child)
                    || self.page_dicts.contains(&child)
                    || membership.contains_key(&child)
                {
                    continue;
                }
                if doc_level.insert(child) {
                    stack.push(child);
                }
            }
        }
        Ok(doc_level.into_iter().collect())
    }
}

/// Append every reference leaf of a value, in textual order, skipping the
/// pages-tree back-pointer.
fn collect_refs(obj: &Object, out: &mut Vec<ObjectRef>) {
    match obj {
        Object::Reference(r) => out.push(*r),
        Object::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        },
        Object::Dictionary(dict) => {
            for (key, value) in dict {
                if key != "Parent" {
                    collect_refs(value, out);
                }
            }
        },
        Object::Stream { dict, .. } => {
            for (key, value) in dict {
                if key != "Parent" {
                    collect_refs(value, out);
                }
            }
        },
        _ => {},
    }
}
