//! Normalized element tree shared by the XML and JSON lowerings.
//!
//! Arena-backed: elements live in one `Vec` and refer to each other by
//! index, so the projection passes run on explicit worklists instead of
//! recursing over instance-controlled nesting.

/// Hard cap on element nesting. Instances deeper than this are hostile.
pub const MAX_DEPTH: usize = 64;

/// Hard cap on document size before parse.
pub const MAX_DOC_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct Elem {
    pub qname: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Concatenated, trimmed character content.
    pub text: Option<String>,
    /// Ordinary attributes, structures:* and xsi:* excluded.
    pub attrs: Vec<(String, String)>,
    pub structures_id: Option<String>,
    /// Reference target, leading `#` stripped.
    pub structures_ref: Option<String>,
    /// URI value as written, e.g. `#P01`.
    pub structures_uri: Option<String>,
    pub xsi_type: Option<String>,
    pub nil: bool,
    /// Metadata references are retained as properties only; containment
    /// already relates the metadata to its subject.
    pub metadata_refs: Vec<(String, String)>,
}

impl Elem {
    pub fn named(qname: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            ..Elem::default()
        }
    }

    /// A leaf with character content and no structures markers: becomes a
    /// property on the nearest node, never a node of its own.
    pub fn is_scalar(&self) -> bool {
        self.children.is_empty()
            && self.structures_id.is_none()
            && self.structures_ref.is_none()
            && self.structures_uri.is_none()
    }

    /// Reference carrier: a `structures:ref` with no inline payload.
    pub fn is_ref_only(&self) -> bool {
        self.structures_ref.is_some()
            && (self.nil || (self.children.is_empty() && self.text.is_none()))
    }
}

#[derive(Debug, Clone)]
pub struct ElemTree {
    pub elems: Vec<Elem>,
    pub root: usize,
}

impl ElemTree {
    pub fn new(root_elem: Elem) -> Self {
        Self {
            elems: vec![root_elem],
            root: 0,
        }
    }

    pub fn push_child(&mut self, parent: usize, mut elem: Elem) -> usize {
        let idx = self.elems.len();
        elem.parent = Some(parent);
        self.elems.push(elem);
        self.elems[parent].children.push(idx);
        idx
    }

    pub fn get(&self, idx: usize) -> &Elem {
        &self.elems[idx]
    }
}
