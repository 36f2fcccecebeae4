//! The domain document aggregate.
//!
//! A [`Domain`] owns the XML tree and the ordered collection of attached
//! elements, enforces the per-type uniqueness invariant, and mediates every
//! tree mutation through the elements themselves. It is not internally
//! synchronized; concurrent callers must serialize access behind a mutex.

use crate::element::{Element, element_type_id};
use crate::error::{Error, Result};
use tracing::debug;
use vmcfg_xml::{NodeId, XmlTree};

/// Domain (virtualization) type, emitted as `domain/@type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainKind {
    #[default]
    Kvm,
    Unknown,
}

impl DomainKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainKind::Kvm => "kvm",
            DomainKind::Unknown => "",
        }
    }
}

/// Handle to an attached element record.
///
/// Returned by [`Domain::attach_element`]; the only way to detach an element
/// again. Handles from one domain are meaningless in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(u64);

#[derive(Debug)]
struct ElementRecord {
    id: RecordId,
    nodes: Vec<NodeId>,
    element: Box<dyn Element>,
}

/// A libvirt domain document under construction.
#[derive(Debug)]
pub struct Domain {
    kind: DomainKind,
    tree: XmlTree,
    records: Vec<ElementRecord>,
    next_record: u64,
}

impl Domain {
    /// Create an empty domain document of the given kind.
    pub fn new(kind: DomainKind) -> Self {
        let mut tree = XmlTree::new("domain");
        tree.set_attr(tree.root(), "type", kind.as_str());
        Self {
            kind,
            tree,
            records: Vec::new(),
            next_record: 0,
        }
    }

    /// Create a domain and attach the given elements in order.
    pub fn with_elements(
        kind: DomainKind,
        elements: Vec<Box<dyn Element>>,
    ) -> Result<Self> {
        let mut domain = Self::new(kind);
        for element in elements {
            domain.attach_boxed(element)?;
        }
        Ok(domain)
    }

    /// The domain kind.
    pub fn kind(&self) -> DomainKind {
        self.kind
    }

    /// Read access to the underlying tree.
    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Number of currently attached element records.
    pub fn element_count(&self) -> usize {
        self.records.len()
    }

    /// Attach an element, recording the nodes it contributed.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateElement`] if the element's concrete type is unique
    /// and already attached; the tree is untouched in that case. Errors from
    /// the element's own attach step (e.g. a disk target conflict) propagate
    /// unchanged, and the element is responsible for leaving no orphaned
    /// nodes behind when that happens.
    pub fn attach_element(&mut self, element: impl Element) -> Result<RecordId> {
        self.attach_boxed(Box::new(element))
    }

    /// [`attach_element`](Self::attach_element) for an already boxed element.
    pub fn attach_boxed(&mut self, element: Box<dyn Element>) -> Result<RecordId> {
        if element.unique() {
            let type_id = element_type_id(element.as_ref());
            if self
                .records
                .iter()
                .any(|r| element_type_id(r.element.as_ref()) == type_id)
            {
                return Err(Error::DuplicateElement {
                    element: format!("{element:?}"),
                });
            }
        }

        let nodes = element.attach_xml(&mut self.tree)?;
        debug!(element = ?element, nodes = nodes.len(), "attached element");

        let id = RecordId(self.next_record);
        self.next_record += 1;
        self.records.push(ElementRecord { id, nodes, element });
        Ok(id)
    }

    /// Detach a previously attached element, returning it to the caller.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] if `id` is not currently attached.
    pub fn detach_element(&mut self, id: RecordId) -> Result<Box<dyn Element>> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(Error::RecordNotFound)?;

        let record = self.records.remove(index);
        record.element.detach_xml(&mut self.tree, &record.nodes);
        debug!(element = ?record.element, "detached element");
        Ok(record.element)
    }

    /// Serialize the current tree. Pure; the document is not mutated.
    pub fn emit_xml(&self, pretty: bool) -> Result<String> {
        Ok(self.tree.serialize(pretty)?)
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::new(DomainKind::Kvm)
    }
}
