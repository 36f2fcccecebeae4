//! The element abstraction.
//!
//! An element is a reusable fragment of domain configuration that knows how
//! to contribute nodes to the shared tree and how to take exactly those
//! nodes out again. Elements do all of their semantic validation in their
//! constructors; once constructed, `attach_xml` only fails for document-level
//! conflicts (a disk claiming an occupied target path), never for bad field
//! values.

use crate::error::Result;
use std::any::Any;
use std::fmt;
use vmcfg_xml::{NodeId, XmlTree};

/// A composable unit of domain configuration.
pub trait Element: Any + fmt::Debug {
    /// Whether at most one element of this concrete type may be attached to
    /// a domain at a time.
    fn unique(&self) -> bool {
        false
    }

    /// Contribute nodes to the tree, returning the nodes this element owns.
    ///
    /// The returned list is what a later detach operates on; nested nodes
    /// may appear after their ancestors, detaching handles either order.
    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>>;

    /// Remove this element's nodes from the tree.
    ///
    /// The default detaches every recorded node from its parent. Device
    /// elements override this to also prune the shared container once it
    /// is empty.
    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        for &node in nodes {
            tree.detach(node);
        }
    }
}

/// The `TypeId` of the concrete type behind an element trait object.
///
/// Upcasts to `dyn Any` first so dispatch goes through the concrete vtable
/// rather than resolving on the trait object type itself.
pub(crate) fn element_type_id(element: &dyn Element) -> std::any::TypeId {
    let any: &dyn Any = element;
    any.type_id()
}
