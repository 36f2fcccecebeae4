//! Arena-backed XML tree.
//!
//! Wraps an `indextree::Arena` with a designated root element. Node ids stay
//! valid for the lifetime of the tree; detaching a node unlinks it (and its
//! subtree) from its parent without invalidating any id, which is what the
//! element attach/detach protocol in vmcfg-dom relies on.

use indextree::{Arena, NodeId};

/// An XML attribute. Attributes keep insertion order when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// The attribute name.
    pub name: String,

    /// The attribute value, unescaped. Escaping happens at write time.
    pub value: String,
}

/// An XML element: name, attributes, and optional text content.
///
/// Child elements live in the arena, not in the node itself. An element with
/// both text and child elements serializes text first, then children; the
/// libvirt schema never needs mixed content beyond that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    /// The element name.
    pub name: String,

    /// Attributes, in insertion order.
    pub attributes: Vec<XmlAttribute>,

    /// Text content, if any.
    pub text: Option<String>,
}

impl XmlNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
        }
    }

    /// Get an attribute value by name.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing attribute of the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == name) {
            existing.value = value;
        } else {
            self.attributes.push(XmlAttribute { name, value });
        }
    }
}

/// An XML document with a single root element.
#[derive(Debug, Clone)]
pub struct XmlTree {
    arena: Arena<XmlNode>,
    root: NodeId,
}

impl XmlTree {
    /// Create a new tree whose root element has the given name.
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(XmlNode::new(root_name));
        Self { arena, root }
    }

    /// The root element id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get the data for a node.
    ///
    /// # Panics
    ///
    /// Node ids are only meaningful in the tree that created them; passing
    /// an id minted by another tree panics.
    pub fn get(&self, id: NodeId) -> &XmlNode {
        self.arena.get(id).expect("invalid node id").get()
    }

    /// Get mutable data for a node. Same same-tree precondition as [`get`].
    ///
    /// [`get`]: Self::get
    pub fn get_mut(&mut self, id: NodeId) -> &mut XmlNode {
        self.arena.get_mut(id).expect("invalid node id").get_mut()
    }

    /// Create a new element and append it as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let child = self.arena.new_node(XmlNode::new(name));
        parent.append(child, &mut self.arena);
        child
    }

    /// Set an attribute on a node.
    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.get_mut(id).set_attr(name, value);
    }

    /// Set the text content of a node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.get_mut(id).text = Some(text.into());
    }

    /// Get the parent of a node, if it is attached to one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent())
    }

    /// Iterate over the children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Children of `id` whose element name is `name`.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        id.children(&self.arena)
            .filter(move |&c| self.get(c).name == name)
    }

    /// Find the first child of `id` named `name`.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// Whether a node has any children.
    pub fn has_children(&self, id: NodeId) -> bool {
        id.children(&self.arena).next().is_some()
    }

    /// Unlink a node (and its subtree) from its parent.
    ///
    /// The node stays in the arena and its id stays valid, so detaching the
    /// members of a recorded node list in any order is safe even when some
    /// of them are descendants of others.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Deep-copy the subtree rooted at `src` in `other` and append the copy
    /// as the last child of `parent`. Returns the id of the copied root.
    pub fn graft(&mut self, parent: NodeId, other: &XmlTree, src: NodeId) -> NodeId {
        let copy = self.arena.new_node(other.get(src).clone());
        parent.append(copy, &mut self.arena);
        let children: Vec<NodeId> = src.children(&other.arena).collect();
        for child in children {
            self.graft(copy, other, child);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_replaces() {
        let mut tree = XmlTree::new("domain");
        tree.set_attr(tree.root(), "type", "kvm");
        tree.set_attr(tree.root(), "type", "qemu");
        assert_eq!(tree.get(tree.root()).get_attr("type"), Some("qemu"));
        assert_eq!(tree.get(tree.root()).attributes.len(), 1);
    }

    #[test]
    fn test_detach_unlinks_subtree() {
        let mut tree = XmlTree::new("domain");
        let devices = tree.append_element(tree.root(), "devices");
        let disk = tree.append_element(devices, "disk");

        tree.detach(devices);
        assert!(!tree.has_children(tree.root()));
        // The subtree is intact below the detached node.
        assert_eq!(tree.parent(disk), Some(devices));
        assert_eq!(tree.parent(devices), None);
    }

    #[test]
    fn test_detach_order_independent() {
        let mut tree = XmlTree::new("domain");
        let os = tree.append_element(tree.root(), "os");
        let ty = tree.append_element(os, "type");

        // Detaching the parent first must not make detaching the child unsafe.
        tree.detach(os);
        tree.detach(ty);
        assert_eq!(tree.parent(ty), None);
    }

    #[test]
    fn test_find_child() {
        let mut tree = XmlTree::new("domain");
        tree.append_element(tree.root(), "memory");
        let devices = tree.append_element(tree.root(), "devices");
        assert_eq!(tree.find_child(tree.root(), "devices"), Some(devices));
        assert_eq!(tree.find_child(tree.root(), "clock"), None);
    }

    #[test]
    #[should_panic(expected = "invalid node id")]
    fn test_foreign_node_id_panics() {
        let mut other = XmlTree::new("domain");
        let foreign = other.append_element(other.root(), "memory");

        let tree = XmlTree::new("domain");
        let _ = tree.get(foreign);
    }

    #[test]
    fn test_graft_deep_copies() {
        let mut meta = XmlTree::new("metadata");
        let inner = meta.append_element(meta.root(), "app");
        meta.set_attr(inner, "id", "7");

        let mut tree = XmlTree::new("domain");
        let copied = tree.graft(tree.root(), &meta, meta.root());

        assert_eq!(tree.get(copied).name, "metadata");
        let app = tree.find_child(copied, "app").unwrap();
        assert_eq!(tree.get(app).get_attr("id"), Some("7"));
    }
}
