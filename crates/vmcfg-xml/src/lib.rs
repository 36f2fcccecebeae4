//! Mutable XML trees for libvirt configuration documents.
//!
//! This crate provides an arena-backed XML tree that supports the attach and
//! detach protocol used by the domain layer: nodes are addressed by stable
//! [`NodeId`]s, can be unlinked from their parent at any time, and an
//! unlinked subtree simply disappears from serialized output.
//!
//! The main types are:
//! - [`XmlTree`]: a document with a designated root element
//! - [`XmlNode`]: an element with name, attributes, and optional text
//! - [`XmlAttribute`]: a name/value pair, kept in insertion order
//!
//! # Example
//!
//! ```rust
//! use vmcfg_xml::XmlTree;
//!
//! let mut tree = XmlTree::new("domain");
//! tree.set_attr(tree.root(), "type", "kvm");
//! let memory = tree.append_element(tree.root(), "memory");
//! tree.set_text(memory, "2048");
//!
//! let xml = tree.serialize(false).unwrap();
//! assert_eq!(xml, r#"<domain type="kvm"><memory>2048</memory></domain>"#);
//! ```
//!
//! Serialization goes through `quick-xml`; tag and attribute names are
//! reproduced exactly as given, and childless, text-less elements use the
//! self-closing form (`<console type="pty"/>`).

pub mod error;
pub mod tree;
pub mod writer;

pub use error::{Result, XmlError};
pub use indextree::NodeId;
pub use tree::{XmlAttribute, XmlNode, XmlTree};
