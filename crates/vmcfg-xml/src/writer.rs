//! Tree-to-text serialization via quick-xml.
//!
//! Tag names, attribute names, and attribute order are emitted exactly as
//! stored in the tree; this output is the contract with the libvirt layer.

use crate::error::Result;
use crate::tree::XmlTree;
use indextree::NodeId;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

impl XmlTree {
    /// Serialize the tree to XML text.
    ///
    /// With `pretty` set, output is indented with two spaces per level.
    /// Childless elements without text use the self-closing form.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn serialize(&self, pretty: bool) -> Result<String> {
        let buf = if pretty {
            let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
            self.write_node(&mut writer, self.root())?;
            writer.into_inner()
        } else {
            let mut writer = Writer::new(Vec::new());
            self.write_node(&mut writer, self.root())?;
            writer.into_inner()
        };

        Ok(String::from_utf8(buf)?)
    }

    fn write_node<W: std::io::Write>(&self, writer: &mut Writer<W>, id: NodeId) -> Result<()> {
        let node = self.get(id);
        let mut start = BytesStart::new(node.name.as_str());
        for attr in &node.attributes {
            start.push_attribute((attr.name.as_str(), attr.value.as_str()));
        }

        if node.text.is_none() && !self.has_children(id) {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &node.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in self.children(id).collect::<Vec<_>>() {
            self.write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::XmlTree;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_element_self_closes() {
        let mut tree = XmlTree::new("devices");
        let console = tree.append_element(tree.root(), "console");
        tree.set_attr(console, "type", "pty");
        assert_eq!(
            tree.serialize(false).unwrap(),
            r#"<devices><console type="pty"/></devices>"#
        );
    }

    #[test]
    fn test_text_content() {
        let mut tree = XmlTree::new("domain");
        let memory = tree.append_element(tree.root(), "memory");
        tree.set_text(memory, "2048");
        assert_eq!(
            tree.serialize(false).unwrap(),
            "<domain><memory>2048</memory></domain>"
        );
    }

    #[test]
    fn test_attribute_order_preserved() {
        let mut tree = XmlTree::new("disk");
        tree.set_attr(tree.root(), "type", "block");
        tree.set_attr(tree.root(), "device", "disk");
        assert_eq!(
            tree.serialize(false).unwrap(),
            r#"<disk type="block" device="disk"/>"#
        );
    }

    #[test]
    fn test_escaping() {
        let mut tree = XmlTree::new("name");
        tree.set_text(tree.root(), "a<b&c");
        assert_eq!(
            tree.serialize(false).unwrap(),
            "<name>a&lt;b&amp;c</name>"
        );

        let mut tree = XmlTree::new("source");
        tree.set_attr(tree.root(), "dev", "a\"b");
        assert_eq!(
            tree.serialize(false).unwrap(),
            r#"<source dev="a&quot;b"/>"#
        );
    }

    #[test]
    fn test_detached_nodes_not_serialized() {
        let mut tree = XmlTree::new("domain");
        let clock = tree.append_element(tree.root(), "clock");
        tree.append_element(tree.root(), "on_poweroff");
        tree.detach(clock);
        assert_eq!(
            tree.serialize(false).unwrap(),
            "<domain><on_poweroff/></domain>"
        );
    }

    #[test]
    fn test_pretty_print() {
        let mut tree = XmlTree::new("domain");
        tree.set_attr(tree.root(), "type", "kvm");
        let memory = tree.append_element(tree.root(), "memory");
        tree.set_text(memory, "2048");
        let expected = "<domain type=\"kvm\">\n  <memory>2048</memory>\n</domain>";
        assert_eq!(tree.serialize(true).unwrap(), expected);
    }
}
