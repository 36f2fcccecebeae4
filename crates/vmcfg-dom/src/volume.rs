//! Standalone storage volume documents.

use vmcfg_xml::XmlTree;

/// A storage volume description, serialized independently of any domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    /// Capacity in bytes.
    pub capacity: u64,
}

impl Volume {
    pub fn new(name: impl Into<String>, capacity: u64) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }

    /// Serialize the volume document.
    pub fn emit_xml(&self, pretty: bool) -> vmcfg_xml::Result<String> {
        let mut tree = XmlTree::new("volume");
        let root = tree.root();

        let name_tag = tree.append_element(root, "name");
        tree.set_text(name_tag, &self.name);

        let capacity_tag = tree.append_element(root, "capacity");
        tree.set_text(capacity_tag, self.capacity.to_string());

        tree.serialize(pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_volume_document() {
        let volume = Volume::new("guest-root", 10_737_418_240);
        let xml = volume.emit_xml(false).unwrap();
        assert_eq!(
            xml,
            "<volume><name>guest-root</name><capacity>10737418240</capacity></volume>"
        );
    }

    #[test]
    fn test_volume_document_pretty() {
        let volume = Volume::new("guest-root", 1024);
        let xml = volume.emit_xml(true).unwrap();
        assert_eq!(
            xml,
            "<volume>\n  <name>guest-root</name>\n  <capacity>1024</capacity>\n</volume>"
        );
    }
}
