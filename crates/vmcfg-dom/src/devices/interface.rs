//! Bridged network interfaces.

use crate::devices::{detach_device_nodes, devices_tag};
use crate::element::Element;
use crate::error::Result;
use crate::util::generate_mac;
use vmcfg_xml::{NodeId, XmlTree};

/// A bridge-backed network interface.
///
/// When no MAC address is given, a random locally administered one is
/// generated at construction, so the same element always attaches with the
/// same address.
#[derive(Debug, Clone)]
pub struct BridgedInterface {
    bridge: String,
    mac: String,
    model: String,
}

impl BridgedInterface {
    pub fn new(bridge: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            mac: generate_mac(),
            model: "virtio".to_owned(),
        }
    }

    pub fn with_mac(bridge: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            mac: mac.into(),
            model: "virtio".to_owned(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The MAC address this interface will attach with.
    pub fn mac_address(&self) -> &str {
        &self.mac
    }
}

impl Element for BridgedInterface {
    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);

        let interface_tag = tree.append_element(devices, "interface");
        tree.set_attr(interface_tag, "type", "bridge");

        let source_tag = tree.append_element(interface_tag, "source");
        tree.set_attr(source_tag, "bridge", &self.bridge);

        let mac_tag = tree.append_element(interface_tag, "mac");
        tree.set_attr(mac_tag, "address", &self.mac);

        let model_tag = tree.append_element(interface_tag, "model");
        tree.set_attr(model_tag, "type", &self.model);

        Ok(vec![interface_tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_structure() {
        let iface = BridgedInterface::with_mac("br0", "02:11:22:33:44:55");
        let mut tree = XmlTree::new("domain");
        let nodes = iface.attach_xml(&mut tree).unwrap();
        assert_eq!(nodes.len(), 1);

        let devices = tree.find_child(tree.root(), "devices").unwrap();
        let interface = tree.find_child(devices, "interface").unwrap();
        assert_eq!(tree.get(interface).get_attr("type"), Some("bridge"));

        let mac = tree.find_child(interface, "mac").unwrap();
        assert_eq!(tree.get(mac).get_attr("address"), Some("02:11:22:33:44:55"));

        let source = tree.find_child(interface, "source").unwrap();
        assert_eq!(tree.get(source).get_attr("bridge"), Some("br0"));

        let model = tree.find_child(interface, "model").unwrap();
        assert_eq!(tree.get(model).get_attr("type"), Some("virtio"));
    }

    #[test]
    fn test_generated_mac_is_stable_per_element() {
        let iface = BridgedInterface::new("br0");
        let first = iface.mac_address().to_owned();
        assert_eq!(iface.mac_address(), first);
    }
}
