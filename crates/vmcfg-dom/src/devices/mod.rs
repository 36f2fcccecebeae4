//! Device elements and the shared `<devices>` container lifecycle.
//!
//! All device elements attach their nodes under one shared container node.
//! The container is created lazily by whichever device attaches first and
//! pruned when a detach leaves it without children — it exists if and only
//! if at least one device element's nodes are attached. Removal order
//! across sibling devices is caller-controlled, so emptiness is re-checked
//! on every detach instead of keeping a count.

pub mod disk;
pub mod interface;

use crate::element::Element;
use crate::error::Result;
use vmcfg_xml::{NodeId, XmlTree};

pub use disk::{
    DeviceAttachment, Disk, DiskSource, DiskTarget, Driver, DriverCache, DriverDetectZeroes,
    DriverDiscard, DriverErrorPolicy, DriverIo, DriverOptions, DriverOptionsBuilder, DriverType,
    IoTune, IoTuneBuilder, NetHttpSource, SourceVolumeMode, TargetBus, Tray,
};
pub use interface::BridgedInterface;

/// Find the shared `<devices>` container, creating it if absent.
pub(crate) fn devices_tag(tree: &mut XmlTree) -> NodeId {
    let root = tree.root();
    match tree.find_child(root, "devices") {
        Some(tag) => tag,
        None => tree.append_element(root, "devices"),
    }
}

/// Detach a device element's nodes, then prune the container if that left
/// it empty. An empty node list takes the plain removal path only.
pub(crate) fn detach_device_nodes(tree: &mut XmlTree, nodes: &[NodeId]) {
    for &node in nodes {
        tree.detach(node);
    }

    if nodes.is_empty() {
        return;
    }

    let root = tree.root();
    let empty: Vec<NodeId> = tree
        .children_named(root, "devices")
        .filter(|&tag| !tree.has_children(tag))
        .collect();
    for tag in empty {
        tree.detach(tag);
    }
}

/// The `<emulator>` path.
#[derive(Debug, Clone)]
pub struct Emulator {
    path: String,
}

impl Emulator {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Element for Emulator {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);
        let tag = tree.append_element(devices, "emulator");
        tree.set_text(tag, &self.path);
        Ok(vec![tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

/// The QEMU guest agent channel (virtio, `org.qemu.guest_agent.0`).
#[derive(Debug, Clone, Default)]
pub struct QemuAgentChannel;

impl Element for QemuAgentChannel {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);

        let channel_tag = tree.append_element(devices, "channel");
        tree.set_attr(channel_tag, "type", "unix");

        let source_tag = tree.append_element(channel_tag, "source");
        tree.set_attr(source_tag, "mode", "bind");

        let target_tag = tree.append_element(channel_tag, "target");
        tree.set_attr(target_tag, "type", "virtio");
        tree.set_attr(target_tag, "name", "org.qemu.guest_agent.0");

        Ok(vec![channel_tag, source_tag, target_tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

/// A PTY-backed console.
#[derive(Debug, Clone, Default)]
pub struct ConsolePty;

impl Element for ConsolePty {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);
        let tag = tree.append_element(devices, "console");
        tree.set_attr(tag, "type", "pty");
        Ok(vec![tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

/// A virtio memory balloon.
#[derive(Debug, Clone, Default)]
pub struct VirtioMemballoon;

impl Element for VirtioMemballoon {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);
        let tag = tree.append_element(devices, "memballoon");
        tree.set_attr(tag, "model", "virtio");
        Ok(vec![tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

/// RNG device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RngModel {
    #[default]
    Virtio,
}

impl RngModel {
    pub fn as_str(self) -> &'static str {
        match self {
            RngModel::Virtio => "virtio",
        }
    }
}

/// A random number generator device with a host backend.
#[derive(Debug, Clone)]
pub struct Rng {
    model: RngModel,
    backend_dev: String,
}

impl Rng {
    pub fn new(model: RngModel, backend_dev: impl Into<String>) -> Self {
        Self {
            model,
            backend_dev: backend_dev.into(),
        }
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::new(RngModel::Virtio, "/dev/urandom")
    }
}

impl Element for Rng {
    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);

        let rng_tag = tree.append_element(devices, "rng");
        tree.set_attr(rng_tag, "model", self.model.as_str());

        let backend_tag = tree.append_element(rng_tag, "backend");
        tree.set_attr(backend_tag, "model", "random");
        tree.set_text(backend_tag, &self.backend_dev);

        Ok(vec![rng_tag, backend_tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

/// A virtio-serial controller.
#[derive(Debug, Clone, Default)]
pub struct VirtioSerialController;

impl Element for VirtioSerialController {
    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);
        let tag = tree.append_element(devices, "controller");
        tree.set_attr(tag, "type", "virtio-serial");
        Ok(vec![tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

/// A qemu-xhci USB controller.
#[derive(Debug, Clone)]
pub struct QemuXhciUsbController {
    ports: u32,
}

impl QemuXhciUsbController {
    pub fn new(ports: u32) -> Self {
        Self { ports }
    }
}

impl Default for QemuXhciUsbController {
    fn default() -> Self {
        Self::new(15)
    }
}

impl Element for QemuXhciUsbController {
    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let devices = devices_tag(tree);
        let tag = tree.append_element(devices, "controller");
        tree.set_attr(tag, "type", "usb");
        tree.set_attr(tag, "model", "qemu-xhci");
        tree.set_attr(tag, "ports", self.ports.to_string());
        Ok(vec![tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}
