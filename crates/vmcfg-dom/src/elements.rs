//! Leaf elements that attach directly under the domain root.

use crate::element::Element;
use crate::error::{Error, Result};
use crate::util::bool_to_str;
use uuid::Uuid;
use vmcfg_xml::{NodeId, XmlTree};

/// The `<name>` element.
#[derive(Debug, Clone)]
pub struct Name {
    name: String,
}

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Element for Name {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let tag = tree.append_element(tree.root(), "name");
        tree.set_text(tag, &self.name);
        Ok(vec![tag])
    }
}

/// The `<description>` element.
#[derive(Debug, Clone)]
pub struct Description {
    description: String,
}

impl Description {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl Element for Description {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let tag = tree.append_element(tree.root(), "description");
        tree.set_text(tag, &self.description);
        Ok(vec![tag])
    }
}

/// The `<memory>` and `<currentMemory>` pair.
///
/// When `current_memory` is not given it defaults to `memory`.
#[derive(Debug, Clone)]
pub struct Memory {
    memory: u64,
    current_memory: u64,
}

impl Memory {
    pub fn new(memory: u64, current_memory: Option<u64>) -> Self {
        Self {
            memory,
            current_memory: current_memory.unwrap_or(memory),
        }
    }
}

impl Element for Memory {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let memory_tag = tree.append_element(tree.root(), "memory");
        tree.set_text(memory_tag, self.memory.to_string());

        let current_tag = tree.append_element(tree.root(), "currentMemory");
        tree.set_text(current_tag, self.current_memory.to_string());

        Ok(vec![memory_tag, current_tag])
    }
}

/// The `<uuid>` element. The value is validated at construction.
#[derive(Debug, Clone)]
pub struct DomainUuid {
    uuid: Uuid,
}

impl DomainUuid {
    /// Parse and validate a UUID string.
    pub fn new(uuid: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(uuid).map_err(|e| Error::InvalidValue {
            field: "uuid",
            reason: e.to_string(),
        })?;
        Ok(Self { uuid })
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self { uuid }
    }
}

impl Element for DomainUuid {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let tag = tree.append_element(tree.root(), "uuid");
        tree.set_text(tag, self.uuid.to_string());
        Ok(vec![tag])
    }
}

/// An opaque metadata blob, grafted under the root as-is.
#[derive(Debug, Clone)]
pub struct Metadata {
    blob: XmlTree,
}

impl Metadata {
    pub fn new(blob: XmlTree) -> Self {
        Self { blob }
    }
}

impl Element for Metadata {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let copied = tree.graft(tree.root(), &self.blob, self.blob.root());
        Ok(vec![copied])
    }
}

/// Virtualization type for the OS block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtType {
    Hvm,
}

impl VirtType {
    pub fn as_str(self) -> &'static str {
        match self {
            VirtType::Hvm => "hvm",
        }
    }
}

/// The `<os>` block: type, architecture, machine, and boot device order.
#[derive(Debug, Clone)]
pub struct OsConfig {
    arch: String,
    machine: String,
    virt_type: VirtType,
    boot_dev_order: Vec<String>,
}

impl OsConfig {
    pub fn new(
        arch: impl Into<String>,
        machine: impl Into<String>,
        virt_type: VirtType,
        boot_dev_order: Vec<String>,
    ) -> Self {
        Self {
            arch: arch.into(),
            machine: machine.into(),
            virt_type,
            boot_dev_order,
        }
    }
}

impl Element for OsConfig {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let os_tag = tree.append_element(tree.root(), "os");

        let type_tag = tree.append_element(os_tag, "type");
        tree.set_attr(type_tag, "arch", &self.arch);
        tree.set_attr(type_tag, "machine", &self.machine);
        tree.set_text(type_tag, self.virt_type.as_str());

        let mut nodes = vec![os_tag, type_tag];
        for dev in &self.boot_dev_order {
            let boot_tag = tree.append_element(os_tag, "boot");
            tree.set_attr(boot_tag, "dev", dev);
            nodes.push(boot_tag);
        }

        Ok(nodes)
    }
}

/// OS config for QEMU/KVM guests, where `hvm` is the only virt type.
#[derive(Debug, Clone)]
pub struct QemuOsConfig {
    inner: OsConfig,
}

impl QemuOsConfig {
    pub fn new(
        arch: impl Into<String>,
        machine: impl Into<String>,
        boot_dev_order: Vec<String>,
    ) -> Self {
        Self {
            inner: OsConfig::new(arch, machine, VirtType::Hvm, boot_dev_order),
        }
    }
}

impl Element for QemuOsConfig {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        self.inner.attach_xml(tree)
    }
}

/// The `<pm>` block with suspend-to-mem / suspend-to-disk toggles.
#[derive(Debug, Clone, Default)]
pub struct PowerManagement {
    suspend_to_mem: bool,
    suspend_to_disk: bool,
}

impl PowerManagement {
    pub fn new(suspend_to_mem: bool, suspend_to_disk: bool) -> Self {
        Self {
            suspend_to_mem,
            suspend_to_disk,
        }
    }
}

impl Element for PowerManagement {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let pm_tag = tree.append_element(tree.root(), "pm");

        let mem_tag = tree.append_element(pm_tag, "suspend-to-mem");
        tree.set_attr(mem_tag, "enabled", bool_to_str(self.suspend_to_mem));

        let disk_tag = tree.append_element(pm_tag, "suspend-to-disk");
        tree.set_attr(disk_tag, "enabled", bool_to_str(self.suspend_to_disk));

        Ok(vec![pm_tag])
    }
}

/// The `<vcpu>` count and `<cpu>` mode pair.
#[derive(Debug, Clone)]
pub struct Cpu {
    vcpus: u32,
    mode: String,
}

impl Cpu {
    pub fn new(vcpus: u32) -> Self {
        Self::with_mode(vcpus, "host-model")
    }

    pub fn with_mode(vcpus: u32, mode: impl Into<String>) -> Self {
        Self {
            vcpus,
            mode: mode.into(),
        }
    }
}

impl Element for Cpu {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let vcpu_tag = tree.append_element(tree.root(), "vcpu");
        tree.set_text(vcpu_tag, self.vcpus.to_string());

        let cpu_tag = tree.append_element(tree.root(), "cpu");
        tree.set_attr(cpu_tag, "mode", &self.mode);

        Ok(vec![vcpu_tag, cpu_tag])
    }
}
