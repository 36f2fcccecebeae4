//! Prebuilt hardware profiles.

use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;
use crate::devices::{
    ConsolePty, Emulator, QemuAgentChannel, QemuXhciUsbController, Rng, VirtioMemballoon,
};
use crate::element::Element;
use crate::elements::{Cpu, DomainUuid, Memory, Metadata, Name, PowerManagement, QemuOsConfig};
use crate::error::{Error, Result};
use crate::features::X86Features;
use vmcfg_xml::XmlTree;

/// The default hardware of a typical KVM guest.
///
/// Builds the element list for a virtio-based Linux machine: emulator,
/// memory, name, OS config (q35), power management, UUID, guest agent
/// channel, clock, PTY console, CPU, memballoon, RNG, and USB controller.
/// Interfaces and disks are deliberately not included; attach those
/// separately.
#[derive(Debug, Default)]
pub struct KvmDefaultHardware {
    memory: Option<u64>,
    name: Option<String>,
    vcpus: Option<u32>,
    arch: Option<String>,
    boot_dev_order: Vec<String>,
    emulator_path: Option<String>,
    current_memory: Option<u64>,
    uuid: Option<Uuid>,
    metadata: Option<XmlTree>,
}

impl KvmDefaultHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guest memory in KiB. Required.
    pub fn memory(mut self, memory: u64) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Domain name. Required.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Virtual CPU count. Required.
    pub fn vcpus(mut self, vcpus: u32) -> Self {
        self.vcpus = Some(vcpus);
        self
    }

    /// Guest architecture. Defaults to `x86_64`.
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn boot_dev_order(mut self, order: Vec<String>) -> Self {
        self.boot_dev_order = order;
        self
    }

    /// Emulator binary path. Defaults to `/usr/bin/qemu-system-x86_64`.
    pub fn emulator_path(mut self, path: impl Into<String>) -> Self {
        self.emulator_path = Some(path.into());
        self
    }

    /// Ballooned-down memory in KiB. Defaults to `memory`.
    pub fn current_memory(mut self, current_memory: u64) -> Self {
        self.current_memory = Some(current_memory);
        self
    }

    /// Domain UUID. A random one is generated when not given.
    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    /// An opaque metadata blob grafted under the domain root.
    pub fn metadata(mut self, metadata: XmlTree) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build the element list.
    ///
    /// # Errors
    ///
    /// [`Error::MissingRequiredField`] when `memory`, `name`, or `vcpus`
    /// was not set.
    pub fn build(self) -> Result<Vec<Box<dyn Element>>> {
        let memory = self
            .memory
            .ok_or(Error::MissingRequiredField { field: "memory" })?;
        let name = self
            .name
            .ok_or(Error::MissingRequiredField { field: "name" })?;
        let vcpus = self
            .vcpus
            .ok_or(Error::MissingRequiredField { field: "vcpus" })?;

        let arch = self.arch.unwrap_or_else(|| "x86_64".to_owned());
        let emulator_path = self
            .emulator_path
            .unwrap_or_else(|| "/usr/bin/qemu-system-x86_64".to_owned());
        let uuid = self.uuid.unwrap_or_else(Uuid::new_v4);

        let features = if arch == "x86" || arch == "x86_64" {
            Some(X86Features::default())
        } else {
            warn!(%arch, "unknown architecture, features block may be missing");
            None
        };

        let mut elements: Vec<Box<dyn Element>> = vec![
            Box::new(Emulator::new(emulator_path)),
            Box::new(Memory::new(memory, self.current_memory)),
            Box::new(Name::new(name)),
            Box::new(QemuOsConfig::new(arch, "q35", self.boot_dev_order)),
            Box::new(PowerManagement::default()),
            Box::new(DomainUuid::from_uuid(uuid)),
            Box::new(QemuAgentChannel),
            Box::new(Clock::default()),
            Box::new(ConsolePty),
            Box::new(Cpu::new(vcpus)),
            Box::new(VirtioMemballoon),
            Box::new(Rng::default()),
            Box::new(QemuXhciUsbController::default()),
        ];

        if let Some(features) = features {
            elements.push(Box::new(features));
        }
        if let Some(metadata) = self.metadata {
            elements.push(Box::new(Metadata::new(metadata)));
        }

        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let err = KvmDefaultHardware::new()
            .name("test-vm")
            .vcpus(2)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRequiredField { field: "memory" }
        ));
    }

    #[test]
    fn test_x86_gets_features_block() {
        let elements = KvmDefaultHardware::new()
            .memory(2_097_152)
            .name("test-vm")
            .vcpus(2)
            .build()
            .unwrap();
        // 13 base elements plus the x86 features block.
        assert_eq!(elements.len(), 14);
    }

    #[test]
    fn test_unknown_arch_skips_features() {
        let elements = KvmDefaultHardware::new()
            .memory(2_097_152)
            .name("test-vm")
            .vcpus(2)
            .arch("riscv64")
            .build()
            .unwrap();
        assert_eq!(elements.len(), 13);
    }
}
