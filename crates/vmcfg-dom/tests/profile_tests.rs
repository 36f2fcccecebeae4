//! End-to-end test of the default KVM hardware profile.

use uuid::Uuid;
use vmcfg_dom::devices::{BridgedInterface, Disk, DiskSource, DiskTarget, Driver, DriverOptions,
    DriverType, TargetBus};
use vmcfg_dom::profiles::KvmDefaultHardware;
use vmcfg_dom::util::DiskLetters;
use vmcfg_dom::{Domain, DomainKind};

#[test]
fn test_default_hardware_document() {
    let elements = KvmDefaultHardware::new()
        .memory(2_097_152)
        .name("test-vm")
        .vcpus(2)
        .uuid(Uuid::parse_str("8a7f4b2e-1c3d-4e5f-9a0b-6c7d8e9f0a1b").unwrap())
        .boot_dev_order(vec!["hd".to_owned()])
        .build()
        .unwrap();
    let dom = Domain::with_elements(DomainKind::Kvm, elements).unwrap();

    let xml = dom.emit_xml(false).unwrap();

    assert!(xml.starts_with("<domain type=\"kvm\">"));
    assert_eq!(xml.matches("<memory>2097152</memory>").count(), 1);
    assert_eq!(xml.matches("<currentMemory>2097152</currentMemory>").count(), 1);
    assert_eq!(xml.matches("<name>test-vm</name>").count(), 1);
    assert_eq!(xml.matches("<vcpu>2</vcpu>").count(), 1);
    assert!(xml.contains("<uuid>8a7f4b2e-1c3d-4e5f-9a0b-6c7d8e9f0a1b</uuid>"));
    assert!(xml.contains("machine=\"q35\""));
    assert!(xml.contains("<boot dev=\"hd\"/>"));
    assert!(xml.contains("<emulator>/usr/bin/qemu-system-x86_64</emulator>"));

    // One of each unique device.
    assert_eq!(xml.matches("<channel type=\"unix\">").count(), 1);
    assert_eq!(xml.matches("<console type=\"pty\"/>").count(), 1);
    assert_eq!(xml.matches("<memballoon model=\"virtio\"/>").count(), 1);
    assert_eq!(xml.matches("<rng model=\"virtio\">").count(), 1);
    assert_eq!(xml.matches("model=\"qemu-xhci\"").count(), 1);

    // x86_64 default arch gets the features block.
    assert!(xml.contains("<features><acpi/><apic/></features>"));

    // The profile leaves storage and networking to the caller.
    assert!(!xml.contains("<disk"));
    assert!(!xml.contains("<interface"));
}

#[test]
fn test_profile_plus_storage_and_network() {
    let elements = KvmDefaultHardware::new()
        .memory(4_194_304)
        .name("web-01")
        .vcpus(4)
        .build()
        .unwrap();
    let mut dom = Domain::with_elements(DomainKind::Kvm, elements).unwrap();

    let mut letters = DiskLetters::new("vd");
    let disk = Disk::new(
        DiskSource::block_path("/dev/vg0/web-01-root"),
        DiskTarget::disk(letters.next().unwrap(), Some(TargetBus::Virtio)),
        DriverOptions::builder(Driver::Qemu)
            .driver_type(DriverType::Raw)
            .build()
            .unwrap(),
    );
    dom.attach_element(disk).unwrap();
    dom.attach_element(BridgedInterface::with_mac("br0", "02:00:00:00:00:01"))
        .unwrap();

    let xml = dom.emit_xml(false).unwrap();
    assert!(xml.contains("<target dev=\"vda\" bus=\"virtio\"/>"));
    assert!(xml.contains("<source bridge=\"br0\"/>"));
    assert_eq!(xml.matches("<devices>").count(), 1);
}
