//! Guest feature toggles, including the hyperv and kvm grouping bundles.
//!
//! Standalone features are a closed enum; the hyperv/kvm sub-features are
//! separate types that can only reach the tree through their grouping
//! bundle, so attaching a parented sub-feature at the top level is
//! unrepresentable rather than checked.

use crate::element::Element;
use crate::error::{Error, Result};
use crate::util::bool_to_str;
use vmcfg_xml::{NodeId, XmlTree};

/// GIC interrupt controller version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GicVersion {
    Host,
    Version(u32),
}

/// Driver backing the ioapic feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoapicDriver {
    Kvm,
    Qemu,
}

impl IoapicDriver {
    pub fn as_str(self) -> &'static str {
        match self {
            IoapicDriver::Kvm => "kvm",
            IoapicDriver::Qemu => "qemu",
        }
    }
}

/// HPT resizing policy (ppc64).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HptResizing {
    Enabled,
    Disabled,
    Required,
}

impl HptResizing {
    pub fn as_str(self) -> &'static str {
        match self {
            HptResizing::Enabled => "enabled",
            HptResizing::Disabled => "disabled",
            HptResizing::Required => "required",
        }
    }
}

/// cfpc values (ppc64 security).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfpcValue {
    Broken,
    Workaround,
    Fixed,
}

impl CfpcValue {
    pub fn as_str(self) -> &'static str {
        match self {
            CfpcValue::Broken => "broken",
            CfpcValue::Workaround => "workaround",
            CfpcValue::Fixed => "fixed",
        }
    }
}

/// sbbc values (ppc64 security).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbbcValue {
    Broken,
    Workaround,
    Fixed,
}

impl SbbcValue {
    pub fn as_str(self) -> &'static str {
        match self {
            SbbcValue::Broken => "broken",
            SbbcValue::Workaround => "workaround",
            SbbcValue::Fixed => "fixed",
        }
    }
}

/// ibs values (ppc64 security).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IbsValue {
    Broken,
    Workaround,
    Fixed,
    FixedCcd,
    FixedNa,
    FixedIbs,
}

impl IbsValue {
    pub fn as_str(self) -> &'static str {
        match self {
            IbsValue::Broken => "broken",
            IbsValue::Workaround => "workaround",
            IbsValue::Fixed => "fixed",
            IbsValue::FixedCcd => "fixed-ccd",
            IbsValue::FixedNa => "fixed-na",
            IbsValue::FixedIbs => "fixed-ibs",
        }
    }
}

/// A standalone guest feature, attachable through [`Features`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    Pae,
    NonPae,
    Acpi,
    Apic { eoi: Option<bool> },
    Hap { state: bool },
    Viridian,
    PvSpinlock { state: bool },
    Pmu { state: bool },
    Gic { state: bool, version: Option<GicVersion> },
    Smm { state: bool, tseg_mib: Option<u64> },
    Ioapic { driver: IoapicDriver },
    Hpt { resizing: HptResizing, maxpagesize_mib: Option<u64> },
    VmCoreInfo,
    Htm { state: bool },
    NestedHv { state: bool },
    CcfAssist { state: bool },
    Cfpc { value: CfpcValue },
    Sbbc { value: SbbcValue },
    Ibs { value: IbsValue },
    Kvm(KvmFeatures),
    HyperV(HyperVFeatures),
}

impl Feature {
    fn attach_xml(&self, tree: &mut XmlTree, features_tag: NodeId) {
        match self {
            Feature::Pae => {
                tree.append_element(features_tag, "pae");
            }
            Feature::NonPae => {
                tree.append_element(features_tag, "nonpae");
            }
            Feature::Acpi => {
                tree.append_element(features_tag, "acpi");
            }
            Feature::Apic { eoi } => {
                let tag = tree.append_element(features_tag, "apic");
                if let Some(eoi) = eoi {
                    tree.set_attr(tag, "eoi", bool_to_str(*eoi));
                }
            }
            Feature::Hap { state } => {
                let tag = tree.append_element(features_tag, "hap");
                tree.set_attr(tag, "state", bool_to_str(*state));
            }
            Feature::Viridian => {
                tree.append_element(features_tag, "viridian");
            }
            Feature::PvSpinlock { state } => {
                let tag = tree.append_element(features_tag, "pvspinlock");
                tree.set_attr(tag, "state", bool_to_str(*state));
            }
            Feature::Pmu { state } => {
                let tag = tree.append_element(features_tag, "pmu");
                tree.set_attr(tag, "state", bool_to_str(*state));
            }
            Feature::Gic { state, version } => {
                let tag = tree.append_element(features_tag, "gic");
                tree.set_attr(tag, "state", bool_to_str(*state));
                match version {
                    Some(GicVersion::Host) => tree.set_attr(tag, "version", "host"),
                    Some(GicVersion::Version(v)) => tree.set_attr(tag, "version", v.to_string()),
                    None => {}
                }
            }
            Feature::Smm { state, tseg_mib } => {
                let tag = tree.append_element(features_tag, "smm");
                tree.set_attr(tag, "state", bool_to_str(*state));
                if let Some(tseg) = tseg_mib {
                    let tseg_tag = tree.append_element(tag, "tseg");
                    tree.set_attr(tseg_tag, "unit", "MiB");
                    tree.set_text(tseg_tag, tseg.to_string());
                }
            }
            Feature::Ioapic { driver } => {
                let tag = tree.append_element(features_tag, "ioapic");
                tree.set_attr(tag, "driver", driver.as_str());
            }
            Feature::Hpt {
                resizing,
                maxpagesize_mib,
            } => {
                let tag = tree.append_element(features_tag, "hpt");
                tree.set_attr(tag, "resizing", resizing.as_str());
                if let Some(maxpagesize) = maxpagesize_mib {
                    let size_tag = tree.append_element(tag, "maxpagesize");
                    tree.set_attr(size_tag, "unit", "MiB");
                    tree.set_text(size_tag, maxpagesize.to_string());
                }
            }
            Feature::VmCoreInfo => {
                tree.append_element(features_tag, "vmcoreinfo");
            }
            Feature::Htm { state } => {
                let tag = tree.append_element(features_tag, "htm");
                tree.set_attr(tag, "state", bool_to_str(*state));
            }
            Feature::NestedHv { state } => {
                let tag = tree.append_element(features_tag, "nested-hv");
                tree.set_attr(tag, "state", bool_to_str(*state));
            }
            Feature::CcfAssist { state } => {
                let tag = tree.append_element(features_tag, "ccf-assist");
                tree.set_attr(tag, "state", bool_to_str(*state));
            }
            Feature::Cfpc { value } => {
                let tag = tree.append_element(features_tag, "cfpc");
                tree.set_attr(tag, "value", value.as_str());
            }
            Feature::Sbbc { value } => {
                let tag = tree.append_element(features_tag, "sbbc");
                tree.set_attr(tag, "value", value.as_str());
            }
            Feature::Ibs { value } => {
                let tag = tree.append_element(features_tag, "ibs");
                tree.set_attr(tag, "value", value.as_str());
            }
            Feature::Kvm(features) => features.attach_xml(tree, features_tag),
            Feature::HyperV(features) => features.attach_xml(tree, features_tag),
        }
    }
}

/// Validated spinlocks sub-feature (retries must be at least 4095).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spinlocks {
    state: bool,
    retries: Option<u32>,
}

impl Spinlocks {
    pub fn new(state: bool, retries: Option<u32>) -> Result<Self> {
        if let Some(retries) = retries {
            if retries < 4095 {
                return Err(Error::InvalidValue {
                    field: "retries",
                    reason: format!("must be at least 4095, got {retries}"),
                });
            }
        }
        Ok(Self { state, retries })
    }
}

/// Validated vendor_id sub-feature (value is at most 12 characters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorId {
    state: bool,
    value: Option<String>,
}

impl VendorId {
    pub fn new(state: bool, value: Option<String>) -> Result<Self> {
        if let Some(value) = &value {
            if value.len() > 12 {
                return Err(Error::InvalidValue {
                    field: "vendor_id",
                    reason: format!("must be 12 characters or less, got {:?}", value),
                });
            }
        }
        Ok(Self { state, value })
    }
}

/// A sub-feature of the hyperv grouping.
///
/// These only exist inside a [`HyperVFeatures`] bundle; their declared
/// parent context is the `hyperv` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperVFeature {
    Relaxed { state: bool },
    Vapic { state: bool },
    Spinlocks(Spinlocks),
    VpIndex { state: bool },
    Runtime { state: bool },
    Synic { state: bool },
    Stimer { state: bool, direct: Option<bool> },
    Reset { state: bool },
    VendorId(VendorId),
    Frequencies { state: bool },
    Reenlightenment { state: bool },
    TlbFlush { state: bool },
    Ipi { state: bool },
    Evmcs { state: bool },
}

impl HyperVFeature {
    /// The grouping tag this sub-feature requires as its parent.
    pub fn parent_tag(&self) -> &'static str {
        "hyperv"
    }

    fn attach_xml(&self, tree: &mut XmlTree, parent: NodeId) {
        match self {
            HyperVFeature::Relaxed { state } => {
                bool_state(tree, parent, "relaxed", *state);
            }
            HyperVFeature::Vapic { state } => {
                bool_state(tree, parent, "vapic", *state);
            }
            HyperVFeature::Spinlocks(spinlocks) => {
                let tag = bool_state(tree, parent, "spinlocks", spinlocks.state);
                if let Some(retries) = spinlocks.retries {
                    tree.set_attr(tag, "retries", retries.to_string());
                }
            }
            HyperVFeature::VpIndex { state } => {
                bool_state(tree, parent, "vpindex", *state);
            }
            HyperVFeature::Runtime { state } => {
                bool_state(tree, parent, "runtime", *state);
            }
            HyperVFeature::Synic { state } => {
                bool_state(tree, parent, "synic", *state);
            }
            HyperVFeature::Stimer { state, direct } => {
                let tag = bool_state(tree, parent, "stimer", *state);
                if let Some(direct) = direct {
                    let direct_tag = tree.append_element(tag, "direct");
                    tree.set_attr(direct_tag, "state", bool_to_str(*direct));
                }
            }
            HyperVFeature::Reset { state } => {
                bool_state(tree, parent, "reset", *state);
            }
            HyperVFeature::VendorId(vendor) => {
                let tag = bool_state(tree, parent, "vendor_id", vendor.state);
                if let Some(value) = &vendor.value {
                    tree.set_attr(tag, "value", value);
                }
            }
            HyperVFeature::Frequencies { state } => {
                bool_state(tree, parent, "frequencies", *state);
            }
            HyperVFeature::Reenlightenment { state } => {
                bool_state(tree, parent, "reenlightenment", *state);
            }
            HyperVFeature::TlbFlush { state } => {
                bool_state(tree, parent, "tlbflush", *state);
            }
            HyperVFeature::Ipi { state } => {
                bool_state(tree, parent, "ipi", *state);
            }
            HyperVFeature::Evmcs { state } => {
                bool_state(tree, parent, "evmcs", *state);
            }
        }
    }
}

fn bool_state(tree: &mut XmlTree, parent: NodeId, name: &str, state: bool) -> NodeId {
    let tag = tree.append_element(parent, name);
    tree.set_attr(tag, "state", bool_to_str(state));
    tag
}

/// The hyperv grouping feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperVFeatures {
    features: Vec<HyperVFeature>,
}

impl HyperVFeatures {
    /// Build a hyperv bundle from sub-features.
    ///
    /// # Errors
    ///
    /// [`Error::NoFeaturesSet`] if the list is empty.
    pub fn new(features: Vec<HyperVFeature>) -> Result<Self> {
        if features.is_empty() {
            return Err(Error::NoFeaturesSet { group: "hyperv" });
        }
        Ok(Self { features })
    }

    /// The canonical everything-enabled set, matching what a Windows guest
    /// typically wants: spinlocks with 4096 retries, stimer with direct
    /// mode, and every other enlightenment switched on.
    pub fn all_enabled() -> Self {
        let spinlocks = Spinlocks {
            state: true,
            retries: Some(4096),
        };
        let vendor_id = VendorId {
            state: true,
            value: None,
        };
        Self {
            features: vec![
                HyperVFeature::Relaxed { state: true },
                HyperVFeature::Vapic { state: true },
                HyperVFeature::Spinlocks(spinlocks),
                HyperVFeature::VpIndex { state: true },
                HyperVFeature::Runtime { state: true },
                HyperVFeature::Synic { state: true },
                HyperVFeature::Stimer {
                    state: true,
                    direct: Some(true),
                },
                HyperVFeature::Reset { state: true },
                HyperVFeature::VendorId(vendor_id),
                HyperVFeature::Frequencies { state: true },
                HyperVFeature::Reenlightenment { state: true },
                HyperVFeature::TlbFlush { state: true },
                HyperVFeature::Ipi { state: true },
                HyperVFeature::Evmcs { state: true },
            ],
        }
    }

    fn attach_xml(&self, tree: &mut XmlTree, features_tag: NodeId) {
        let hyperv_tag = tree.append_element(features_tag, "hyperv");
        for feature in &self.features {
            // Internal invariant: sub-features can only be built for this
            // grouping, so a mismatch here is a composition bug.
            assert_eq!(feature.parent_tag(), "hyperv");
            feature.attach_xml(tree, hyperv_tag);
        }
    }
}

/// A sub-feature of the kvm grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvmFeature {
    Hidden { state: bool },
    HintDedicated { state: bool },
    PollControl { state: bool },
}

impl KvmFeature {
    /// The grouping tag this sub-feature requires as its parent.
    pub fn parent_tag(&self) -> &'static str {
        "kvm"
    }

    fn attach_xml(&self, tree: &mut XmlTree, parent: NodeId) {
        match self {
            KvmFeature::Hidden { state } => bool_state(tree, parent, "hidden", *state),
            KvmFeature::HintDedicated { state } => {
                bool_state(tree, parent, "hint-dedicated", *state)
            }
            KvmFeature::PollControl { state } => bool_state(tree, parent, "poll-control", *state),
        };
    }
}

/// The kvm grouping feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvmFeatures {
    features: Vec<KvmFeature>,
}

impl KvmFeatures {
    /// Build a kvm bundle from sub-features.
    ///
    /// # Errors
    ///
    /// [`Error::NoFeaturesSet`] if the list is empty.
    pub fn new(features: Vec<KvmFeature>) -> Result<Self> {
        if features.is_empty() {
            return Err(Error::NoFeaturesSet { group: "kvm" });
        }
        Ok(Self { features })
    }

    fn attach_xml(&self, tree: &mut XmlTree, features_tag: NodeId) {
        let kvm_tag = tree.append_element(features_tag, "kvm");
        for feature in &self.features {
            assert_eq!(feature.parent_tag(), "kvm");
            feature.attach_xml(tree, kvm_tag);
        }
    }
}

/// The `<features>` element, holding any mix of standalone features.
///
/// With zero features it contributes no nodes at all.
#[derive(Debug, Clone)]
pub struct Features {
    features: Vec<Feature>,
}

impl Features {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

impl Element for Features {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        if self.features.is_empty() {
            return Ok(vec![]);
        }

        let features_tag = tree.append_element(tree.root(), "features");
        for feature in &self.features {
            feature.attach_xml(tree, features_tag);
        }
        Ok(vec![features_tag])
    }
}

/// The default x86/x86_64 feature block: acpi and apic.
#[derive(Debug, Clone)]
pub struct X86Features {
    acpi: bool,
    apic: bool,
}

impl X86Features {
    pub fn new(acpi: bool, apic: bool) -> Self {
        Self { acpi, apic }
    }
}

impl Default for X86Features {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Element for X86Features {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let features_tag = tree.append_element(tree.root(), "features");
        if self.acpi {
            tree.append_element(features_tag, "acpi");
        }
        if self.apic {
            tree.append_element(features_tag, "apic");
        }
        Ok(vec![features_tag])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hyperv_bundle_rejected() {
        let err = HyperVFeatures::new(vec![]).unwrap_err();
        assert!(matches!(err, Error::NoFeaturesSet { group: "hyperv" }));
    }

    #[test]
    fn test_empty_kvm_bundle_rejected() {
        let err = KvmFeatures::new(vec![]).unwrap_err();
        assert!(matches!(err, Error::NoFeaturesSet { group: "kvm" }));
    }

    #[test]
    fn test_spinlocks_retries_minimum() {
        assert!(Spinlocks::new(true, Some(4094)).is_err());
        assert!(Spinlocks::new(true, Some(4095)).is_ok());
        assert!(Spinlocks::new(true, None).is_ok());
    }

    #[test]
    fn test_vendor_id_length() {
        assert!(VendorId::new(true, Some("KVMKVMKVMKVM!".into())).is_err());
        assert!(VendorId::new(true, Some("KVMKVMKVM".into())).is_ok());
    }

    #[test]
    fn test_all_enabled_emits_every_enlightenment() {
        let mut tree = XmlTree::new("features");
        let root = tree.root();
        HyperVFeatures::all_enabled().attach_xml(&mut tree, root);

        let hyperv = tree.find_child(root, "hyperv").unwrap();
        assert_eq!(tree.children(hyperv).count(), 14);

        let spinlocks = tree.find_child(hyperv, "spinlocks").unwrap();
        assert_eq!(tree.get(spinlocks).get_attr("state"), Some("yes"));
        assert_eq!(tree.get(spinlocks).get_attr("retries"), Some("4096"));
    }

    #[test]
    fn test_stimer_direct_child() {
        let mut tree = XmlTree::new("hyperv");
        let root = tree.root();
        HyperVFeature::Stimer {
            state: true,
            direct: Some(false),
        }
        .attach_xml(&mut tree, root);

        let stimer = tree.find_child(root, "stimer").unwrap();
        let direct = tree.find_child(stimer, "direct").unwrap();
        assert_eq!(tree.get(direct).get_attr("state"), Some("no"));
    }
}
