//! Disk devices: sources, targets, driver options, and I/O tuning.
//!
//! All option objects validate at construction; by the time a [`Disk`]
//! exists, the only thing its attach step can fail on is a target-path
//! conflict with a disk that is already in the tree, checked before any
//! node is created.

use crate::devices::{detach_device_nodes, devices_tag};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::util::bool_to_str;
use url::Url;
use vmcfg_xml::{NodeId, XmlTree};

/// How the guest sees the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAttachment {
    Disk,
    Cdrom,
    Floppy,
}

impl DeviceAttachment {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceAttachment::Disk => "disk",
            DeviceAttachment::Cdrom => "cdrom",
            DeviceAttachment::Floppy => "floppy",
        }
    }
}

/// Tray state for removable media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tray {
    Open,
    Closed,
}

impl Tray {
    pub fn as_str(self) -> &'static str {
        match self {
            Tray::Open => "open",
            Tray::Closed => "closed",
        }
    }
}

/// Access mode for pool-backed volume sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceVolumeMode {
    Direct,
    Host,
}

impl SourceVolumeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceVolumeMode::Direct => "direct",
            SourceVolumeMode::Host => "host",
        }
    }
}

/// Bus the target device sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetBus {
    Virtio,
    Scsi,
    Ide,
    Sata,
    Usb,
    Sd,
}

impl TargetBus {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetBus::Virtio => "virtio",
            TargetBus::Scsi => "scsi",
            TargetBus::Ide => "ide",
            TargetBus::Sata => "sata",
            TargetBus::Usb => "usb",
            TargetBus::Sd => "sd",
        }
    }
}

/// Hypervisor driver name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Qemu,
}

impl Driver {
    pub fn as_str(self) -> &'static str {
        match self {
            Driver::Qemu => "qemu",
        }
    }
}

/// On-disk image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverType {
    Raw,
    Bochs,
    Qcow2,
    Qed,
}

impl DriverType {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverType::Raw => "raw",
            DriverType::Bochs => "bochs",
            DriverType::Qcow2 => "qcow2",
            DriverType::Qed => "qed",
        }
    }
}

/// Host cache mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCache {
    None,
    Default,
    Writethrough,
    Writeback,
    Directsync,
    Unsafe,
}

impl DriverCache {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverCache::None => "none",
            DriverCache::Default => "default",
            DriverCache::Writethrough => "writethrough",
            DriverCache::Writeback => "writeback",
            DriverCache::Directsync => "directsync",
            DriverCache::Unsafe => "unsafe",
        }
    }
}

/// I/O submission backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverIo {
    Native,
    Threads,
    IoUring,
}

impl DriverIo {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverIo::Native => "native",
            DriverIo::Threads => "threads",
            DriverIo::IoUring => "io_uring",
        }
    }
}

/// Policy on I/O errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorPolicy {
    Stop,
    Report,
    Ignore,
    Enospace,
}

impl DriverErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverErrorPolicy::Stop => "stop",
            DriverErrorPolicy::Report => "report",
            DriverErrorPolicy::Ignore => "ignore",
            DriverErrorPolicy::Enospace => "enospace",
        }
    }
}

/// Discard (trim) handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverDiscard {
    Unmap,
    Ignore,
}

impl DriverDiscard {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverDiscard::Unmap => "unmap",
            DriverDiscard::Ignore => "ignore",
        }
    }
}

/// Zero-write detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverDetectZeroes {
    Off,
    On,
    Unmap,
}

impl DriverDetectZeroes {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverDetectZeroes::Off => "off",
            DriverDetectZeroes::On => "on",
            DriverDetectZeroes::Unmap => "unmap",
        }
    }
}

/// Validated `<driver>` options.
///
/// Unset fields are omitted from the emitted attributes entirely; integers
/// become decimal strings and booleans become `on`/`off`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    driver: Driver,
    driver_type: Option<DriverType>,
    cache: Option<DriverCache>,
    io: Option<DriverIo>,
    error_policy: Option<DriverErrorPolicy>,
    rerror_policy: Option<DriverErrorPolicy>,
    ioeventfd: Option<bool>,
    event_idx: Option<bool>,
    copy_on_read: Option<bool>,
    discard: Option<DriverDiscard>,
    detect_zeroes: Option<DriverDetectZeroes>,
    queues: Option<u32>,
}

impl DriverOptions {
    pub fn builder(driver: Driver) -> DriverOptionsBuilder {
        DriverOptionsBuilder {
            driver,
            driver_type: None,
            cache: None,
            io: None,
            error_policy: None,
            rerror_policy: None,
            ioeventfd: None,
            event_idx: None,
            copy_on_read: None,
            discard: None,
            detect_zeroes: None,
            queues: None,
        }
    }

    fn attach_xml(&self, tree: &mut XmlTree, disk_tag: NodeId) -> NodeId {
        let driver_tag = tree.append_element(disk_tag, "driver");
        tree.set_attr(driver_tag, "name", self.driver.as_str());

        if let Some(driver_type) = self.driver_type {
            tree.set_attr(driver_tag, "type", driver_type.as_str());
        }
        if let Some(cache) = self.cache {
            tree.set_attr(driver_tag, "cache", cache.as_str());
        }
        if let Some(io) = self.io {
            tree.set_attr(driver_tag, "io", io.as_str());
        }
        if let Some(policy) = self.error_policy {
            tree.set_attr(driver_tag, "error_policy", policy.as_str());
        }
        if let Some(policy) = self.rerror_policy {
            tree.set_attr(driver_tag, "rerror_policy", policy.as_str());
        }
        if let Some(ioeventfd) = self.ioeventfd {
            tree.set_attr(driver_tag, "ioeventfd", on_off(ioeventfd));
        }
        if let Some(event_idx) = self.event_idx {
            tree.set_attr(driver_tag, "event_idx", on_off(event_idx));
        }
        if let Some(copy_on_read) = self.copy_on_read {
            tree.set_attr(driver_tag, "copy_on_read", on_off(copy_on_read));
        }
        if let Some(discard) = self.discard {
            tree.set_attr(driver_tag, "discard", discard.as_str());
        }
        if let Some(detect_zeroes) = self.detect_zeroes {
            tree.set_attr(driver_tag, "detect_zeroes", detect_zeroes.as_str());
        }
        if let Some(queues) = self.queues {
            tree.set_attr(driver_tag, "queues", queues.to_string());
        }

        driver_tag
    }
}

fn on_off(val: bool) -> &'static str {
    if val { "on" } else { "off" }
}

/// Builder for [`DriverOptions`].
#[derive(Debug, Clone)]
pub struct DriverOptionsBuilder {
    driver: Driver,
    driver_type: Option<DriverType>,
    cache: Option<DriverCache>,
    io: Option<DriverIo>,
    error_policy: Option<DriverErrorPolicy>,
    rerror_policy: Option<DriverErrorPolicy>,
    ioeventfd: Option<bool>,
    event_idx: Option<bool>,
    copy_on_read: Option<bool>,
    discard: Option<DriverDiscard>,
    detect_zeroes: Option<DriverDetectZeroes>,
    queues: Option<u32>,
}

impl DriverOptionsBuilder {
    pub fn driver_type(mut self, driver_type: DriverType) -> Self {
        self.driver_type = Some(driver_type);
        self
    }

    pub fn cache(mut self, cache: DriverCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn io(mut self, io: DriverIo) -> Self {
        self.io = Some(io);
        self
    }

    pub fn error_policy(mut self, policy: DriverErrorPolicy) -> Self {
        self.error_policy = Some(policy);
        self
    }

    pub fn rerror_policy(mut self, policy: DriverErrorPolicy) -> Self {
        self.rerror_policy = Some(policy);
        self
    }

    pub fn ioeventfd(mut self, ioeventfd: bool) -> Self {
        self.ioeventfd = Some(ioeventfd);
        self
    }

    pub fn event_idx(mut self, event_idx: bool) -> Self {
        self.event_idx = Some(event_idx);
        self
    }

    pub fn copy_on_read(mut self, copy_on_read: bool) -> Self {
        self.copy_on_read = Some(copy_on_read);
        self
    }

    pub fn discard(mut self, discard: DriverDiscard) -> Self {
        self.discard = Some(discard);
        self
    }

    pub fn detect_zeroes(mut self, detect_zeroes: DriverDetectZeroes) -> Self {
        self.detect_zeroes = Some(detect_zeroes);
        self
    }

    pub fn queues(mut self, queues: u32) -> Self {
        self.queues = Some(queues);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Read errors cannot be enospace, so `rerror_policy` rejects it.
    pub fn build(self) -> Result<DriverOptions> {
        if self.rerror_policy == Some(DriverErrorPolicy::Enospace) {
            return Err(Error::InvalidValue {
                field: "rerror_policy",
                reason: "enospace is not valid for read errors".to_owned(),
            });
        }
        Ok(DriverOptions {
            driver: self.driver,
            driver_type: self.driver_type,
            cache: self.cache,
            io: self.io,
            error_policy: self.error_policy,
            rerror_policy: self.rerror_policy,
            ioeventfd: self.ioeventfd,
            event_idx: self.event_idx,
            copy_on_read: self.copy_on_read,
            discard: self.discard,
            detect_zeroes: self.detect_zeroes,
            queues: self.queues,
        })
    }
}

/// Validated `<iotune>` limits. QEMU only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoTune {
    fields: IoTuneFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct IoTuneFields {
    total_bytes_sec: Option<u64>,
    read_bytes_sec: Option<u64>,
    write_bytes_sec: Option<u64>,
    total_bytes_sec_max: Option<u64>,
    read_bytes_sec_max: Option<u64>,
    write_bytes_sec_max: Option<u64>,
    total_iops_sec: Option<u64>,
    read_iops_sec: Option<u64>,
    write_iops_sec: Option<u64>,
    total_iops_sec_max: Option<u64>,
    read_iops_sec_max: Option<u64>,
    write_iops_sec_max: Option<u64>,
    total_bytes_sec_max_length: Option<u64>,
    read_bytes_sec_max_length: Option<u64>,
    write_bytes_sec_max_length: Option<u64>,
    total_iops_sec_max_length: Option<u64>,
    read_iops_sec_max_length: Option<u64>,
    write_iops_sec_max_length: Option<u64>,
    size_iops_sec: Option<u64>,
    group_name: Option<String>,
}

impl IoTune {
    pub fn builder() -> IoTuneBuilder {
        IoTuneBuilder {
            fields: IoTuneFields::default(),
        }
    }

    fn has_any(&self) -> bool {
        let f = &self.fields;
        f.total_bytes_sec.is_some()
            || f.read_bytes_sec.is_some()
            || f.write_bytes_sec.is_some()
            || f.total_bytes_sec_max.is_some()
            || f.read_bytes_sec_max.is_some()
            || f.write_bytes_sec_max.is_some()
            || f.total_iops_sec.is_some()
            || f.read_iops_sec.is_some()
            || f.write_iops_sec.is_some()
            || f.total_iops_sec_max.is_some()
            || f.read_iops_sec_max.is_some()
            || f.write_iops_sec_max.is_some()
            || f.total_bytes_sec_max_length.is_some()
            || f.read_bytes_sec_max_length.is_some()
            || f.write_bytes_sec_max_length.is_some()
            || f.total_iops_sec_max_length.is_some()
            || f.read_iops_sec_max_length.is_some()
            || f.write_iops_sec_max_length.is_some()
            || f.size_iops_sec.is_some()
            || f.group_name.is_some()
    }

    fn attach_xml(&self, tree: &mut XmlTree, disk_tag: NodeId) {
        let iotune_tag = tree.append_element(disk_tag, "iotune");
        let f = &self.fields;

        let numeric = [
            ("total_bytes_sec", f.total_bytes_sec),
            ("read_bytes_sec", f.read_bytes_sec),
            ("write_bytes_sec", f.write_bytes_sec),
            ("total_bytes_sec_max", f.total_bytes_sec_max),
            ("read_bytes_sec_max", f.read_bytes_sec_max),
            ("write_bytes_sec_max", f.write_bytes_sec_max),
            ("total_iops_sec", f.total_iops_sec),
            ("read_iops_sec", f.read_iops_sec),
            ("write_iops_sec", f.write_iops_sec),
            ("total_iops_sec_max", f.total_iops_sec_max),
            ("read_iops_sec_max", f.read_iops_sec_max),
            ("write_iops_sec_max", f.write_iops_sec_max),
            ("total_bytes_sec_max_length", f.total_bytes_sec_max_length),
            ("read_bytes_sec_max_length", f.read_bytes_sec_max_length),
            ("write_bytes_sec_max_length", f.write_bytes_sec_max_length),
            ("total_iops_sec_max_length", f.total_iops_sec_max_length),
            ("read_iops_sec_max_length", f.read_iops_sec_max_length),
            ("write_iops_sec_max_length", f.write_iops_sec_max_length),
            ("size_iops_sec", f.size_iops_sec),
        ];
        for (name, value) in numeric {
            if let Some(value) = value {
                let tag = tree.append_element(iotune_tag, name);
                tree.set_text(tag, value.to_string());
            }
        }
        if let Some(group_name) = &f.group_name {
            let tag = tree.append_element(iotune_tag, "group_name");
            tree.set_text(tag, group_name);
        }
    }
}

/// Builder for [`IoTune`].
#[derive(Debug, Clone, Default)]
pub struct IoTuneBuilder {
    fields: IoTuneFields,
}

macro_rules! iotune_setter {
    ($($name:ident),* $(,)?) => {
        $(pub fn $name(mut self, value: u64) -> Self {
            self.fields.$name = Some(value);
            self
        })*
    };
}

impl IoTuneBuilder {
    iotune_setter!(
        total_bytes_sec,
        read_bytes_sec,
        write_bytes_sec,
        total_bytes_sec_max,
        read_bytes_sec_max,
        write_bytes_sec_max,
        total_iops_sec,
        read_iops_sec,
        write_iops_sec,
        total_iops_sec_max,
        read_iops_sec_max,
        write_iops_sec_max,
        total_bytes_sec_max_length,
        read_bytes_sec_max_length,
        write_bytes_sec_max_length,
        total_iops_sec_max_length,
        read_iops_sec_max_length,
        write_iops_sec_max_length,
        size_iops_sec,
    );

    pub fn group_name(mut self, group_name: impl Into<String>) -> Self {
        self.fields.group_name = Some(group_name.into());
        self
    }

    /// Validate the field combination and build.
    ///
    /// # Errors
    ///
    /// [`Error::MutuallyExclusive`] when more than one of a
    /// total/read/write group is set; [`Error::RequiresField`] when a
    /// `*_max_length` is set without its `*_max`.
    pub fn build(self) -> Result<IoTune> {
        let f = &self.fields;

        only_one(&[
            ("total_bytes_sec", f.total_bytes_sec.is_some()),
            ("read_bytes_sec", f.read_bytes_sec.is_some()),
            ("write_bytes_sec", f.write_bytes_sec.is_some()),
        ])?;
        only_one(&[
            ("total_iops_sec", f.total_iops_sec.is_some()),
            ("read_iops_sec", f.read_iops_sec.is_some()),
            ("write_iops_sec", f.write_iops_sec.is_some()),
        ])?;
        only_one(&[
            ("total_bytes_sec_max", f.total_bytes_sec_max.is_some()),
            ("read_bytes_sec_max", f.read_bytes_sec_max.is_some()),
            ("write_bytes_sec_max", f.write_bytes_sec_max.is_some()),
        ])?;
        only_one(&[
            ("total_iops_sec_max", f.total_iops_sec_max.is_some()),
            ("read_iops_sec_max", f.read_iops_sec_max.is_some()),
            ("write_iops_sec_max", f.write_iops_sec_max.is_some()),
        ])?;

        requires(
            ("total_bytes_sec_max_length", f.total_bytes_sec_max_length.is_some()),
            ("total_bytes_sec_max", f.total_bytes_sec_max.is_some()),
        )?;
        requires(
            ("read_bytes_sec_max_length", f.read_bytes_sec_max_length.is_some()),
            ("read_bytes_sec_max", f.read_bytes_sec_max.is_some()),
        )?;
        requires(
            ("write_bytes_sec_max_length", f.write_bytes_sec_max_length.is_some()),
            ("write_bytes_sec_max", f.write_bytes_sec_max.is_some()),
        )?;
        requires(
            ("total_iops_sec_max_length", f.total_iops_sec_max_length.is_some()),
            ("total_iops_sec_max", f.total_iops_sec_max.is_some()),
        )?;
        requires(
            ("read_iops_sec_max_length", f.read_iops_sec_max_length.is_some()),
            ("read_iops_sec_max", f.read_iops_sec_max.is_some()),
        )?;
        requires(
            ("write_iops_sec_max_length", f.write_iops_sec_max_length.is_some()),
            ("write_iops_sec_max", f.write_iops_sec_max.is_some()),
        )?;

        Ok(IoTune {
            fields: self.fields,
        })
    }
}

fn only_one(fields: &[(&'static str, bool)]) -> Result<()> {
    if fields.iter().filter(|(_, set)| *set).count() > 1 {
        return Err(Error::MutuallyExclusive {
            fields: fields.iter().map(|(name, _)| *name).collect(),
        });
    }
    Ok(())
}

fn requires(dependent: (&'static str, bool), required: (&'static str, bool)) -> Result<()> {
    if dependent.1 && !required.1 {
        return Err(Error::RequiresField {
            dependent: dependent.0,
            requires: required.0,
        });
    }
    Ok(())
}

/// An HTTP(S) disk source. The URL is parsed and validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetHttpSource {
    protocol: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    cookies: Vec<(String, String)>,
    readahead: u64,
    timeout_secs: u64,
    ssl_verify: Option<bool>,
}

impl NetHttpSource {
    /// Parse an http/https URL into its source parts.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidValue`] for unparseable URLs, non-http schemes, or a
    /// missing host.
    pub fn new(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidValue {
            field: "url",
            reason: e.to_string(),
        })?;

        let protocol = parsed.scheme().to_owned();
        if protocol != "http" && protocol != "https" {
            return Err(Error::InvalidValue {
                field: "url",
                reason: format!("invalid URL scheme '{protocol}'"),
            });
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidValue {
                field: "url",
                reason: "URL has no host".to_owned(),
            })?
            .to_owned();

        // The url crate normalizes a missing path to "/"; a bare host emits
        // an empty name.
        let path = match parsed.path() {
            "/" => String::new(),
            p => p.strip_prefix('/').unwrap_or(p).to_owned(),
        };

        Ok(Self {
            protocol,
            host,
            port: parsed.port(),
            path,
            query: parsed.query().map(str::to_owned),
            cookies: Vec::new(),
            readahead: 0,
            timeout_secs: 0,
            ssl_verify: None,
        })
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn readahead(mut self, bytes: u64) -> Self {
        self.readahead = bytes;
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    pub fn ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = Some(verify);
        self
    }

    fn attach_xml(&self, tree: &mut XmlTree, disk_tag: NodeId) {
        let source_tag = tree.append_element(disk_tag, "source");
        tree.set_attr(source_tag, "protocol", &self.protocol);
        tree.set_attr(source_tag, "name", &self.path);

        let host_tag = tree.append_element(source_tag, "host");
        tree.set_attr(host_tag, "name", &self.host);
        if let Some(port) = self.port {
            tree.set_attr(host_tag, "port", port.to_string());
        }
        if let Some(query) = &self.query {
            tree.set_attr(host_tag, "query", query);
        }

        if !self.cookies.is_empty() {
            let cookies_tag = tree.append_element(source_tag, "cookies");
            for (name, value) in &self.cookies {
                let cookie_tag = tree.append_element(cookies_tag, "cookie");
                tree.set_attr(cookie_tag, "name", name);
                tree.set_text(cookie_tag, value);
            }
        }

        if self.readahead > 0 {
            let tag = tree.append_element(source_tag, "readahead");
            tree.set_attr(tag, "size", self.readahead.to_string());
        }

        if self.timeout_secs > 0 {
            let tag = tree.append_element(source_tag, "timeout");
            tree.set_attr(tag, "seconds", self.timeout_secs.to_string());
        }

        if let Some(verify) = self.ssl_verify {
            if self.protocol == "https" {
                let tag = tree.append_element(source_tag, "ssl");
                tree.set_attr(tag, "verify", bool_to_str(verify));
            }
        }
    }
}

/// Where the disk's bytes come from. Determines `disk/@type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskSource {
    /// A host block device path.
    BlockPath { dev: String },
    /// An HTTP(S) remote image.
    NetHttp(NetHttpSource),
    /// A volume inside a storage pool.
    Volume {
        pool: String,
        volume: String,
        mode: Option<SourceVolumeMode>,
    },
}

impl DiskSource {
    pub fn block_path(dev: impl Into<String>) -> Self {
        DiskSource::BlockPath { dev: dev.into() }
    }

    pub fn volume(pool: impl Into<String>, volume: impl Into<String>) -> Self {
        DiskSource::Volume {
            pool: pool.into(),
            volume: volume.into(),
            mode: None,
        }
    }

    fn disk_type(&self) -> &'static str {
        match self {
            DiskSource::BlockPath { .. } => "block",
            DiskSource::NetHttp(_) => "network",
            DiskSource::Volume { .. } => "volume",
        }
    }

    fn attach_xml(&self, tree: &mut XmlTree, disk_tag: NodeId) {
        match self {
            DiskSource::BlockPath { dev } => {
                let source_tag = tree.append_element(disk_tag, "source");
                tree.set_attr(source_tag, "dev", dev);
            }
            DiskSource::NetHttp(source) => source.attach_xml(tree, disk_tag),
            DiskSource::Volume { pool, volume, mode } => {
                let source_tag = tree.append_element(disk_tag, "source");
                tree.set_attr(source_tag, "pool", pool);
                tree.set_attr(source_tag, "volume", volume);
                if let Some(mode) = mode {
                    tree.set_attr(source_tag, "mode", mode.as_str());
                }
            }
        }
    }
}

/// Validated `<target>` description: device path, bus, tray, removability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskTarget {
    attachment: DeviceAttachment,
    dev: String,
    bus: Option<TargetBus>,
    tray: Option<Tray>,
    removable: Option<bool>,
}

impl DiskTarget {
    /// Build a target, validating the attachment/bus/tray combination.
    ///
    /// # Errors
    ///
    /// `tray` is only valid for cdrom and floppy attachments; `removable`
    /// only for USB-bus devices.
    pub fn new(
        attachment: DeviceAttachment,
        dev: impl Into<String>,
        bus: Option<TargetBus>,
        tray: Option<Tray>,
        removable: Option<bool>,
    ) -> Result<Self> {
        if tray.is_some()
            && !matches!(
                attachment,
                DeviceAttachment::Cdrom | DeviceAttachment::Floppy
            )
        {
            return Err(Error::InvalidValue {
                field: "tray",
                reason: "only valid for cdrom and floppy devices".to_owned(),
            });
        }
        if removable.is_some() && bus != Some(TargetBus::Usb) {
            return Err(Error::InvalidValue {
                field: "removable",
                reason: "only USB devices may be removable".to_owned(),
            });
        }

        Ok(Self {
            attachment,
            dev: dev.into(),
            bus,
            tray,
            removable,
        })
    }

    /// A plain disk target.
    pub fn disk(dev: impl Into<String>, bus: Option<TargetBus>) -> Self {
        Self {
            attachment: DeviceAttachment::Disk,
            dev: dev.into(),
            bus,
            tray: None,
            removable: None,
        }
    }

    /// A cdrom target.
    pub fn cdrom(dev: impl Into<String>, bus: Option<TargetBus>) -> Self {
        Self {
            attachment: DeviceAttachment::Cdrom,
            dev: dev.into(),
            bus,
            tray: None,
            removable: None,
        }
    }

    /// A floppy target.
    pub fn floppy(dev: impl Into<String>) -> Self {
        Self {
            attachment: DeviceAttachment::Floppy,
            dev: dev.into(),
            bus: None,
            tray: None,
            removable: None,
        }
    }

    /// The target device path (`vda`, `sr0`, ...).
    pub fn dev(&self) -> &str {
        &self.dev
    }
}

/// A disk device.
#[derive(Debug, Clone)]
pub struct Disk {
    source: DiskSource,
    target: DiskTarget,
    driver: DriverOptions,
    readonly: bool,
    iotune: Option<IoTune>,
}

impl Disk {
    pub fn new(source: DiskSource, target: DiskTarget, driver: DriverOptions) -> Self {
        Self {
            source,
            target,
            driver,
            readonly: false,
            iotune: None,
        }
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn iotune(mut self, iotune: IoTune) -> Self {
        self.iotune = Some(iotune);
        self
    }
}

impl Element for Disk {
    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        // Value-level conflict check across the whole tree, before any node
        // is created, so a failed attach contributes nothing.
        let root = tree.root();
        if let Some(devices) = tree.find_child(root, "devices") {
            for disk_tag in tree.children_named(devices, "disk") {
                let occupied = tree
                    .find_child(disk_tag, "target")
                    .and_then(|t| tree.get(t).get_attr("dev"))
                    .is_some_and(|dev| dev == self.target.dev);
                if occupied {
                    return Err(Error::TargetConflict {
                        dev: self.target.dev.clone(),
                    });
                }
            }
        }

        let devices = devices_tag(tree);
        let disk_tag = tree.append_element(devices, "disk");
        tree.set_attr(disk_tag, "type", self.source.disk_type());
        tree.set_attr(disk_tag, "device", self.target.attachment.as_str());

        self.driver.attach_xml(tree, disk_tag);
        self.source.attach_xml(tree, disk_tag);

        let target_tag = tree.append_element(disk_tag, "target");
        tree.set_attr(target_tag, "dev", &self.target.dev);
        if let Some(bus) = self.target.bus {
            tree.set_attr(target_tag, "bus", bus.as_str());
        }
        if let Some(tray) = self.target.tray {
            tree.set_attr(target_tag, "tray", tray.as_str());
        }
        if let Some(removable) = self.target.removable {
            tree.set_attr(target_tag, "removable", bool_to_str(removable));
        }

        if let Some(iotune) = &self.iotune {
            if iotune.has_any() {
                iotune.attach_xml(tree, disk_tag);
            }
        }

        if self.readonly {
            tree.append_element(disk_tag, "readonly");
        }

        Ok(vec![disk_tag])
    }

    fn detach_xml(&self, tree: &mut XmlTree, nodes: &[NodeId]) {
        detach_device_nodes(tree, nodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rerror_policy_rejects_enospace() {
        let err = DriverOptions::builder(Driver::Qemu)
            .rerror_policy(DriverErrorPolicy::Enospace)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidValue {
                field: "rerror_policy",
                ..
            }
        ));
    }

    #[test]
    fn test_tray_only_for_removable_media() {
        let err = DiskTarget::new(
            DeviceAttachment::Disk,
            "vda",
            Some(TargetBus::Virtio),
            Some(Tray::Open),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "tray", .. }));

        assert!(
            DiskTarget::new(
                DeviceAttachment::Cdrom,
                "sr0",
                Some(TargetBus::Sata),
                Some(Tray::Open),
                None,
            )
            .is_ok()
        );
    }

    #[test]
    fn test_removable_only_for_usb() {
        let err = DiskTarget::new(
            DeviceAttachment::Disk,
            "vda",
            Some(TargetBus::Virtio),
            None,
            Some(true),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidValue {
                field: "removable",
                ..
            }
        ));
    }

    #[test]
    fn test_net_http_source_parses_url() {
        let source = NetHttpSource::new("https://mirror.example.com:8443/images/disk.raw?ver=2")
            .unwrap();
        assert_eq!(source.protocol, "https");
        assert_eq!(source.host, "mirror.example.com");
        assert_eq!(source.port, Some(8443));
        assert_eq!(source.path, "images/disk.raw");
        assert_eq!(source.query.as_deref(), Some("ver=2"));
    }

    #[test]
    fn test_net_http_source_bare_host_emits_empty_name() {
        let source = NetHttpSource::new("http://mirror.example.com").unwrap();
        assert_eq!(source.path, "");

        let mut tree = XmlTree::new("disk");
        let root = tree.root();
        source.attach_xml(&mut tree, root);
        let source_tag = tree.find_child(root, "source").unwrap();
        assert_eq!(tree.get(source_tag).get_attr("name"), Some(""));
    }

    #[test]
    fn test_net_http_source_rejects_other_schemes() {
        let err = NetHttpSource::new("ftp://mirror.example.com/disk.raw").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "url", .. }));
    }

    #[test]
    fn test_iotune_mutual_exclusion() {
        let err = IoTune::builder()
            .total_bytes_sec(1_000_000)
            .read_bytes_sec(500_000)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MutuallyExclusive { .. }));
    }

    #[test]
    fn test_iotune_max_length_requires_max() {
        let err = IoTune::builder()
            .read_bytes_sec_max_length(60)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RequiresField {
                dependent: "read_bytes_sec_max_length",
                requires: "read_bytes_sec_max",
            }
        ));

        assert!(
            IoTune::builder()
                .read_bytes_sec_max(2_000_000)
                .read_bytes_sec_max_length(60)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_iotune_independent_groups_coexist() {
        let iotune = IoTune::builder()
            .total_bytes_sec(1_000_000)
            .total_iops_sec(500)
            .total_bytes_sec_max(2_000_000)
            .build();
        assert!(iotune.is_ok());
    }
}
