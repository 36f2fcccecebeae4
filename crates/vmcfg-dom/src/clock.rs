//! The `<clock>` element and its timers.
//!
//! Offset field combinations are validated together in [`Clock::new`],
//! based on the libvirt documentation:
//!
//! - `adjustment` is invalid with timezone offsets;
//! - with a variable offset, `adjustment` must be a second count, never the
//!   symbolic reset value;
//! - `basis` is only valid with a variable offset;
//! - `timezone` is required with a timezone offset and invalid otherwise.

use crate::element::Element;
use crate::error::{Error, Result};
use vmcfg_xml::{NodeId, XmlTree};

/// Clock offset mode, emitted as `clock/@offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Utc,
    Localtime,
    Timezone,
    Variable,
}

impl Offset {
    pub fn as_str(self) -> &'static str {
        match self {
            Offset::Utc => "utc",
            Offset::Localtime => "localtime",
            Offset::Timezone => "timezone",
            Offset::Variable => "variable",
        }
    }
}

/// Basis for variable-offset clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Utc,
    Localtime,
}

impl Basis {
    pub fn as_str(self) -> &'static str {
        match self {
            Basis::Utc => "utc",
            Basis::Localtime => "localtime",
        }
    }
}

/// Clock adjustment: a signed second count, or the symbolic reset value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Seconds(i64),
    Reset,
}

/// Tick policy for a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPolicy {
    Catchup,
    Delay,
    Merge,
    Discard,
}

impl TickPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            TickPolicy::Catchup => "catchup",
            TickPolicy::Delay => "delay",
            TickPolicy::Merge => "merge",
            TickPolicy::Discard => "discard",
        }
    }
}

/// Tracking source, RTC timers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcTrack {
    Boot,
    Guest,
    Wall,
    Realtime,
}

impl RtcTrack {
    pub fn as_str(self) -> &'static str {
        match self {
            RtcTrack::Boot => "boot",
            RtcTrack::Guest => "guest",
            RtcTrack::Wall => "wall",
            RtcTrack::Realtime => "realtime",
        }
    }
}

/// TSC mode, TSC timers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TscMode {
    Auto,
    Native,
    Emulate,
    Paravirt,
    Smpsafe,
}

impl TscMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TscMode::Auto => "auto",
            TscMode::Native => "native",
            TscMode::Emulate => "emulate",
            TscMode::Paravirt => "paravirt",
            TscMode::Smpsafe => "smpsafe",
        }
    }
}

/// Timer kind, with the kind-specific fields inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    Rtc { track: Option<RtcTrack> },
    Tsc { mode: Option<TscMode>, frequency: Option<u64> },
    Pit,
    Hpet,
    KvmClock,
    HyperVClock,
    ArmVTimer,
}

impl TimerKind {
    pub fn name(&self) -> &'static str {
        match self {
            TimerKind::Rtc { .. } => "rtc",
            TimerKind::Tsc { .. } => "tsc",
            TimerKind::Pit => "pit",
            TimerKind::Hpet => "hpet",
            TimerKind::KvmClock => "kvmclock",
            TimerKind::HyperVClock => "hypervclock",
            TimerKind::ArmVTimer => "armvtimer",
        }
    }
}

/// A `<timer>` definition inside a clock.
///
/// Catch-up tuning (`threshold`/`slew`/`limit`) is accepted regardless of
/// the tick policy but only emitted when the policy is catchup; with any
/// other policy it is intentionally suppressed, not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub present: bool,
    pub tickpolicy: Option<TickPolicy>,
    pub threshold: Option<u64>,
    pub slew: Option<u64>,
    pub limit: Option<u64>,
}

impl Timer {
    /// A present timer of the given kind with no tuning.
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            present: true,
            tickpolicy: None,
            threshold: None,
            slew: None,
            limit: None,
        }
    }

    /// A present timer with the given tick policy.
    pub fn with_tickpolicy(kind: TimerKind, tickpolicy: TickPolicy) -> Self {
        Self {
            tickpolicy: Some(tickpolicy),
            ..Self::new(kind)
        }
    }

    /// A timer explicitly marked absent (`present="no"`).
    pub fn absent(kind: TimerKind) -> Self {
        Self {
            present: false,
            ..Self::new(kind)
        }
    }

    fn attach_xml(&self, tree: &mut XmlTree, clock_tag: NodeId) {
        let timer_tag = tree.append_element(clock_tag, "timer");
        tree.set_attr(timer_tag, "name", self.kind.name());

        if !self.present {
            tree.set_attr(timer_tag, "present", "no");
            return;
        }

        if let Some(policy) = self.tickpolicy {
            tree.set_attr(timer_tag, "tickpolicy", policy.as_str());
        }

        if self.tickpolicy == Some(TickPolicy::Catchup)
            && (self.threshold.is_some() || self.slew.is_some() || self.limit.is_some())
        {
            let catchup_tag = tree.append_element(timer_tag, "catchup");
            if let Some(threshold) = self.threshold {
                tree.set_attr(catchup_tag, "threshold", threshold.to_string());
            }
            if let Some(slew) = self.slew {
                tree.set_attr(catchup_tag, "slew", slew.to_string());
            }
            if let Some(limit) = self.limit {
                tree.set_attr(catchup_tag, "limit", limit.to_string());
            }
        }

        match &self.kind {
            TimerKind::Rtc { track } => {
                if let Some(track) = track {
                    tree.set_attr(timer_tag, "track", track.as_str());
                }
            }
            TimerKind::Tsc { mode, frequency } => {
                if let Some(frequency) = frequency {
                    tree.set_attr(timer_tag, "frequency", frequency.to_string());
                }
                if let Some(mode) = mode {
                    tree.set_attr(timer_tag, "mode", mode.as_str());
                }
            }
            _ => {}
        }
    }
}

/// The `<clock>` element.
#[derive(Debug, Clone)]
pub struct Clock {
    offset: Option<Offset>,
    timezone: Option<String>,
    adjustment: Option<Adjustment>,
    basis: Option<Basis>,
    timers: Vec<Timer>,
}

fn default_timers() -> Vec<Timer> {
    vec![
        Timer::with_tickpolicy(TimerKind::Rtc { track: None }, TickPolicy::Catchup),
        Timer::with_tickpolicy(TimerKind::Pit, TickPolicy::Delay),
        Timer::absent(TimerKind::Hpet),
    ]
}

impl Clock {
    /// Build a clock, validating the offset field combination.
    ///
    /// When `timers` is `None`, the default set is used: rtc with catchup,
    /// pit with delay, hpet absent.
    ///
    /// # Errors
    ///
    /// [`Error::ClockConfig`] naming the offending field for any of the four
    /// offset rules described in the module docs.
    pub fn new(
        offset: Option<Offset>,
        timezone: Option<String>,
        adjustment: Option<Adjustment>,
        basis: Option<Basis>,
        timers: Option<Vec<Timer>>,
    ) -> Result<Self> {
        if adjustment.is_some() {
            match offset {
                Some(Offset::Timezone) => {
                    return Err(Error::ClockConfig {
                        field: "adjustment",
                        reason: "not valid with timezone offsets",
                    });
                }
                Some(Offset::Variable) if adjustment == Some(Adjustment::Reset) => {
                    return Err(Error::ClockConfig {
                        field: "adjustment",
                        reason: "must be an integer with variable offsets",
                    });
                }
                _ => {}
            }
        }

        if basis.is_some() && offset != Some(Offset::Variable) {
            return Err(Error::ClockConfig {
                field: "basis",
                reason: "only valid with variable offsets",
            });
        }

        if offset == Some(Offset::Timezone) && timezone.is_none() {
            return Err(Error::ClockConfig {
                field: "timezone",
                reason: "required with timezone offsets",
            });
        }
        if timezone.is_some() && offset != Some(Offset::Timezone) {
            return Err(Error::ClockConfig {
                field: "timezone",
                reason: "only valid with timezone offsets",
            });
        }

        Ok(Self {
            offset,
            timezone,
            adjustment,
            basis,
            timers: timers.unwrap_or_else(default_timers),
        })
    }
}

impl Default for Clock {
    /// The default timer set with no offset configuration.
    fn default() -> Self {
        Self {
            offset: None,
            timezone: None,
            adjustment: None,
            basis: None,
            timers: default_timers(),
        }
    }
}

impl Element for Clock {
    fn unique(&self) -> bool {
        true
    }

    fn attach_xml(&self, tree: &mut XmlTree) -> Result<Vec<NodeId>> {
        let clock_tag = tree.append_element(tree.root(), "clock");

        if let Some(offset) = self.offset {
            tree.set_attr(clock_tag, "offset", offset.as_str());

            match self.adjustment {
                Some(Adjustment::Seconds(seconds)) => {
                    tree.set_attr(clock_tag, "adjustment", seconds.to_string());
                }
                Some(Adjustment::Reset) => {
                    tree.set_attr(clock_tag, "adjustment", "reset");
                }
                None => {}
            }

            if let Some(timezone) = &self.timezone {
                tree.set_attr(clock_tag, "timezone", timezone);
            }

            if let Some(basis) = self.basis {
                tree.set_attr(clock_tag, "basis", basis.as_str());
            }
        }

        for timer in &self.timers {
            timer.attach_xml(tree, clock_tag);
        }

        Ok(vec![clock_tag])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_rejected_with_timezone_offset() {
        let err = Clock::new(
            Some(Offset::Timezone),
            Some("Europe/Paris".into()),
            Some(Adjustment::Seconds(10)),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ClockConfig {
                field: "adjustment",
                ..
            }
        ));
    }

    #[test]
    fn test_reset_adjustment_rejected_with_variable_offset() {
        let err = Clock::new(
            Some(Offset::Variable),
            None,
            Some(Adjustment::Reset),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ClockConfig {
                field: "adjustment",
                ..
            }
        ));
    }

    #[test]
    fn test_integer_adjustment_allowed_with_variable_offset() {
        let clock = Clock::new(
            Some(Offset::Variable),
            None,
            Some(Adjustment::Seconds(-3600)),
            Some(Basis::Utc),
            None,
        );
        assert!(clock.is_ok());
    }

    #[test]
    fn test_basis_requires_variable_offset() {
        let err = Clock::new(Some(Offset::Utc), None, None, Some(Basis::Utc), None).unwrap_err();
        assert!(matches!(err, Error::ClockConfig { field: "basis", .. }));
    }

    #[test]
    fn test_timezone_required_iff_timezone_offset() {
        let err = Clock::new(Some(Offset::Timezone), None, None, None, None).unwrap_err();
        assert!(matches!(
            err,
            Error::ClockConfig {
                field: "timezone",
                ..
            }
        ));

        let err =
            Clock::new(Some(Offset::Utc), Some("UTC".into()), None, None, None).unwrap_err();
        assert!(matches!(
            err,
            Error::ClockConfig {
                field: "timezone",
                ..
            }
        ));

        let clock = Clock::new(Some(Offset::Timezone), Some("UTC".into()), None, None, None);
        assert!(clock.is_ok());
    }

    #[test]
    fn test_catchup_tuning_suppressed_without_catchup_policy() {
        let mut timer = Timer::with_tickpolicy(TimerKind::Pit, TickPolicy::Delay);
        timer.threshold = Some(123);

        let mut tree = XmlTree::new("clock");
        let root = tree.root();
        timer.attach_xml(&mut tree, root);

        let timer_tag = tree.find_child(root, "timer").unwrap();
        assert!(tree.find_child(timer_tag, "catchup").is_none());
    }

    #[test]
    fn test_catchup_tuning_emitted_with_catchup_policy() {
        let mut timer =
            Timer::with_tickpolicy(TimerKind::Rtc { track: None }, TickPolicy::Catchup);
        timer.threshold = Some(123);
        timer.slew = Some(120);

        let mut tree = XmlTree::new("clock");
        let root = tree.root();
        timer.attach_xml(&mut tree, root);

        let timer_tag = tree.find_child(root, "timer").unwrap();
        let catchup = tree.find_child(timer_tag, "catchup").unwrap();
        assert_eq!(tree.get(catchup).get_attr("threshold"), Some("123"));
        assert_eq!(tree.get(catchup).get_attr("slew"), Some("120"));
        assert_eq!(tree.get(catchup).get_attr("limit"), None);
    }

    #[test]
    fn test_absent_timer_emits_only_present_attr() {
        let timer = Timer::absent(TimerKind::Hpet);
        let mut tree = XmlTree::new("clock");
        let root = tree.root();
        timer.attach_xml(&mut tree, root);

        let timer_tag = tree.find_child(root, "timer").unwrap();
        let node = tree.get(timer_tag);
        assert_eq!(node.get_attr("name"), Some("hpet"));
        assert_eq!(node.get_attr("present"), Some("no"));
        assert_eq!(node.get_attr("tickpolicy"), None);
    }
}
