//! Neighbor advertisement parsers.
//!
//! Both protocols share the same record life cycle: a record is opened by an
//! identity line (`Device ID:` for CDP, `Chassis id:` for LLDP), field lines
//! update whichever record is currently open, and the open record is flushed
//! when the next identity line arrives or the input ends. Field lines seen
//! before the first identity line are ignored.
//!
//! | state  | identity line            | field line     | end of input |
//! |--------|--------------------------|----------------|--------------|
//! | Idle   | open -> Open             | ignored        | -            |
//! | Open   | flush, open -> Open      | update record  | flush        |
//!
//! A flush appends the record unless its remote device id matches the
//! configured ignore pattern.

pub mod cdp;
pub mod lldp;

pub use cdp::parse_cdp;
pub use lldp::{LldpSummaryMode, parse_lldp};

use crate::error::{Result, ScanError};
use crate::model::{DeviceOs, NeighborRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

static PLATFORM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Platform:\s([A-Za-z0-9.\-_]+)\s*([A-Za-z0-9.\-_]*)").unwrap()
});

/// Remote device names matching this pattern are dropped from parser output.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    pattern: Option<Regex>,
}

impl IgnoreFilter {
    /// Compile the pattern. An empty pattern never matches.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self::default());
        }
        let regex = Regex::new(pattern)
            .map_err(|e| ScanError::Config(format!("invalid ignore_regex '{}': {}", pattern, e)))?;
        Ok(Self {
            pattern: Some(regex),
        })
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_ignored(&self, remote_device_id: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|re| re.is_match(remote_device_id))
    }
}

/// Open/flush state machine shared by the CDP and LLDP parsers.
pub(crate) struct RecordBuilder<'a> {
    local_device_id: &'a str,
    ignore: &'a IgnoreFilter,
    current: Option<NeighborRecord>,
    emitted: Vec<NeighborRecord>,
}

impl<'a> RecordBuilder<'a> {
    pub(crate) fn new(local_device_id: &'a str, ignore: &'a IgnoreFilter) -> Self {
        Self {
            local_device_id,
            ignore,
            current: None,
            emitted: Vec::new(),
        }
    }

    /// Flush any open record and start a new one for `remote_device_id`.
    pub(crate) fn open(&mut self, remote_device_id: &str) {
        self.flush(false);
        self.current = Some(NeighborRecord::new(self.local_device_id, remote_device_id));
    }

    /// The open record, if any. Field lines are no-ops while idle.
    pub(crate) fn current(&mut self) -> Option<&mut NeighborRecord> {
        self.current.as_mut()
    }

    pub(crate) fn finish(mut self) -> Vec<NeighborRecord> {
        self.flush(true);
        self.emitted
    }

    fn flush(&mut self, at_end: bool) {
        let Some(record) = self.current.take() else {
            return;
        };
        if self.ignore.is_ignored(&record.remote_device_id) {
            if at_end {
                warn!(
                    "Regex Ignore on {} neighbor from {}",
                    record.remote_device_id, record.local_device_id
                );
            } else {
                info!(
                    "Regex Ignore on {} neighbor from {}",
                    record.remote_device_id, record.local_device_id
                );
            }
            return;
        }
        self.emitted.push(record);
    }
}

/// `Platform: cisco WS-C3850-48P, ...` yields `WS-C3850-48P`; any other
/// vendor string is kept as-is.
pub(crate) fn apply_platform(line: &str, record: &mut NeighborRecord) {
    if let Some(caps) = PLATFORM_RE.captures(line) {
        let first = &caps[1];
        record.platform = if first == "cisco" {
            caps.get(2).map_or("", |m| m.as_str()).to_string()
        } else {
            first.to_string()
        };
    }
}

/// Software banners anywhere in a block reveal the remote OS; the IOS check
/// runs last so it wins when both appear on one line.
pub(crate) fn apply_os_detection(line: &str, record: &mut NeighborRecord) {
    if line.contains("Cisco Nexus") {
        record.os = DeviceOs::CiscoNxos;
    }
    if line.contains("Cisco IOS") {
        record.os = DeviceOs::CiscoIos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ignore_pattern_never_matches() {
        let filter = IgnoreFilter::new("").unwrap();
        assert!(!filter.is_ignored("anything"));
        assert!(!filter.is_ignored(""));
    }

    #[test]
    fn test_invalid_ignore_pattern_is_config_error() {
        let err = IgnoreFilter::new("(unclosed").unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_ignore_pattern_searches_anywhere() {
        let filter = IgnoreFilter::new("phone|SEP").unwrap();
        assert!(filter.is_ignored("SEP001122334455"));
        assert!(filter.is_ignored("lobby-phone-1"));
        assert!(!filter.is_ignored("sw1"));
    }

    #[test]
    fn test_builder_ignores_fields_while_idle() {
        let filter = IgnoreFilter::none();
        let mut builder = RecordBuilder::new("sw1", &filter);
        assert!(builder.current().is_none());
        builder.open("sw2");
        builder.current().unwrap().ipv4 = "10.0.0.2".to_string();
        builder.open("sw3");
        let records = builder.finish();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ipv4, "10.0.0.2");
        assert_eq!(records[1].remote_device_id, "sw3");
    }

    #[test]
    fn test_platform_strips_cisco_prefix() {
        let mut record = NeighborRecord::new("a", "b");
        apply_platform("Platform: cisco WS-C3850-48P,  Capabilities: Switch IGMP", &mut record);
        assert_eq!(record.platform, "WS-C3850-48P");

        apply_platform("Platform: N9K-C93180YC-EX, Capabilities: Router Switch", &mut record);
        assert_eq!(record.platform, "N9K-C93180YC-EX");
    }
}
