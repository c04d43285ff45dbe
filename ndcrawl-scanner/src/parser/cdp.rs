use super::{IgnoreFilter, RecordBuilder, apply_os_detection, apply_platform};
use crate::model::{Device, NeighborRecord};
use once_cell::sync::Lazy;
use regex::Regex;

static DEVICE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Device\sID:\s*([A-Za-z0-9.\-_]+)").unwrap());
static INTERFACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Interface:\s([A-Za-z0-9.\-_/]+).*:\s([A-Za-z0-9.\-_/]+)$").unwrap()
});
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+IPv4\sAddress:\s(\d+\.\d+\.\d+\.\d+)").unwrap());
static IP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+IP\saddress:\s(\d+\.\d+\.\d+\.\d+)").unwrap());

/// Parse `show cdp neighbor detail` output collected from `device`.
pub fn parse_cdp<S: AsRef<str>>(
    lines: &[S],
    device: &Device,
    ignore: &IgnoreFilter,
) -> Vec<NeighborRecord> {
    let mut builder = RecordBuilder::new(&device.id, ignore);

    for line in lines {
        let line = line.as_ref().trim_end();

        if let Some(caps) = DEVICE_ID_RE.captures(line) {
            builder.open(&caps[1]);
        }

        let Some(record) = builder.current() else {
            continue;
        };

        if let Some(caps) = INTERFACE_RE.captures(line) {
            record.local_int = caps[1].to_string();
            record.remote_int = caps[2].to_string();
        }
        if let Some(caps) = IPV4_RE.captures(line) {
            record.ipv4 = caps[1].to_string();
        }
        if let Some(caps) = IP_RE.captures(line) {
            record.ipv4 = caps[1].to_string();
        }
        apply_platform(line, record);
        apply_os_detection(line, record);
    }

    builder.finish()
}
