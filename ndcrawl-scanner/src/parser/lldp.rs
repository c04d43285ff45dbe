use super::{IgnoreFilter, RecordBuilder, apply_os_detection, apply_platform};
use crate::model::{Device, DeviceOs, NeighborRecord, UNKNOWN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

static CHASSIS_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Chassis\sid:\s*([A-Za-z0-9.\-_]+)").unwrap());
static SYSTEM_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^System\sName:\s*([A-Za-z0-9.\-_]+)(.*)$").unwrap());
static LOCAL_PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Local\sPort\sid:\s([A-Za-z0-9.\-_/]+)$").unwrap());
static REMOTE_PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Port\sid:\s([A-Za-z0-9.\-_/]+)$").unwrap());
static IP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+IP:\s(\d+\.\d+\.\d+\.\d+)").unwrap());
static MGMT_ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Management\sAddress:\s(\d+\.\d+\.\d+\.\d+)").unwrap());
static DESCRIPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Port\sDescription:\s(.*)").unwrap());
static SUMMARY_INTERFACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+\d+/\d+").unwrap());

/// Characters of each summary row skipped before tokenizing (the Device ID
/// column on IOS).
const SUMMARY_COLUMN_SKIP: usize = 20;

/// How `show lldp neighbor` summary rows are mapped to local interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LldpSummaryMode {
    /// Skip the first 20 characters and pick tokens by position. Breaks when
    /// column widths differ from the IOS default.
    #[default]
    Positional,
    /// Read rows by the column offsets of the `Local Intf` and `Port ID`
    /// headers.
    Strict,
}

/// Remote identifier (port id or device name) to local interface name.
pub type LocalInterfaceMap = HashMap<String, String>;

pub fn build_local_interface_map<S: AsRef<str>>(
    summary: &[S],
    mode: LldpSummaryMode,
) -> LocalInterfaceMap {
    match mode {
        LldpSummaryMode::Positional => positional_interface_map(summary),
        LldpSummaryMode::Strict => strict_interface_map(summary),
    }
}

fn positional_interface_map<S: AsRef<str>>(summary: &[S]) -> LocalInterfaceMap {
    let mut map = LocalInterfaceMap::new();
    for line in summary {
        let rest: String = line.as_ref().chars().skip(SUMMARY_COLUMN_SKIP).collect();
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        if tokens.len() < 3 || !SUMMARY_INTERFACE_RE.is_match(tokens[0]) {
            continue;
        }
        let key = if tokens.len() > 3 { tokens[3] } else { tokens[2] };
        map.insert(key.to_string(), tokens[0].to_string());
    }
    map
}

fn strict_interface_map<S: AsRef<str>>(summary: &[S]) -> LocalInterfaceMap {
    let mut map = LocalInterfaceMap::new();
    let mut columns: Option<(usize, usize)> = None;
    // NX-OS wraps long device ids onto their own line
    let mut pending_device: Option<String> = None;

    for line in summary {
        let line = line.as_ref().trim_end();

        let Some((local_col, port_col)) = columns else {
            if let (Some(local_col), Some(port_col)) = (line.find("Local Intf"), line.find("Port ID"))
            {
                columns = Some((local_col, port_col));
            }
            continue;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("Total entries") {
            break;
        }
        if !line.starts_with(char::is_whitespace) && trimmed.split_whitespace().count() == 1 {
            pending_device = Some(trimmed.to_string());
            continue;
        }

        let device_part = line.get(..local_col.min(line.len())).unwrap_or("").trim();
        let local = line
            .get(local_col..)
            .and_then(|rest| rest.split_whitespace().next());
        let port = line.get(port_col..).map(str::trim).filter(|p| !p.is_empty());

        if let (Some(local), Some(port)) = (local, port)
            && SUMMARY_INTERFACE_RE.is_match(local)
        {
            let device = if device_part.is_empty() {
                pending_device.take()
            } else {
                pending_device = None;
                Some(device_part.to_string())
            };
            map.insert(port.to_string(), local.to_string());
            if let Some(device) = device {
                map.insert(device, local.to_string());
            }
        }
    }
    map
}

/// Parse `show lldp neighbor detail` output collected from `device`, using
/// the `show lldp neighbor` summary to fill in local interfaces that IOS
/// leaves out of the detail view.
pub fn parse_lldp<S: AsRef<str>, T: AsRef<str>>(
    detail: &[S],
    summary: &[T],
    device: &Device,
    ignore: &IgnoreFilter,
    mode: LldpSummaryMode,
) -> Vec<NeighborRecord> {
    let local_map = build_local_interface_map(summary, mode);
    let mut builder = RecordBuilder::new(&device.id, ignore);

    for line in detail {
        let line = line.as_ref().trim_end();

        if let Some(caps) = CHASSIS_ID_RE.captures(line) {
            builder.open(&caps[1]);
        }

        let Some(record) = builder.current() else {
            continue;
        };

        if let Some(caps) = SYSTEM_NAME_RE.captures(line) {
            let advertised = !caps[1].contains("advertised") && !caps[2].contains("advertised");
            if advertised {
                record.remote_device_id = caps[1].to_string();
            }
        }
        if let Some(caps) = REMOTE_PORT_RE.captures(line) {
            record.remote_int = caps[1].to_string();
            if device.os == DeviceOs::CiscoIos && record.local_int == UNKNOWN {
                resolve_local_interface(record, &local_map);
            }
        }
        if let Some(caps) = LOCAL_PORT_RE.captures(line) {
            record.local_int = caps[1].to_string();
        }
        if let Some(caps) = IP_RE.captures(line) {
            record.ipv4 = caps[1].to_string();
        }
        if let Some(caps) = MGMT_ADDRESS_RE.captures(line) {
            record.ipv4 = caps[1].to_string();
        }
        apply_platform(line, record);
        if let Some(caps) = DESCRIPTION_RE.captures(line) {
            record.description = caps[1].trim().to_string();
        }
        apply_os_detection(line, record);
    }

    builder.finish()
}

fn resolve_local_interface(record: &mut NeighborRecord, local_map: &LocalInterfaceMap) {
    if let Some(local) = local_map.get(&record.remote_int) {
        debug!(
            "Mapping {} local interface {} to port id {}",
            record.local_device_id, local, record.remote_int
        );
        record.local_int = local.clone();
    } else if let Some(local) = local_map.get(&record.remote_device_id) {
        debug!(
            "Mapping {} local interface {} to device id {}",
            record.local_device_id, local, record.remote_device_id
        );
        record.local_int = local.clone();
    } else {
        info!(
            "No LLDP mapping for {} on {}",
            record.remote_int, record.local_device_id
        );
    }
}
