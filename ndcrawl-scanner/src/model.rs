use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder for any field a neighbor advertisement did not carry.
pub const UNKNOWN: &str = "Unknown";

/// Distance assigned to devices that have not been relaxed yet.
pub const DISTANCE_UNKNOWN: u32 = 100;

/// Operating systems the crawler knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOs {
    CiscoIos,
    CiscoNxos,
    #[default]
    Unknown,
}

impl DeviceOs {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceOs::CiscoIos => "cisco_ios",
            DeviceOs::CiscoNxos => "cisco_nxos",
            DeviceOs::Unknown => "unknown",
        }
    }

    /// Only IOS and NX-OS devices are logged into; everything else is a leaf.
    pub fn is_supported(&self) -> bool {
        matches!(self, DeviceOs::CiscoIos | DeviceOs::CiscoNxos)
    }
}

impl fmt::Display for DeviceOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceOs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cisco_ios" | "ios" => Ok(DeviceOs::CiscoIos),
            "cisco_nxos" | "nxos" => Ok(DeviceOs::CiscoNxos),
            "unknown" => Ok(DeviceOs::Unknown),
            other => Err(format!(
                "unsupported OS '{}' (expected cisco_ios or cisco_nxos)",
                other
            )),
        }
    }
}

/// A network element known to the crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub ipv4: String,
    pub os: DeviceOs,
    pub platform: String,
    pub reachable: bool,
    pub distance: u32,
}

impl Device {
    /// Seeds are addressed by their own name and assumed reachable until a
    /// scrape says otherwise.
    pub fn seed(id: &str, os: DeviceOs) -> Self {
        Self {
            id: id.to_string(),
            ipv4: id.to_string(),
            os,
            platform: UNKNOWN.to_string(),
            reachable: true,
            distance: 0,
        }
    }

    /// A device discovered as the remote end of an adjacency.
    pub fn from_neighbor(neighbor: &NeighborRecord) -> Self {
        Self {
            id: neighbor.remote_device_id.clone(),
            ipv4: neighbor.ipv4.clone(),
            os: neighbor.os,
            platform: neighbor.platform.clone(),
            reachable: false,
            distance: DISTANCE_UNKNOWN,
        }
    }

    pub fn has_known_ipv4(&self) -> bool {
        !self.ipv4.is_empty() && self.ipv4 != UNKNOWN
    }

    pub fn is_stub(&self) -> bool {
        self.platform == UNKNOWN
    }
}

/// Identity of an adjacency for merge and deduplication.
pub type NeighborKey = (String, String, String, String);

/// One observed adjacency, from one protocol source, for one local device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub local_device_id: String,
    pub remote_device_id: String,
    pub local_int: String,
    pub remote_int: String,
    pub ipv4: String,
    pub os: DeviceOs,
    pub platform: String,
    pub description: String,
    pub distance: u32,
}

impl NeighborRecord {
    pub fn new(local_device_id: &str, remote_device_id: &str) -> Self {
        Self {
            local_device_id: local_device_id.to_string(),
            remote_device_id: remote_device_id.to_string(),
            local_int: UNKNOWN.to_string(),
            remote_int: UNKNOWN.to_string(),
            ipv4: UNKNOWN.to_string(),
            os: DeviceOs::Unknown,
            platform: UNKNOWN.to_string(),
            description: String::new(),
            distance: DISTANCE_UNKNOWN,
        }
    }

    pub fn key(&self) -> NeighborKey {
        (
            self.local_device_id.clone(),
            self.remote_device_id.clone(),
            self.local_int.clone(),
            self.remote_int.clone(),
        )
    }
}
