use crate::model::{DISTANCE_UNKNOWN, Device, NeighborRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// What a single scrape produced.
#[derive(Debug, Clone)]
pub enum ScrapeStatus {
    /// A session was opened; the merged neighbor list (possibly empty).
    Neighbors(Vec<NeighborRecord>),
    /// No session could be opened by name or by address.
    Unreachable(String),
    /// A session was opened but commands or parsing failed.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub device_id: String,
    pub status: ScrapeStatus,
    pub elapsed: Duration,
}

impl ScrapeOutcome {
    pub fn new(device_id: String, status: ScrapeStatus, elapsed: Duration) -> Self {
        Self {
            device_id,
            status,
            elapsed,
        }
    }

    /// Whether a session to the device was ever opened.
    pub fn session_opened(&self) -> bool {
        !matches!(self.status, ScrapeStatus::Unreachable(_))
    }
}

/// Final state of a crawl, handed to the exporters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    pub devices: BTreeMap<String, Device>,
    pub neighbors: Vec<NeighborRecord>,
    pub distances: BTreeMap<String, u32>,
    pub iterations: usize,
    pub dispatched: usize,
    pub unreachable: Vec<String>,
    pub abandoned: Vec<String>,
}

impl CrawlResult {
    /// Relaxed distance of a device, or the sentinel when it never relaxed.
    pub fn distance_of(&self, device_id: &str) -> u32 {
        self.distances
            .get(device_id)
            .copied()
            .unwrap_or(DISTANCE_UNKNOWN)
    }

    pub fn reachable_count(&self) -> usize {
        self.devices.values().filter(|d| d.reachable).count()
    }
}
