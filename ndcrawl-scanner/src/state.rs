use crate::model::{DISTANCE_UNKNOWN, Device, DeviceOs, NeighborRecord};
use crate::result::{CrawlResult, ScrapeOutcome, ScrapeStatus};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Mutable state of one crawl. Only the frontier controller touches it.
#[derive(Debug, Default)]
pub struct CrawlState {
    frontier: VecDeque<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    devices: BTreeMap<String, Device>,
    distances: BTreeMap<String, u32>,
    neighbors: Vec<NeighborRecord>,
    unreachable: Vec<String>,
    abandoned: Vec<String>,
    dispatched: usize,
}

/// Why a popped device was not dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    AlreadyVisited(String),
    BudgetExhausted(String),
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_seed(&mut self, id: &str, os: DeviceOs) {
        self.devices.insert(id.to_string(), Device::seed(id, os));
        self.distances.insert(id.to_string(), 0);
        self.enqueue(id);
    }

    pub fn has_pending(&self) -> bool {
        !self.frontier.is_empty()
    }

    pub fn is_visited(&self, id: &str) -> bool {
        self.visited.contains(id)
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn distance(&self, id: &str) -> Option<u32> {
        self.distances.get(id).copied()
    }

    /// Drain the whole frontier. Unvisited devices within the `max_crawl`
    /// budget are marked visited and returned for dispatch; the rest are
    /// reported as skipped and dropped.
    pub fn take_batch(&mut self, max_crawl: usize) -> (Vec<Device>, Vec<Skip>) {
        let mut batch = Vec::new();
        let mut skipped = Vec::new();

        while let Some(id) = self.frontier.pop_front() {
            self.queued.remove(&id);

            if self.visited.contains(&id) {
                debug!("Already visited {}", id);
                skipped.push(Skip::AlreadyVisited(id));
                continue;
            }
            if self.dispatched >= max_crawl {
                warn!("Max Devices allowed already crawled, dropping {}", id);
                skipped.push(Skip::BudgetExhausted(id));
                continue;
            }
            let Some(device) = self.devices.get(&id).cloned() else {
                warn!("No device entry for queued id {}", id);
                continue;
            };

            self.dispatched += 1;
            self.visited.insert(id);
            batch.push(device);
        }

        (batch, skipped)
    }

    pub fn mark_abandoned(&mut self, id: &str) {
        self.abandoned.push(id.to_string());
    }

    /// Fold one scrape result into the state.
    pub fn apply_outcome(&mut self, outcome: ScrapeOutcome) {
        let opened = outcome.session_opened();
        if let Some(device) = self.devices.get_mut(&outcome.device_id) {
            device.reachable = opened;
        }

        match outcome.status {
            ScrapeStatus::Neighbors(neighbors) => {
                for neighbor in neighbors {
                    self.apply_neighbor(neighbor);
                }
            }
            ScrapeStatus::Unreachable(_) => self.unreachable.push(outcome.device_id),
            ScrapeStatus::Failed(_) => {}
        }
    }

    /// Relax the local device's distance through this adjacency, record the
    /// adjacency, register the remote device and queue it when scrapeable.
    pub fn apply_neighbor(&mut self, mut neighbor: NeighborRecord) {
        let local = neighbor.local_device_id.clone();
        let remote = neighbor.remote_device_id.clone();

        let local_distance = self.relax(&local, &remote);
        neighbor.distance = local_distance;
        if let Some(device) = self.devices.get_mut(&local) {
            device.distance = local_distance;
        }

        info!("Processing neighbor {} on {}", remote, local);
        self.upsert_remote(&neighbor);

        let os = neighbor.os;
        self.neighbors.push(neighbor);

        if self.visited.contains(&remote) {
            debug!("Already visited {}", remote);
        } else if os.is_supported() {
            self.enqueue(&remote);
        } else {
            self.visited.insert(remote);
        }
    }

    fn relax(&mut self, local: &str, remote: &str) -> u32 {
        let remote_distance = self.distances.get(remote).copied();
        let current = self
            .distances
            .entry(local.to_string())
            .or_insert(DISTANCE_UNKNOWN);

        if let Some(remote_distance) = remote_distance {
            let candidate = remote_distance.saturating_add(1);
            if candidate < *current {
                *current = candidate;
                info!("Found new distances on {}: {}", local, candidate);
            }
        }
        *current
    }

    fn upsert_remote(&mut self, neighbor: &NeighborRecord) {
        let remote = &neighbor.remote_device_id;
        let previous = self
            .devices
            .get(remote)
            .map(|d| (d.is_stub(), d.reachable, d.distance));

        match previous {
            None => {
                let mut device = Device::from_neighbor(neighbor);
                device.distance = self
                    .distances
                    .get(remote)
                    .copied()
                    .unwrap_or(DISTANCE_UNKNOWN);
                self.devices.insert(remote.clone(), device);
            }
            Some((true, reachable, distance)) => {
                let mut device = Device::from_neighbor(neighbor);
                device.reachable = reachable;
                device.distance = distance;
                self.devices.insert(remote.clone(), device);
            }
            Some(_) => {}
        }
    }

    fn enqueue(&mut self, id: &str) {
        if self.visited.contains(id) || self.queued.contains(id) {
            return;
        }
        self.queued.insert(id.to_string());
        self.frontier.push_back(id.to_string());
    }

    pub fn into_result(self, iterations: usize) -> CrawlResult {
        let CrawlState {
            mut devices,
            distances,
            neighbors,
            unreachable,
            abandoned,
            dispatched,
            ..
        } = self;

        for (id, device) in devices.iter_mut() {
            device.distance = distances.get(id).copied().unwrap_or(DISTANCE_UNKNOWN);
        }

        CrawlResult {
            devices,
            neighbors,
            distances,
            iterations,
            dispatched,
            unreachable,
            abandoned,
        }
    }
}
