use crate::error::{Result, ScanError};
use crate::model::{Device, DeviceOs};
use crate::parser::{IgnoreFilter, LldpSummaryMode};
use crate::result::{CrawlResult, ScrapeOutcome, ScrapeStatus};
use crate::scrape::scrape_device;
use crate::session::SessionConnector;
use crate::state::{CrawlState, Skip};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Progress notifications emitted by the frontier controller.
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    IterationStarted { iteration: usize, queued: usize },
    Dispatched { iteration: usize, device_id: String },
    Completed { device_id: String, neighbors: usize },
    Unreachable { device_id: String },
    Failed { device_id: String, reason: String },
    Abandoned { device_id: String },
    BudgetExhausted { device_id: String },
    IterationFinished { iteration: usize },
}

pub type ProgressCallback = Arc<dyn Fn(CrawlEvent) + Send + Sync>;

/// Options recognised by the crawler.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed_os: DeviceOs,
    pub max_crawl: usize,
    /// Devices scraped at once. A scrape that times out gives its slot back
    /// straight away, but blocking SSH I/O already under way keeps running
    /// until the session's own I/O timeout, so the number of open sessions
    /// can briefly exceed this.
    pub thread_count: usize,
    pub ignore_regex: String,
    /// Longest one device may take to scrape, and the wait for a batch
    /// measured from the end of dispatch.
    pub join_timeout: Duration,
    /// Grace given to each remaining task once `join_timeout` has passed.
    pub straggler_timeout: Duration,
    pub dispatch_delay: Duration,
    pub lldp_summary_mode: LldpSummaryMode,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_os: DeviceOs::CiscoIos,
            max_crawl: 10_000,
            thread_count: 100,
            ignore_regex: String::new(),
            join_timeout: Duration::from_secs(30),
            straggler_timeout: Duration::from_secs(1),
            dispatch_delay: Duration::from_millis(100),
            lldp_summary_mode: LldpSummaryMode::Positional,
        }
    }
}

impl CrawlConfig {
    /// Check every option and compile the ignore pattern.
    pub fn validate(&self) -> Result<IgnoreFilter> {
        if self.max_crawl == 0 {
            return Err(ScanError::Config("max_crawl must be at least 1".to_string()));
        }
        if self.thread_count == 0 {
            return Err(ScanError::Config("thread_count must be at least 1".to_string()));
        }
        if !self.seed_os.is_supported() {
            return Err(ScanError::Config(format!(
                "seed_os must be cisco_ios or cisco_nxos, got {}",
                self.seed_os
            )));
        }
        IgnoreFilter::new(&self.ignore_regex)
    }
}

/// Level-synchronous breadth-first crawler over CDP/LLDP neighbors.
pub struct Crawler {
    connector: Arc<dyn SessionConnector>,
    config: CrawlConfig,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            connector,
            config: CrawlConfig::default(),
            progress_callback: None,
        }
    }

    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_seed_os(mut self, os: DeviceOs) -> Self {
        self.config.seed_os = os;
        self
    }

    pub fn with_max_crawl(mut self, max_crawl: usize) -> Self {
        self.config.max_crawl = max_crawl;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.thread_count = threads;
        self
    }

    pub fn with_ignore_regex(mut self, pattern: impl Into<String>) -> Self {
        self.config.ignore_regex = pattern.into();
        self
    }

    pub fn with_join_timeout(mut self, join: Duration, straggler: Duration) -> Self {
        self.config.join_timeout = join;
        self.config.straggler_timeout = straggler;
        self
    }

    pub fn with_dispatch_delay(mut self, delay: Duration) -> Self {
        self.config.dispatch_delay = delay;
        self
    }

    pub fn with_lldp_summary_mode(mut self, mode: LldpSummaryMode) -> Self {
        self.config.lldp_summary_mode = mode;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    fn emit(&self, event: CrawlEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }

    /// Crawl outward from `seeds` until the frontier is empty or the
    /// `max_crawl` budget is spent.
    pub async fn crawl(&self, seeds: &[String]) -> Result<CrawlResult> {
        let ignore = Arc::new(self.config.validate()?);
        info!(
            "Starting crawl from {} seed(s) with {} workers",
            seeds.len(),
            self.config.thread_count
        );

        let mut state = CrawlState::new();
        for seed in seeds {
            state.add_seed(seed, self.config.seed_os);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.thread_count));
        let mut iteration = 0;

        while state.has_pending() {
            let (batch, skipped) = state.take_batch(self.config.max_crawl);
            for skip in skipped {
                if let Skip::BudgetExhausted(device_id) = skip {
                    self.emit(CrawlEvent::BudgetExhausted { device_id });
                }
            }
            if batch.is_empty() {
                continue;
            }
            iteration += 1;

            self.emit(CrawlEvent::IterationStarted {
                iteration,
                queued: batch.len(),
            });

            let (tx, mut rx) = mpsc::unbounded_channel::<ScrapeOutcome>();
            let mut handles = Vec::with_capacity(batch.len());
            for device in batch {
                let device_id = device.id.clone();
                let handle = self
                    .dispatch(device, &semaphore, &ignore, tx.clone())
                    .await?;
                self.emit(CrawlEvent::Dispatched {
                    iteration,
                    device_id: device_id.clone(),
                });
                handles.push((device_id, handle));
            }
            drop(tx);

            info!("Joining all active scrapes for iteration {}", iteration);
            let abandoned = self.join_batch(handles).await;

            info!("Processing output queue");
            while let Ok(outcome) = rx.try_recv() {
                if abandoned.contains(&outcome.device_id) {
                    debug!("Discarding late result from {}", outcome.device_id);
                    continue;
                }
                self.report_outcome(&outcome);
                state.apply_outcome(outcome);
            }
            for device_id in &abandoned {
                state.mark_abandoned(device_id);
            }

            self.emit(CrawlEvent::IterationFinished { iteration });
        }

        let result = state.into_result(iteration);
        info!(
            "Crawl complete. {} devices, {} neighbors, {} scraped",
            result.devices.len(),
            result.neighbors.len(),
            result.dispatched
        );
        Ok(result)
    }

    /// Wait for a free worker slot, then start the scrape. The task yields
    /// `false` when the scrape outlived `join_timeout`, releasing its slot.
    async fn dispatch(
        &self,
        device: Device,
        semaphore: &Arc<Semaphore>,
        ignore: &Arc<IgnoreFilter>,
        tx: mpsc::UnboundedSender<ScrapeOutcome>,
    ) -> Result<JoinHandle<bool>> {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ScanError::Other(format!("worker pool closed: {}", e)))?;

        // Throttle connections
        if !self.config.dispatch_delay.is_zero() {
            tokio::time::sleep(self.config.dispatch_delay).await;
        }
        info!("Processing {}", device.id);

        let connector = self.connector.clone();
        let ignore = ignore.clone();
        let summary_mode = self.config.lldp_summary_mode;
        let scrape_timeout = self.config.join_timeout;

        Ok(tokio::spawn(async move {
            let _permit = permit;
            let scrape = scrape_device(connector.as_ref(), &device, &ignore, summary_mode);
            match tokio::time::timeout(scrape_timeout, scrape).await {
                Ok(outcome) => {
                    if tx.send(outcome).is_err() {
                        debug!("Result for {} arrived after its batch closed", device.id);
                    }
                    true
                }
                Err(_) => {
                    debug!("Scrape of {} exceeded {:?}", device.id, scrape_timeout);
                    false
                }
            }
        }))
    }

    /// Join every task of a batch, aborting those that outlive the batch
    /// deadline. Returns the ids of abandoned devices.
    async fn join_batch(&self, handles: Vec<(String, JoinHandle<bool>)>) -> HashSet<String> {
        let deadline = Instant::now() + self.config.join_timeout;
        let mut abandoned = HashSet::new();

        for (device_id, mut handle) in handles {
            let wait = deadline
                .saturating_duration_since(Instant::now())
                .max(self.config.straggler_timeout);

            match tokio::time::timeout(wait, &mut handle).await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    warn!("{}", ScanError::JoinTimeout(device_id.clone()));
                    self.emit(CrawlEvent::Abandoned {
                        device_id: device_id.clone(),
                    });
                    abandoned.insert(device_id);
                }
                Ok(Err(e)) => {
                    warn!("Scrape task for {} failed: {}", device_id, e);
                    self.emit(CrawlEvent::Failed {
                        device_id,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!("{}", ScanError::JoinTimeout(device_id.clone()));
                    handle.abort();
                    self.emit(CrawlEvent::Abandoned {
                        device_id: device_id.clone(),
                    });
                    abandoned.insert(device_id);
                }
            }
        }

        abandoned
    }

    fn report_outcome(&self, outcome: &ScrapeOutcome) {
        let device_id = outcome.device_id.clone();
        let event = match &outcome.status {
            ScrapeStatus::Neighbors(neighbors) => CrawlEvent::Completed {
                device_id,
                neighbors: neighbors.len(),
            },
            ScrapeStatus::Unreachable(_) => CrawlEvent::Unreachable { device_id },
            ScrapeStatus::Failed(reason) => CrawlEvent::Failed {
                device_id,
                reason: reason.clone(),
            },
        };
        debug!("{:?} after {:?}", event, outcome.elapsed);
        self.emit(event);
    }
}
