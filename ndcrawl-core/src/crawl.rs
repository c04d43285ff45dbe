use crate::config::NdConfig;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ndcrawl_scanner::model::{DISTANCE_UNKNOWN, DeviceOs};
use ndcrawl_scanner::{
    CrawlConfig, CrawlEvent, CrawlResult, Crawler, Credentials, LldpSummaryMode, Result,
    ScanError, SessionConnector, SshConnector,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tracing::info;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub seeds: Vec<String>,
    pub credentials: Credentials,
    pub seed_os: DeviceOs,
    pub max_crawl: usize,
    pub threads: usize,
    pub ignore_regex: String,
    pub join_timeout_secs: u64,
    pub strict_lldp_summary: bool,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    /// Options taking every tunable from a loaded configuration file.
    pub fn from_config(seeds: Vec<String>, credentials: Credentials, config: &NdConfig) -> Self {
        Self {
            seeds,
            credentials,
            seed_os: config.seed_os,
            max_crawl: config.max_crawl,
            threads: config.thread_count,
            ignore_regex: config.ignore_regex.clone(),
            join_timeout_secs: config.join_timeout_secs,
            strict_lldp_summary: false,
            show_progress_bars: true,
        }
    }

    fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            seed_os: self.seed_os,
            max_crawl: self.max_crawl,
            thread_count: self.threads,
            ignore_regex: self.ignore_regex.clone(),
            join_timeout: Duration::from_secs(self.join_timeout_secs),
            lldp_summary_mode: if self.strict_lldp_summary {
                LldpSummaryMode::Strict
            } else {
                LldpSummaryMode::Positional
            },
            ..CrawlConfig::default()
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Split a comma separated seed argument, dropping blanks and repeats.
pub fn parse_seed_list(seeds: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    seeds
        .split(',')
        .map(str::trim)
        .filter(|seed| !seed.is_empty())
        .filter(|seed| seen.insert(seed.to_string()))
        .map(str::to_string)
        .collect()
}

/// Execute a crawl over SSH with the given options
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlResult> {
    let connector = Arc::new(SshConnector::new(options.credentials.clone()));
    execute_crawl_with(connector, options, progress_callback).await
}

/// Execute a crawl through an arbitrary session connector
pub async fn execute_crawl_with(
    connector: Arc<dyn SessionConnector>,
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlResult> {
    if options.seeds.is_empty() {
        return Err(ScanError::Config("at least one seed device is required".to_string()));
    }

    // Bar for the iteration currently in flight (only if enabled)
    let current_bar: Arc<StdMutex<Option<ProgressBar>>> = Arc::new(StdMutex::new(None));
    let show_progress_bars = options.show_progress_bars;

    let bar_slot = current_bar.clone();
    let user_callback = progress_callback.clone();
    let internal_callback: ndcrawl_scanner::ProgressCallback = Arc::new(move |event: CrawlEvent| {
        match event {
            CrawlEvent::IterationStarted { iteration, queued } => {
                if let Some(ref callback) = user_callback {
                    callback(format!(
                        "Iteration {}: {} device(s) queued",
                        iteration, queued
                    ));
                }
                if show_progress_bars && let Ok(mut slot) = bar_slot.lock() {
                    if let Some(previous) = slot.take() {
                        previous.finish_and_clear();
                    }
                    *slot = Some(iteration_bar(iteration, queued));
                }
            }
            CrawlEvent::Dispatched { device_id, .. } => {
                if let Ok(slot) = bar_slot.lock()
                    && let Some(ref pb) = *slot
                {
                    pb.set_message(device_id);
                }
            }
            CrawlEvent::Completed { .. }
            | CrawlEvent::Unreachable { .. }
            | CrawlEvent::Failed { .. }
            | CrawlEvent::Abandoned { .. } => {
                if let Ok(slot) = bar_slot.lock()
                    && let Some(ref pb) = *slot
                {
                    pb.inc(1);
                }
            }
            CrawlEvent::BudgetExhausted { device_id } => {
                if let Some(ref callback) = user_callback {
                    callback(format!(
                        "[!] max_crawl reached, not scraping {}",
                        device_id
                    ));
                }
            }
            CrawlEvent::IterationFinished { .. } => {
                if let Ok(mut slot) = bar_slot.lock()
                    && let Some(pb) = slot.take()
                {
                    pb.finish_and_clear();
                }
            }
        }
    });

    info!(
        "Crawling from {} with {} workers, max {} devices",
        options.seeds.join(","),
        options.threads,
        options.max_crawl
    );
    let crawler = Crawler::new(connector)
        .with_config(options.crawl_config())
        .with_progress_callback(internal_callback);

    let result = crawler.crawl(&options.seeds).await;

    if let Ok(mut slot) = current_bar.lock()
        && let Some(pb) = slot.take()
    {
        pb.finish_and_clear();
    }

    if let (Ok(result), Some(callback)) = (&result, &progress_callback) {
        callback(format!(
            "Crawl complete! {} devices scraped over {} iteration(s)",
            result.dispatched, result.iterations
        ));
    }

    result
}

/// The first iteration only scrapes seeds, so it gets a spinner; later
/// iterations get a bar sized to the batch.
fn iteration_bar(iteration: usize, queued: usize) -> ProgressBar {
    if iteration == 1 {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} Crawling seeds: {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    } else {
        let pb = ProgressBar::new(queued as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.cyan}} Iteration {} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
                    iteration
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Generate a crawl report from results
pub fn generate_crawl_report(result: &CrawlResult) -> String {
    let divider = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
    let mut report = String::new();
    report.push_str(divider);
    report.push_str("\n\n");
    report.push_str(&format!("{}\n", "# Summary:".bold()));
    report.push_str(&format!("  Devices discovered: {}\n", result.devices.len()));
    report.push_str(&format!("  Reachable devices: {}\n", result.reachable_count()));
    report.push_str(&format!("  Devices scraped: {}\n", result.dispatched));
    report.push_str(&format!("  Neighbor records: {}\n", result.neighbors.len()));
    report.push_str(&format!("  Iterations: {}\n", result.iterations));
    report.push('\n');
    report.push_str(divider);
    report.push_str("\n\n");

    // Devices per distance from the seeds
    let mut by_distance: BTreeMap<u32, usize> = BTreeMap::new();
    for device in result.devices.values() {
        *by_distance.entry(result.distance_of(&device.id)).or_default() += 1;
    }
    report.push_str(&format!("{}\n", "## Distance".bold()));
    for (distance, count) in &by_distance {
        let label = if *distance == DISTANCE_UNKNOWN {
            "unknown".to_string()
        } else {
            distance.to_string()
        };
        report.push_str(&format!("  {:>7}: {} device(s)\n", label, count));
    }
    report.push('\n');

    if !result.unreachable.is_empty() {
        report.push_str(&format!("{}\n", "## Unreachable".bold()));
        for device_id in &result.unreachable {
            report.push_str(&format!("  {} {}\n", "✗".red(), device_id));
        }
        report.push('\n');
    }

    if !result.abandoned.is_empty() {
        report.push_str(&format!("{}\n", "## Timed out".bold()));
        for device_id in &result.abandoned {
            report.push_str(&format!("  {} {}\n", "⚠".yellow(), device_id));
        }
        report.push('\n');
    }

    report.push_str(&format!("{}\n", "## Devices".bold()));
    for device in result.devices.values() {
        let status = if device.reachable {
            "✓".green()
        } else {
            "·".dimmed()
        };
        report.push_str(&format!(
            "  {} {} {} {} {}\n",
            status,
            device.id,
            device.ipv4.dimmed(),
            device.platform.cyan(),
            device.os.as_str().dimmed()
        ));
    }

    report
}
