// Tests for crawl execution and the text summary

use async_trait::async_trait;
use ndcrawl_core::config::NdConfig;
use ndcrawl_core::crawl::{
    CrawlOptions, execute_crawl_with, generate_crawl_report, parse_seed_list,
};
use ndcrawl_scanner::model::DeviceOs;
use ndcrawl_scanner::{CrawlResult, Credentials, DeviceSession, Result, ScanError, SessionConnector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock devices
// ============================================================================

/// Serves `show cdp neighbor detail` output per host; every other command
/// returns nothing.
struct CannedConnector {
    cdp: HashMap<String, Vec<String>>,
}

struct CannedSession {
    cdp: Vec<String>,
}

#[async_trait]
impl DeviceSession for CannedSession {
    async fn execute(&mut self, command: &str) -> Result<Vec<String>> {
        if command == "show cdp neighbor detail" {
            Ok(self.cdp.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SessionConnector for CannedConnector {
    async fn open(&self, host: &str, _os: DeviceOs) -> Result<Box<dyn DeviceSession>> {
        let cdp = self
            .cdp
            .get(host)
            .cloned()
            .ok_or_else(|| ScanError::connection(host, "connection refused"))?;
        Ok(Box::new(CannedSession { cdp }))
    }
}

fn cdp_entry(remote: &str, local_int: &str, remote_int: &str) -> Vec<String> {
    vec![
        "-------------------------".to_string(),
        format!("Device ID: {}", remote),
        "Platform: cisco WS-C3850-48P,  Capabilities: Switch IGMP".to_string(),
        format!("Interface: {},  Port ID (outgoing port): {}", local_int, remote_int),
        "Cisco IOS Software, Catalyst L3 Switch Software".to_string(),
    ]
}

/// sw1 - sw2 - sw3, where sw3 refuses connections.
fn connector() -> Arc<CannedConnector> {
    let mut cdp = HashMap::new();
    cdp.insert("sw1".to_string(), cdp_entry("sw2", "Gi1/0/1", "Gi1/0/1"));
    cdp.insert(
        "sw2".to_string(),
        [
            cdp_entry("sw1", "Gi1/0/1", "Gi1/0/1"),
            cdp_entry("sw3", "Gi1/0/2", "Gi1/0/1"),
        ]
        .concat(),
    );
    Arc::new(CannedConnector { cdp })
}

fn options(seeds: &[&str]) -> CrawlOptions {
    let mut options = CrawlOptions::from_config(
        seeds.iter().map(|s| s.to_string()).collect(),
        Credentials::new("admin", "secret"),
        &NdConfig::default(),
    );
    options.show_progress_bars = false;
    options.join_timeout_secs = 5;
    options
}

// ============================================================================
// Seed Parsing Tests
// ============================================================================

#[test]
fn test_parse_seed_list_splits_and_trims() {
    assert_eq!(parse_seed_list("sw1, sw2 ,sw3"), vec!["sw1", "sw2", "sw3"]);
}

#[test]
fn test_parse_seed_list_drops_blanks_and_repeats() {
    assert_eq!(parse_seed_list("sw1,,sw1, ,sw2,"), vec!["sw1", "sw2"]);
    assert!(parse_seed_list("").is_empty());
}

// ============================================================================
// Execution Tests
// ============================================================================

#[tokio::test]
async fn test_execute_crawl_with_mock_connector() {
    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let messages_clone = messages.clone();

    let result = execute_crawl_with(
        connector(),
        options(&["sw1"]),
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
    )
    .await
    .unwrap();

    assert_eq!(result.distance_of("sw1"), 0);
    assert_eq!(result.distance_of("sw2"), 1);
    assert_eq!(result.unreachable, vec!["sw3".to_string()]);
    assert_eq!(result.devices.len(), 3);

    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.starts_with("Iteration 1:")));
    assert!(messages.iter().any(|m| m.starts_with("Crawl complete!")));
}

#[tokio::test]
async fn test_max_crawl_budget_is_reported() {
    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let messages_clone = messages.clone();
    let mut options = options(&["sw1"]);
    options.max_crawl = 1;

    let result = execute_crawl_with(
        connector(),
        options,
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
    )
    .await
    .unwrap();

    assert_eq!(result.dispatched, 1);
    assert!(
        messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("not scraping sw2"))
    );
}

#[tokio::test]
async fn test_no_seeds_is_a_config_error() {
    let err = execute_crawl_with(connector(), options(&[]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));
}

#[tokio::test]
async fn test_bad_ignore_regex_is_a_config_error() {
    let mut options = options(&["sw1"]);
    options.ignore_regex = "[".to_string();

    let err = execute_crawl_with(connector(), options, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));
}

// ============================================================================
// Report Tests
// ============================================================================

#[tokio::test]
async fn test_crawl_report_summarises_result() {
    let result = execute_crawl_with(connector(), options(&["sw1"]), None)
        .await
        .unwrap();
    let report = generate_crawl_report(&result);

    assert!(report.contains("Devices discovered: 3"));
    assert!(report.contains("Reachable devices: 2"));
    assert!(report.contains("Neighbor records: 3"));
    assert!(report.contains("sw3"));
    assert!(report.contains("device(s)"));
}

#[test]
fn test_crawl_report_for_empty_result() {
    let report = generate_crawl_report(&CrawlResult::default());
    assert!(report.contains("Devices discovered: 0"));
    assert!(report.contains("Iterations: 0"));
}
