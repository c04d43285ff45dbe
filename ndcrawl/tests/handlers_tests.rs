use ndcrawl::handlers::*;
use ndcrawl_core::config::NdConfig;
use ndcrawl_scanner::CrawlResult;
use ndcrawl_scanner::model::{Device, DeviceOs, NeighborRecord};
use std::fs;
use std::io;
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;

fn small_result() -> CrawlResult {
    let mut result = CrawlResult::default();
    let seed = Device::seed("sw1.example.com", DeviceOs::CiscoIos);
    result.devices.insert(seed.id.clone(), seed);
    result.distances.insert("sw1.example.com".to_string(), 0);

    let mut n = NeighborRecord::new("sw1.example.com", "sw2.example.com");
    n.local_int = "Gi1/0/1".to_string();
    n.remote_int = "Gi1/0/2".to_string();
    n.distance = 0;
    result
        .devices
        .insert("sw2.example.com".to_string(), Device::from_neighbor(&n));
    result.neighbors.push(n);
    result.iterations = 1;
    result.dispatched = 1;
    result
}

#[test]
fn test_parse_seed_list() {
    assert_eq!(parse_seed_list("sw1,sw2"), vec!["sw1", "sw2"]);
    assert_eq!(parse_seed_list(" sw1 "), vec!["sw1"]);
}

#[test]
fn test_console_level_follows_debug_count() {
    assert_eq!(console_level(0), LevelFilter::WARN);
    assert_eq!(console_level(1), LevelFilter::INFO);
    assert_eq!(console_level(2), LevelFilter::DEBUG);
    assert_eq!(console_level(5), LevelFilter::DEBUG);
}

#[test]
fn test_file_level_is_at_least_info() {
    assert_eq!(file_level(0), LevelFilter::INFO);
    assert_eq!(file_level(1), LevelFilter::INFO);
    assert_eq!(file_level(2), LevelFilter::DEBUG);
}

#[test]
fn test_password_from_environment_skips_prompt() {
    let password = resolve_password(Some("from-env".to_string()), || {
        panic!("prompt should not be called")
    })
    .unwrap();
    assert_eq!(password, "from-env");
}

#[test]
fn test_password_prompted_when_env_missing_or_empty() {
    let password = resolve_password(None, || Ok("typed".to_string())).unwrap();
    assert_eq!(password, "typed");

    let password = resolve_password(Some(String::new()), || Ok("typed".to_string())).unwrap();
    assert_eq!(password, "typed");
}

#[test]
fn test_empty_or_failed_prompt_is_an_error() {
    assert!(resolve_password(None, || Ok(String::new())).is_err());
    assert!(
        resolve_password(None, || Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")))
            .is_err()
    );
}

#[test]
fn test_password_prompt_warns_about_echo() {
    let mut input = io::Cursor::new(b"s3cret\r\n".to_vec());
    let mut output = Vec::new();

    let password = read_password("admin", &mut input, &mut output).unwrap();

    assert_eq!(password, "s3cret");
    let shown = String::from_utf8(output).unwrap();
    assert!(shown.contains("visible"));
    assert!(shown.contains(PASSWORD_ENV));
    assert!(shown.contains("admin"));
    assert!(!shown.contains("s3cret"));
}

#[test]
fn test_overrides_win_over_config() {
    let config = NdConfig {
        thread_count: 50,
        ignore_regex: "^SEP".to_string(),
        ..NdConfig::default()
    };
    let overrides = CrawlOverrides {
        threads: Some(4),
        seed_os: Some(DeviceOs::CiscoNxos),
        join_timeout_secs: Some(10),
        ..CrawlOverrides::default()
    };

    let merged = overrides.apply(config).unwrap();
    assert_eq!(merged.thread_count, 4);
    assert_eq!(merged.seed_os, DeviceOs::CiscoNxos);
    assert_eq!(merged.join_timeout_secs, 10);
    assert_eq!(merged.ignore_regex, "^SEP");
    assert_eq!(merged.max_crawl, 10_000);
}

#[test]
fn test_invalid_override_is_rejected() {
    let overrides = CrawlOverrides {
        ignore_regex: Some("(".to_string()),
        ..CrawlOverrides::default()
    };
    assert!(overrides.apply(NdConfig::default()).is_err());

    let overrides = CrawlOverrides {
        max_crawl: Some(0),
        ..CrawlOverrides::default()
    };
    assert!(overrides.apply(NdConfig::default()).is_err());
}

#[test]
fn test_write_default_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let config_dir = dir.path().join("ndcrawl");

    let path = write_default_config(&config_dir)?;

    assert!(path.ends_with("ndcrawl.json"));
    assert_eq!(NdConfig::load(&path)?, NdConfig::default());
    Ok(())
}

#[test]
fn test_write_exports_only_requested_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let paths = ExportPaths {
        neighbors: Some(dir.path().join("neighbors.csv")),
        devices: Some(dir.path().join("devices.csv")),
        dot: Some(dir.path().join("topology.dot")),
        ..ExportPaths::default()
    };

    let written = write_exports(&small_result(), &paths)?;

    assert_eq!(written.len(), 3);
    assert!(!dir.path().join("netgrph.csv").exists());

    let neighbors = fs::read_to_string(dir.path().join("neighbors.csv"))?;
    assert_eq!(neighbors.lines().count(), 2);
    assert!(neighbors.contains("sw1.example.com,sw2.example.com,0,Gi1/0/1,Gi1/0/2"));

    let devices = fs::read_to_string(dir.path().join("devices.csv"))?;
    assert!(devices.contains("sw1.example.com,sw1.example.com,Unknown,cisco_ios,0,True"));

    let dot = fs::read_to_string(dir.path().join("topology.dot"))?;
    assert!(dot.contains("Gi1/0/1 - Gi1/0/2"));
    Ok(())
}

#[test]
fn test_write_exports_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let paths = ExportPaths {
        json: Some(dir.path().join("out").join("crawl.json")),
        ..ExportPaths::default()
    };

    write_exports(&small_result(), &paths)?;

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out").join("crawl.json"))?)?;
    assert_eq!(json["report"]["summary"]["devices"], 2);
    Ok(())
}

#[test]
fn test_generate_crawl_report() {
    let report = generate_crawl_report(&small_result());

    assert!(report.contains("Devices discovered: 2"));
    assert!(report.contains("Neighbor records: 1"));
    assert!(report.contains("sw2.example.com"));
}
