use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use ndcrawl_core::config::{CONFIG_FILE_NAME, NdConfig, expand_path};
use ndcrawl_core::report::{
    ReportFormat, generate_device_csv, generate_dot_report, generate_json_report,
    generate_neighbor_csv, generate_netgrph_csv, render_report, save_report,
};
use ndcrawl_scanner::model::DeviceOs;
use ndcrawl_scanner::{CrawlResult, Credentials};
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

pub const PASSWORD_ENV: &str = "NDCRAWL_PASSWORD";

// Re-export crawl types and functions from ndcrawl-core
pub use ndcrawl_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report, parse_seed_list,
};

// Helper functions for crawl handler

/// Console verbosity for the number of `-d` flags.
pub fn console_level(debug: u8) -> LevelFilter {
    match debug {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// The log file records at least INFO, more when the console is more verbose.
pub fn file_level(debug: u8) -> LevelFilter {
    console_level(debug).max(LevelFilter::INFO)
}

/// Console logging on stderr, plus an uncolored log file when configured.
pub fn init_logging(debug: u8, log_file: Option<&str>) -> Result<()> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(console_level(debug));

    let file_layer = match log_file {
        Some(path) => {
            let path = expand_path(path);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(file_level(debug)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(())
}

/// Settings given on the command line, which win over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct CrawlOverrides {
    pub threads: Option<usize>,
    pub max_crawl: Option<usize>,
    pub seed_os: Option<DeviceOs>,
    pub ignore_regex: Option<String>,
    pub join_timeout_secs: Option<u64>,
}

impl CrawlOverrides {
    pub fn from_args(args: &ArgMatches) -> Result<Self> {
        let seed_os = match args.get_one::<String>("seed-os") {
            Some(os) => Some(os.parse::<DeviceOs>().map_err(anyhow::Error::msg)?),
            None => None,
        };
        Ok(Self {
            threads: args.get_one::<usize>("threads").copied(),
            max_crawl: args.get_one::<usize>("max-crawl").copied(),
            seed_os,
            ignore_regex: args.get_one::<String>("ignore-regex").cloned(),
            join_timeout_secs: args.get_one::<u64>("join-timeout").copied(),
        })
    }

    pub fn apply(&self, mut config: NdConfig) -> Result<NdConfig> {
        if let Some(threads) = self.threads {
            config.thread_count = threads;
        }
        if let Some(max_crawl) = self.max_crawl {
            config.max_crawl = max_crawl;
        }
        if let Some(os) = self.seed_os {
            config.seed_os = os;
        }
        if let Some(ref pattern) = self.ignore_regex {
            config.ignore_regex = pattern.clone();
        }
        if let Some(secs) = self.join_timeout_secs {
            config.join_timeout_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Use the environment password when set, otherwise ask for one.
pub fn resolve_password<F>(from_env: Option<String>, prompt: F) -> Result<String>
where
    F: FnOnce() -> io::Result<String>,
{
    if let Some(password) = from_env.filter(|p| !p.is_empty()) {
        return Ok(password);
    }
    let password = prompt().context("Failed to read password")?;
    if password.is_empty() {
        bail!("A password is required (set {} or enter it at the prompt)", PASSWORD_ENV);
    }
    Ok(password)
}

/// Ask for a password on `output` and read one line from `input`. Typing is
/// echoed, so the prompt warns about it first.
pub fn read_password<R: BufRead, W: Write>(
    username: &str,
    input: &mut R,
    output: &mut W,
) -> io::Result<String> {
    writeln!(
        output,
        "{} The password will be visible as you type it. Set {} to skip this prompt.",
        "⚠".yellow().bold(),
        PASSWORD_ENV
    )?;
    write!(output, "{} ", format!("Password for {}:", username).bright_cyan().bold())?;
    output.flush()?;
    let mut password = String::new();
    input.read_line(&mut password)?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

fn prompt_password(username: &str) -> io::Result<String> {
    read_password(username, &mut io::stdin().lock(), &mut io::stdout())
}

/// Where each requested export should be written.
#[derive(Debug, Clone, Default)]
pub struct ExportPaths {
    pub neighbors: Option<PathBuf>,
    pub devices: Option<PathBuf>,
    pub netgrph: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub dot: Option<PathBuf>,
}

impl ExportPaths {
    pub fn from_args(args: &ArgMatches) -> Self {
        let path = |name: &str| args.get_one::<PathBuf>(name).cloned();
        Self {
            neighbors: path("output"),
            devices: path("devices-out"),
            netgrph: path("netgrph-out"),
            json: path("json-out"),
            dot: path("dot-out"),
        }
    }
}

/// Write every requested export, returning the files written.
pub fn write_exports(result: &CrawlResult, paths: &ExportPaths) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if let Some(ref path) = paths.neighbors {
        write_export(path, &generate_neighbor_csv(result), &mut written)?;
    }
    if let Some(ref path) = paths.devices {
        write_export(path, &generate_device_csv(result), &mut written)?;
    }
    if let Some(ref path) = paths.netgrph {
        write_export(path, &generate_netgrph_csv(result), &mut written)?;
    }
    if let Some(ref path) = paths.json {
        let json = generate_json_report(result).context("Failed to serialize crawl result")?;
        write_export(path, &json, &mut written)?;
    }
    if let Some(ref path) = paths.dot {
        write_export(path, &generate_dot_report(result), &mut written)?;
    }

    Ok(written)
}

fn write_export(path: &Path, content: &str, written: &mut Vec<PathBuf>) -> Result<()> {
    save_report(content, path).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    written.push(path.to_path_buf());
    Ok(())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

/// Write the default configuration into `config_dir`.
pub fn write_default_config(config_dir: &Path) -> Result<PathBuf> {
    let config_path = config_dir.join(CONFIG_FILE_NAME);
    NdConfig::default()
        .save(&config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(config_path)
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  NDCRAWL INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or("~/.config/ndcrawl/");
    let force = args.get_flag("force");
    let config_dir = expand_path(config_dir);
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    println!("{} Parsed arguments", "✓".green().bold());
    println!(
        "{} Target: {}",
        "→".blue(),
        config_path.display().to_string().bright_white()
    );
    println!();

    // Check for existing configuration
    if config_path.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Configuration file already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            config_path.display().to_string().bright_white()
        );
        println!();
        println!(
            "{}",
            "This operation will overwrite it with the defaults.".yellow()
        );

        let response = print_prompt("Do you want to continue? [y/N]:");
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    println!("{} Writing default configuration...", "→".blue());
    let written = write_default_config(&config_dir)?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Configuration: {}",
        "✓".green().bold(),
        written.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let conf = sub_matches.get_one::<String>("conf");
    let config = NdConfig::load_or_default(conf.map(String::as_str))
        .context("Failed to load configuration")?;
    let config = CrawlOverrides::from_args(sub_matches)?.apply(config)?;

    let debug = sub_matches.get_count("debug");
    init_logging(debug, config.log_file.as_deref())?;

    let seeds = sub_matches
        .get_one::<String>("seed")
        .map(|s| parse_seed_list(s))
        .unwrap_or_default();
    if seeds.is_empty() {
        bail!("At least one seed device is required");
    }

    let username = sub_matches
        .get_one::<String>("user")
        .cloned()
        .context("A username is required")?;
    let password = resolve_password(std::env::var(PASSWORD_ENV).ok(), || {
        prompt_password(&username)
    })?;

    let exports = ExportPaths::from_args(sub_matches);
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    // Print crawl configuration
    if !quiet {
        println!("\n🔎 Crawling from {} seed(s): {}", seeds.len(), seeds.join(", "));
        println!("Workers: {}", config.thread_count);
        println!("Max devices: {}", config.max_crawl);
        println!("Seed OS: {}", config.seed_os);
        if !config.ignore_regex.is_empty() {
            println!("Ignoring: {}", config.ignore_regex);
        }
        println!();
    }

    let mut options = CrawlOptions::from_config(
        seeds,
        Credentials::new(username, password),
        &config,
    );
    options.strict_lldp_summary = sub_matches.get_flag("strict-lldp-summary");
    options.show_progress_bars = !quiet;

    let progress_callback: Option<CrawlProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            println!("{}", msg);
        }))
    };

    let result = execute_crawl(options, progress_callback)
        .await
        .context("Crawl failed")?;

    if format == ReportFormat::Text {
        println!("\n{} Crawl complete!\n", "✓".green().bold());
    }
    let report = render_report(&result, format).context("Failed to render crawl report")?;
    print!("{}", report);

    for path in write_exports(&result, &exports)? {
        println!(
            "{} Wrote {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
    Ok(())
}
