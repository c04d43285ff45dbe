pub mod config;
pub mod crawl;
pub mod report;

use colored::Colorize;

pub fn print_banner() {
    let rule = "═".repeat(48);
    println!("{}", rule.bright_blue().bold());
    println!(
        "  {}  {}",
        "ndcrawl".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  {}", "CDP/LLDP network topology crawler".cyan());
    println!("{}", rule.bright_blue().bold());
    println!();
}
