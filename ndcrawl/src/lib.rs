// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    CrawlOverrides, ExportPaths, console_level, file_level, read_password, resolve_password,
    write_default_config, write_exports,
};

// Re-export crawl functionality from ndcrawl-core
pub use ndcrawl_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report, parse_seed_list,
};
