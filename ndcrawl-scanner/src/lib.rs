pub mod crawler;
pub mod error;
pub mod merge;
pub mod model;
pub mod parser;
pub mod result;
pub mod scrape;
pub mod session;
pub mod state;

pub use crawler::{CrawlConfig, CrawlEvent, Crawler, ProgressCallback};
pub use error::{Result, ScanError};
pub use model::{Device, DeviceOs, NeighborRecord};
pub use parser::{IgnoreFilter, LldpSummaryMode};
pub use result::CrawlResult;
pub use session::{Credentials, DeviceSession, SessionConnector, SshConnector};
