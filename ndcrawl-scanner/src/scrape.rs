use crate::error::Result;
use crate::merge::merge_neighbors;
use crate::model::{Device, NeighborRecord};
use crate::parser::{IgnoreFilter, LldpSummaryMode, parse_cdp, parse_lldp};
use crate::result::{ScrapeOutcome, ScrapeStatus};
use crate::session::{DeviceSession, SessionConnector};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const CDP_DETAIL_COMMAND: &str = "show cdp neighbor detail";
pub const LLDP_DETAIL_COMMAND: &str = "show lldp neighbor detail";
pub const LLDP_SUMMARY_COMMAND: &str = "show lldp neighbor";

/// Scrape one device for its canonical neighbor list. Never fails: every
/// error is folded into the returned status.
pub async fn scrape_device(
    connector: &dyn SessionConnector,
    device: &Device,
    ignore: &IgnoreFilter,
    summary_mode: LldpSummaryMode,
) -> ScrapeOutcome {
    let start = Instant::now();
    info!("Gathering Neighbors on {}", device.id);

    let mut session = match open_session(connector, device).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Failed to scrape {}: {}", device.id, e);
            return ScrapeOutcome::new(
                device.id.clone(),
                ScrapeStatus::Unreachable(e.to_string()),
                start.elapsed(),
            );
        }
    };

    let status = match collect_neighbors(session.as_mut(), device, ignore, summary_mode).await {
        Ok(neighbors) => {
            info!("Completed Scraping {}: {} neighbors", device.id, neighbors.len());
            ScrapeStatus::Neighbors(neighbors)
        }
        Err(e) => {
            warn!("Failed to gather neighbors on {}: {}", device.id, e);
            ScrapeStatus::Failed(e.to_string())
        }
    };

    if let Err(e) = session.close().await {
        debug!("Error closing session to {}: {}", device.id, e);
    }

    ScrapeOutcome::new(device.id.clone(), status, start.elapsed())
}

/// Try the device name first, then its management address if one is known.
async fn open_session(
    connector: &dyn SessionConnector,
    device: &Device,
) -> Result<Box<dyn DeviceSession>> {
    let by_name = match connector.open(&device.id, device.os).await {
        Ok(session) => return Ok(session),
        Err(e) => e,
    };

    if !device.has_known_ipv4() {
        warn!("Connection to {} failed and IPv4 is Unknown", device.id);
        return Err(by_name);
    }
    if device.ipv4 == device.id {
        return Err(by_name);
    }

    info!(
        "Failed to connect to {} ({}), trying {}",
        device.id, by_name, device.ipv4
    );
    connector.open(&device.ipv4, device.os).await
}

async fn collect_neighbors(
    session: &mut dyn DeviceSession,
    device: &Device,
    ignore: &IgnoreFilter,
    summary_mode: LldpSummaryMode,
) -> Result<Vec<NeighborRecord>> {
    if !device.os.is_supported() {
        warn!("Unknown OS Type to Parse on {}: {}", device.id, device.os);
        return Ok(Vec::new());
    }

    let cdp = session.execute(CDP_DETAIL_COMMAND).await?;
    let lldp_detail = session.execute(LLDP_DETAIL_COMMAND).await?;
    let lldp_summary = session.execute(LLDP_SUMMARY_COMMAND).await?;

    let cdp_neighbors = parse_cdp(&cdp, device, ignore);
    let lldp_neighbors = parse_lldp(&lldp_detail, &lldp_summary, device, ignore, summary_mode);
    for neighbor in &cdp_neighbors {
        debug!("Found Neighbor {:?} on {}", neighbor, device.id);
    }

    Ok(merge_neighbors(cdp_neighbors, lldp_neighbors))
}
