// Topology exports from a finished crawl

use crate::crawl::generate_crawl_report;
use ndcrawl_scanner::CrawlResult;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Dot,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "dot" | "graphviz" => Some(ReportFormat::Dot),
            _ => None,
        }
    }
}

pub const NEIGHBOR_CSV_HEADER: &str =
    "local_device_id,remote_device_id,distance,local_int,remote_int,ipv4,os,platform,description";
pub const NETGRPH_CSV_HEADER: &str = "LocalName,LocalPort,RemoteName,RemotePort";
pub const DEVICE_CSV_HEADER: &str = "device_id,ipv4,platform,os,distance,logged_in";

/// Quote a CSV field when it carries a delimiter, a quote or a line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}

/// Host part of a fully qualified name.
fn short_name(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// One row per neighbor record, in discovery order.
pub fn generate_neighbor_csv(result: &CrawlResult) -> String {
    let mut csv = csv_row(&NEIGHBOR_CSV_HEADER.split(',').collect::<Vec<_>>());
    for n in &result.neighbors {
        let distance = n.distance.to_string();
        csv.push_str(&csv_row(&[
            &n.local_device_id,
            &n.remote_device_id,
            &distance,
            &n.local_int,
            &n.remote_int,
            &n.ipv4,
            n.os.as_str(),
            &n.platform,
            &n.description,
        ]));
    }
    csv
}

/// Neighbor rows for NetGrph import, with names cut to their host part.
pub fn generate_netgrph_csv(result: &CrawlResult) -> String {
    let mut csv = csv_row(&NETGRPH_CSV_HEADER.split(',').collect::<Vec<_>>());
    for n in &result.neighbors {
        csv.push_str(&csv_row(&[
            short_name(&n.local_device_id),
            &n.local_int,
            short_name(&n.remote_device_id),
            &n.remote_int,
        ]));
    }
    csv
}

/// One row per device, sorted by id.
pub fn generate_device_csv(result: &CrawlResult) -> String {
    let mut csv = csv_row(&DEVICE_CSV_HEADER.split(',').collect::<Vec<_>>());
    for (id, device) in &result.devices {
        let distance = result.distance_of(id).to_string();
        let logged_in = if device.reachable { "True" } else { "False" };
        csv.push_str(&csv_row(&[
            id,
            &device.ipv4,
            &device.platform,
            device.os.as_str(),
            &distance,
            logged_in,
        ]));
    }
    csv
}

pub fn generate_json_report(result: &CrawlResult) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "ndcrawl",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "summary": {
                "devices": result.devices.len(),
                "reachable": result.reachable_count(),
                "neighbors": result.neighbors.len(),
                "iterations": result.iterations,
                "dispatched": result.dispatched
            },
            "devices": result.devices,
            "neighbors": result.neighbors,
            "distances": result.distances,
            "unreachable": result.unreachable,
            "abandoned": result.abandoned
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// Undirected device graph with one edge per adjacent pair. Edge weights list
/// the distinct interface pairs seen between the two devices.
pub fn build_topology(result: &CrawlResult) -> UnGraph<String, String> {
    let mut graph = UnGraph::new_undirected();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    for id in result.devices.keys() {
        nodes.insert(id.clone(), graph.add_node(id.clone()));
    }

    let mut links: HashMap<(NodeIndex, NodeIndex), Vec<String>> = HashMap::new();
    let mut order: Vec<(NodeIndex, NodeIndex)> = Vec::new();

    for n in &result.neighbors {
        let local = *nodes
            .entry(n.local_device_id.clone())
            .or_insert_with(|| graph.add_node(n.local_device_id.clone()));
        let remote = *nodes
            .entry(n.remote_device_id.clone())
            .or_insert_with(|| graph.add_node(n.remote_device_id.clone()));

        let (pair, label) = if local <= remote {
            ((local, remote), format!("{} - {}", n.local_int, n.remote_int))
        } else {
            ((remote, local), format!("{} - {}", n.remote_int, n.local_int))
        };

        let labels = links.entry(pair).or_insert_with(|| {
            order.push(pair);
            Vec::new()
        });
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    for pair in order {
        if let Some(labels) = links.remove(&pair) {
            graph.add_edge(pair.0, pair.1, labels.join(", "));
        }
    }

    graph
}

pub fn generate_dot_report(result: &CrawlResult) -> String {
    let graph = build_topology(result);
    let body = Dot::with_config(&graph, &[Config::GraphContentOnly]);
    format!("graph topology {{\n{}}}\n", body)
}

/// Render `result` in the requested format.
pub fn render_report(result: &CrawlResult, format: ReportFormat) -> Result<String, serde_json::Error> {
    Ok(match format {
        ReportFormat::Text => generate_crawl_report(result),
        ReportFormat::Json => generate_json_report(result)?,
        ReportFormat::Csv => generate_neighbor_csv(result),
        ReportFormat::Dot => generate_dot_report(result),
    })
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
