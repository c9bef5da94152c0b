//! Writers for the scenario exchange files.
//!
//! Every transaction file is regenerated from the in-memory model; the
//! auxiliary tables (link shapes, modes, turns, vehicles) are passed
//! through verbatim under a fresh header. A full-scenario export shares
//! one timestamp across all files.

pub mod format;

mod attributes;
mod base_network;
mod transit;

pub use attributes::{
    write_extra_links, write_extra_nodes, write_netfield_links, write_netfield_nodes,
};
pub use base_network::write_base_network;
pub use transit::{
    write_extra_transit_lines, write_netfield_segments, write_netfield_transit_lines,
    write_transit_lines,
};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

use crate::error::Error;
use crate::model::{RawTable, Scenario, ScenarioMeta};

/// The `c Modeller` comment header shared by all transaction files.
pub(crate) fn header_block(kind: &str, meta: &ScenarioMeta, timestamp: &str) -> String {
    format!(
        "c Modeller - {kind} Transaction\nc Date: {timestamp}\nc Project: {}\nc Scenario {}: {}\n",
        meta.project_name, meta.scenario_number, meta.scenario_name
    )
}

/// Write a passthrough table under a regenerated header. Absent tables
/// still produce a file with the header and marker so the scenario
/// folder stays complete.
fn write_raw_table(
    table: Option<&RawTable>,
    kind: &str,
    default_marker: &str,
    file_stem: &str,
    meta: &ScenarioMeta,
    timestamp: &str,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let mut content = header_block(kind, meta, timestamp);
    if kind == "Link Shape" {
        content.push_str("c I_Node J_Node Vertex_No. X-Coord Y-Coord\n");
    }
    let marker = table.map_or(default_marker, |t| t.marker.as_str());
    content.push_str(&format!("t {marker}\n"));
    if let Some(table) = table {
        for row in &table.rows {
            content.push_str(row);
            content.push('\n');
        }
    }
    let path = out_dir.join(format!("{file_stem}_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}

/// Export the whole scenario into `out_dir`, creating it if needed.
/// Returns the written paths in export order.
pub fn export_scenario(scenario: &Scenario, out_dir: &Path) -> Result<Vec<PathBuf>, Error> {
    fs::create_dir_all(out_dir)?;
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let meta = &scenario.meta;
    info!(
        "exporting scenario {} to {}",
        meta.scenario_number,
        out_dir.display()
    );

    let mut written = vec![
        write_base_network(&scenario.network, meta, &timestamp, out_dir)?,
        write_extra_links(&scenario.network, meta, out_dir)?,
        write_extra_nodes(&scenario.network, meta, out_dir)?,
        write_netfield_links(&scenario.network, meta, out_dir)?,
        write_netfield_nodes(&scenario.network, meta, out_dir)?,
    ];
    written.push(write_raw_table(
        scenario.link_shape.as_ref(),
        "Link Shape",
        "linkvertices",
        "link_shape",
        meta,
        &timestamp,
        out_dir,
    )?);
    written.push(write_raw_table(
        scenario.modes.as_ref(),
        "Mode",
        "modes",
        "modes",
        meta,
        &timestamp,
        out_dir,
    )?);
    written.push(write_raw_table(
        scenario.turns.as_ref(),
        "Turn",
        "turns",
        "turns",
        meta,
        &timestamp,
        out_dir,
    )?);
    written.push(write_raw_table(
        scenario.vehicles.as_ref(),
        "Vehicle",
        "vehicles",
        "vehicles",
        meta,
        &timestamp,
        out_dir,
    )?);
    written.push(write_transit_lines(
        &scenario.transit,
        meta,
        &timestamp,
        out_dir,
    )?);
    written.push(write_extra_transit_lines(&scenario.transit, meta, out_dir)?);
    written.push(write_netfield_transit_lines(
        &scenario.transit,
        meta,
        out_dir,
    )?);
    written.push(write_netfield_segments(&scenario.transit, meta, out_dir)?);

    info!("wrote {} files", written.len());
    Ok(written)
}
