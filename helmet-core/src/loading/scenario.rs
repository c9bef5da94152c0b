//! Scenario folder resolution and assembly.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::Error;
use crate::model::{Crs, Network, RawTable, Scenario};

use super::attributes::{
    merge_line_values, merge_link_values, merge_node_values, merge_segment_values, read_attr_file,
};
use super::base_network::read_base_network;
use super::transit::{read_extra_transit_lines, read_transit_lines};

/// The exchange files of one scenario folder, located by filename
/// prefix. Only the base network is mandatory.
#[derive(Debug)]
pub struct ScenarioDir {
    pub base_network: PathBuf,
    pub extra_links: Option<PathBuf>,
    pub extra_nodes: Option<PathBuf>,
    pub netfield_links: Option<PathBuf>,
    pub netfield_nodes: Option<PathBuf>,
    pub transit_lines: Option<PathBuf>,
    pub extra_transit_lines: Option<PathBuf>,
    pub netfield_transit_lines: Option<PathBuf>,
    pub netfield_segments: Option<PathBuf>,
    pub link_shape: Option<PathBuf>,
    pub modes: Option<PathBuf>,
    pub turns: Option<PathBuf>,
    pub vehicles: Option<PathBuf>,
}

impl ScenarioDir {
    pub fn resolve(dir: &Path) -> Result<Self, Error> {
        let mut names: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "txt"))
            .collect();
        names.sort();

        let find = |prefix: &str| {
            names
                .iter()
                .find(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(prefix))
                })
                .cloned()
        };

        let base_network = find("base_network").ok_or_else(|| {
            Error::MissingInput(format!(
                "no base_network*.txt in {}",
                dir.display()
            ))
        })?;
        Ok(Self {
            base_network,
            extra_links: find("extra_links"),
            extra_nodes: find("extra_nodes"),
            netfield_links: find("netfield_links"),
            netfield_nodes: find("netfield_nodes"),
            transit_lines: find("transit_lines"),
            extra_transit_lines: find("extra_transit_lines"),
            netfield_transit_lines: find("netfield_transit_lines"),
            netfield_segments: find("netfield_segments"),
            link_shape: find("link_shape_"),
            modes: find("modes_"),
            turns: find("turns_"),
            vehicles: find("vehicles_"),
        })
    }
}

/// Read an auxiliary table verbatim: header comments dropped, the
/// `t <marker>` line recorded, everything after it kept as-is.
fn read_raw_table(path: &Path) -> Result<RawTable, Error> {
    let content = fs::read_to_string(path)?;
    let mut marker = None;
    let mut rows = Vec::new();
    for raw in content.lines() {
        match &marker {
            None => {
                if let Some(m) = raw.trim_end().strip_prefix("t ") {
                    marker = Some(m.trim().to_string());
                }
            }
            Some(_) => {
                if !raw.trim_end().is_empty() {
                    rows.push(raw.trim_end().to_string());
                }
            }
        }
    }
    let marker = marker
        .ok_or_else(|| Error::parse(path, 0, "no table marker"))?;
    Ok(RawTable { marker, rows })
}

fn maybe_raw(path: Option<&PathBuf>) -> Result<Option<RawTable>, Error> {
    path.map(|p| read_raw_table(p)).transpose()
}

/// Read a whole scenario folder. Coordinates are in EPSG:3879 as
/// exported by the model system.
pub fn read_scenario(dir: &Path) -> Result<Scenario, Error> {
    let files = ScenarioDir::resolve(dir)?;
    info!("reading scenario from {}", dir.display());

    let (meta, nodes, links) = read_base_network(&files.base_network)?;
    let mut network = Network::new(nodes, links, vec![], vec![], Crs::Gk25);
    debug!(
        "scenario {}: {} nodes, {} links",
        meta.scenario_number,
        network.node_count(),
        network.links.len()
    );

    for path in [&files.extra_links, &files.netfield_links]
        .into_iter()
        .flatten()
    {
        let file = read_attr_file(path)?;
        merge_link_values(&mut network, path, &file)?;
    }
    for path in [&files.extra_nodes, &files.netfield_nodes]
        .into_iter()
        .flatten()
    {
        let file = read_attr_file(path)?;
        merge_node_values(&mut network, path, &file)?;
    }

    let mut transit = match &files.transit_lines {
        Some(path) => read_transit_lines(path)?,
        None => Default::default(),
    };
    if let Some(path) = &files.extra_transit_lines {
        read_extra_transit_lines(path, &mut transit)?;
    }
    if let Some(path) = &files.netfield_transit_lines {
        let file = read_attr_file(path)?;
        merge_line_values(&mut transit, path, &file)?;
    }
    if let Some(path) = &files.netfield_segments {
        let file = read_attr_file(path)?;
        merge_segment_values(&mut transit, path, &file)?;
    }
    transit.validate_paths()?;

    Ok(Scenario {
        network,
        transit,
        meta,
        link_shape: maybe_raw(files.link_shape.as_ref())?,
        modes: maybe_raw(files.modes.as_ref())?,
        turns: maybe_raw(files.turns.as_ref())?,
        vehicles: maybe_raw(files.vehicles.as_ref())?,
    })
}
