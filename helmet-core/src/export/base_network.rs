//! Base network transaction writer.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::model::{Network, ScenarioMeta};

use super::format::{fmt_num, tabulate_plain};
use super::header_block;

const NODE_COLUMNS: &[&str] = &[
    "c", "Node", "X-coord", "Y-coord", "Data1", "Data2", "Data3", "Label",
];
const LINK_COLUMNS: &[&str] = &[
    "c", "From", "To", "Length", "Modes", "Typ", "Lan", "VDF", "Data1", "Data2", "Data3",
];

/// Write `base_network_<n>.txt`. Orphan rows (`To <= 0`) are kept in the
/// model but never printed.
pub fn write_base_network(
    network: &Network,
    meta: &ScenarioMeta,
    timestamp: &str,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let mut nodes = network.node_view();
    nodes.sort_by_key(|n| n.id);
    let node_rows: Vec<Vec<String>> = nodes
        .iter()
        .map(|n| {
            vec![
                if n.is_centroid { "a*" } else { "a" }.to_string(),
                n.id.to_string(),
                fmt_num(n.coord.x),
                fmt_num(n.coord.y),
                fmt_num(n.data[0]),
                fmt_num(n.data[1]),
                fmt_num(n.data[2]),
                n.label.clone(),
            ]
        })
        .collect();

    let mut links: Vec<&crate::model::Link> =
        network.links.iter().filter(|l| !l.is_orphan()).collect();
    links.sort_by_key(|l| (l.from, l.to));
    let link_rows: Vec<Vec<String>> = links
        .iter()
        .map(|l| {
            vec![
                "a".to_string(),
                l.from.to_string(),
                l.to.to_string(),
                fmt_num(l.length),
                l.modes.clone(),
                l.link_type.to_string(),
                fmt_num(l.lanes),
                l.vdf.to_string(),
                fmt_num(l.data[0]),
                fmt_num(l.data[1]),
                fmt_num(l.data[2]),
            ]
        })
        .collect();

    let headers = |cols: &[&str]| cols.iter().map(ToString::to_string).collect::<Vec<_>>();
    let mut content = header_block("Base Network", meta, timestamp);
    content.push_str("t nodes\n");
    content.push_str(&tabulate_plain(&headers(NODE_COLUMNS), &node_rows));
    content.push_str("\nt links\n");
    content.push_str(&tabulate_plain(&headers(LINK_COLUMNS), &link_rows));
    content.push('\n');

    let path = out_dir.join(format!("base_network_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}
