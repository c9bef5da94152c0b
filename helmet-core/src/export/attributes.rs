//! Extra-attribute and network-field transaction writers.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::model::{AttrValue, AttributeDef, Network, ScenarioMeta, ValueKind};

use super::format::{fmt_g, tabulate_right};

/// Columns used by the height job for gradient bookkeeping; they stay
/// internal and are never printed into the exchange files.
fn is_internal(name: &str) -> bool {
    name.ends_with("_from") || name.ends_with("_to")
}

fn extra_declarations(defs: &[&AttributeDef]) -> String {
    let mut block = String::from("t extra_attributes\n");
    for def in defs {
        let default = match &def.default {
            AttrValue::Real(v) => format!("{v:?}"),
            other => other.to_string(),
        };
        block.push_str(&format!(
            "{} {} {} '{}'\n",
            def.name,
            def.owner.as_str(),
            default,
            def.label
        ));
    }
    block.push_str("end extra_attributes\n");
    block
}

fn netfield_declarations(defs: &[&AttributeDef]) -> String {
    let mut block = String::from("t network_fields\n");
    for def in defs {
        block.push_str(&format!(
            "{} {} {} '{}'\n",
            def.name,
            def.owner.as_str(),
            def.kind.as_str(),
            def.label
        ));
    }
    block.push_str("end network_fields\n");
    block
}

fn cell(value: Option<&AttrValue>, def: &AttributeDef) -> String {
    let value = value.unwrap_or(&def.default);
    match value {
        AttrValue::Real(v) => fmt_g(*v),
        AttrValue::Int(v) => v.to_string(),
        AttrValue::Text(v) => {
            if def.kind == ValueKind::Text {
                format!("'{v}'")
            } else {
                v.clone()
            }
        }
    }
}

fn link_table(network: &Network, defs: &[&AttributeDef]) -> String {
    let mut headers = vec!["inode".to_string(), "jnode".to_string()];
    headers.extend(defs.iter().map(|d| d.name.clone()));

    let mut links: Vec<&crate::model::Link> =
        network.links.iter().filter(|l| !l.is_orphan()).collect();
    links.sort_by_key(|l| (l.from, l.to));
    let rows: Vec<Vec<String>> = links
        .iter()
        .map(|l| {
            let mut row = vec![l.from.to_string(), l.to.to_string()];
            row.extend(defs.iter().map(|d| cell(l.extra.get(&d.name), d)));
            row
        })
        .collect();
    tabulate_right(&headers, &rows)
}

/// Write `extra_links_<n>.txt`: a declaration block for every live `@`
/// link attribute followed by the value table sorted by inode, jnode.
pub fn write_extra_links(
    network: &Network,
    meta: &ScenarioMeta,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let defs: Vec<&AttributeDef> = network
        .link_defs
        .iter()
        .filter(|d| d.name.starts_with('@') && !is_internal(&d.name))
        .collect();

    let mut content = extra_declarations(&defs);
    content.push_str(&link_table(network, &defs));
    content.push('\n');

    let path = out_dir.join(format!("extra_links_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}

/// Write `extra_nodes_<n>.txt` from the derived node view.
pub fn write_extra_nodes(
    network: &Network,
    meta: &ScenarioMeta,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let defs: Vec<&AttributeDef> = network
        .node_defs
        .iter()
        .filter(|d| d.name.starts_with('@'))
        .collect();

    let mut headers = vec!["Node".to_string()];
    headers.extend(defs.iter().map(|d| d.name.clone()));

    let mut nodes = network.node_view();
    nodes.sort_by_key(|n| n.id);
    let rows: Vec<Vec<String>> = nodes
        .iter()
        .map(|n| {
            let mut row = vec![n.id.to_string()];
            for def in &defs {
                let value = match def.name.as_str() {
                    "@korkeus" => fmt_g(n.korkeus),
                    "@hsl" => fmt_g(n.hsl),
                    name => network
                        .node(n.id)
                        .and_then(|node| node.extra.get(name))
                        .map_or_else(|| cell(None, def), ToString::to_string),
                };
                row.push(value);
            }
            row
        })
        .collect();

    let mut content = extra_declarations(&defs);
    content.push_str(&tabulate_right(&headers, &rows));
    content.push('\n');

    let path = out_dir.join(format!("extra_nodes_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}

/// Write `netfield_links_<n>.txt`: `#` fields with their declared
/// REAL/INTEGER32/STRING types.
pub fn write_netfield_links(
    network: &Network,
    meta: &ScenarioMeta,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let defs: Vec<&AttributeDef> = network
        .link_defs
        .iter()
        .filter(|d| d.name.starts_with('#'))
        .collect();

    let mut content = netfield_declarations(&defs);
    content.push_str(&link_table(network, &defs));
    content.push('\n');

    let path = out_dir.join(format!("netfield_links_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}

/// Write `netfield_nodes_<n>.txt` from the node `#` fields.
pub fn write_netfield_nodes(
    network: &Network,
    meta: &ScenarioMeta,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let defs: Vec<&AttributeDef> = network
        .node_defs
        .iter()
        .filter(|d| d.name.starts_with('#'))
        .collect();

    let mut headers = vec!["Node".to_string()];
    headers.extend(defs.iter().map(|d| d.name.clone()));

    let mut ids: Vec<_> = network.node_ids().collect();
    ids.sort_unstable();
    let rows: Vec<Vec<String>> = ids
        .iter()
        .map(|&id| {
            let mut row = vec![id.to_string()];
            for def in &defs {
                let value = network.node(id).and_then(|node| node.extra.get(&def.name));
                row.push(cell(value, def));
            }
            row
        })
        .collect();

    let mut content = netfield_declarations(&defs);
    content.push_str(&tabulate_right(&headers, &rows));
    content.push('\n');

    let path = out_dir.join(format!("netfield_nodes_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}
