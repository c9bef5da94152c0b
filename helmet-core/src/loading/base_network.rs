//! Base network file parsing.

use std::fs;
use std::path::Path;

use geo::Coord;
use hashbrown::HashSet;

use crate::error::Error;
use crate::model::{AttrMap, Link, Node, NodeId, ScenarioMeta};

use super::section::{Row, Table, parse_sections};

/// Column-index lookup built from a table's header row.
struct Columns<'a> {
    file: &'a Path,
    header: &'a [String],
}

impl<'a> Columns<'a> {
    fn new(file: &'a Path, table: &'a Table) -> Self {
        Self {
            file,
            header: &table.header,
        }
    }

    fn index(&self, name: &str) -> Result<usize, Error> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::parse(self.file, 0, format!("missing column '{name}'")))
    }

    fn check_width(&self, row: &Row) -> Result<(), Error> {
        if row.tokens.len() != self.header.len() {
            return Err(Error::parse(
                self.file,
                row.line,
                format!(
                    "expected {} columns, found {}",
                    self.header.len(),
                    row.tokens.len()
                ),
            ));
        }
        Ok(())
    }

    fn text<'b>(&self, row: &'b Row, idx: usize) -> &'b str {
        &row.tokens[idx]
    }

    fn int(&self, row: &Row, idx: usize) -> Result<i32, Error> {
        self.text(row, idx).parse().map_err(|_| {
            Error::parse(
                self.file,
                row.line,
                format!("'{}' is not an integer", self.text(row, idx)),
            )
        })
    }

    fn float(&self, row: &Row, idx: usize) -> Result<f64, Error> {
        self.text(row, idx).parse().map_err(|_| {
            Error::parse(
                self.file,
                row.line,
                format!("'{}' is not a number", self.text(row, idx)),
            )
        })
    }
}

fn parse_nodes(file: &Path, table: &Table) -> Result<Vec<Node>, Error> {
    let cols = Columns::new(file, table);
    let (marker, id) = (cols.index("c")?, cols.index("Node")?);
    let (x, y) = (cols.index("X-coord")?, cols.index("Y-coord")?);
    let data = [cols.index("Data1")?, cols.index("Data2")?, cols.index("Data3")?];
    let label = cols.index("Label")?;

    table
        .rows
        .iter()
        .map(|row| {
            cols.check_width(row)?;
            Ok(Node {
                id: cols.int(row, id)?,
                coord: Coord {
                    x: cols.float(row, x)?,
                    y: cols.float(row, y)?,
                },
                elevation: None,
                is_centroid: cols.text(row, marker).contains('*'),
                data: [
                    cols.float(row, data[0])?,
                    cols.float(row, data[1])?,
                    cols.float(row, data[2])?,
                ],
                label: cols.text(row, label).to_string(),
                extra: AttrMap::new(),
            })
        })
        .collect()
}

fn parse_links(file: &Path, table: &Table) -> Result<Vec<Link>, Error> {
    let cols = Columns::new(file, table);
    let (from, to) = (cols.index("From")?, cols.index("To")?);
    let length = cols.index("Length")?;
    let modes = cols.index("Modes")?;
    let link_type = cols.index("Typ")?;
    let lanes = cols.index("Lan")?;
    let vdf = cols.index("VDF")?;
    let data = [cols.index("Data1")?, cols.index("Data2")?, cols.index("Data3")?];

    table
        .rows
        .iter()
        .map(|row| {
            cols.check_width(row)?;
            Ok(Link {
                from: cols.int(row, from)?,
                to: cols.int(row, to)?,
                length: cols.float(row, length)?,
                modes: cols.text(row, modes).to_string(),
                link_type: cols.int(row, link_type)?,
                lanes: cols.float(row, lanes)?,
                vdf: cols.int(row, vdf)?,
                data: [
                    cols.float(row, data[0])?,
                    cols.float(row, data[1])?,
                    cols.float(row, data[2])?,
                ],
                extra: AttrMap::new(),
            })
        })
        .collect()
}

/// A node touched by no printed link gets one synthetic row with
/// `To = 0` so the From side of the link table covers the whole node
/// table.
fn synthesize_orphans(nodes: &[Node], links: &mut Vec<Link>) {
    let mut linked: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
    for link in links.iter() {
        linked.insert(link.from);
        linked.insert(link.to);
    }
    for node in nodes {
        if !linked.contains(&node.id) {
            links.push(Link {
                from: node.id,
                to: 0,
                length: 0.0,
                modes: String::new(),
                link_type: 0,
                lanes: 0.0,
                vdf: 0,
                data: [0.0; 3],
                extra: AttrMap::new(),
            });
        }
    }
}

/// Parse `base_network_<n>.txt` into the node table, the link table
/// (orphan rows synthesized) and the header metadata.
pub(crate) fn read_base_network(
    path: &Path,
) -> Result<(ScenarioMeta, Vec<Node>, Vec<Link>), Error> {
    let content = fs::read_to_string(path)?;
    let sections = parse_sections(path, &content)?;
    let nodes_table = sections
        .table("nodes")
        .ok_or_else(|| Error::parse(path, 0, "no 't nodes' table"))?;
    let links_table = sections
        .table("links")
        .ok_or_else(|| Error::parse(path, 0, "no 't links' table"))?;

    let nodes = parse_nodes(path, nodes_table)?;
    let mut links = parse_links(path, links_table)?;
    synthesize_orphans(&nodes, &mut links);
    Ok((sections.meta, nodes, links))
}
