//! Extra-attribute and network-field file parsing.

use std::fs;
use std::path::Path;

use crate::error::Error;
use crate::model::{
    AttrValue, AttributeDef, Network, NodeId, OwnerKind, TransitNetwork, ValueKind,
};

use super::section::{Row, Sections, parse_sections};

/// Parse one declaration row. Extra attributes carry a literal default
/// (`@x LINK 0.0 'label'`), network fields a value type
/// (`#x LINK STRING 'label'`). The label token is absent when the
/// declaration has an empty quoted description.
fn parse_def(file: &Path, row: &Row, netfields: bool) -> Result<AttributeDef, Error> {
    let [name, owner, third, rest @ ..] = row.tokens.as_slice() else {
        return Err(Error::parse(file, row.line, "malformed declaration"));
    };
    let owner = OwnerKind::parse(owner)
        .ok_or_else(|| Error::parse(file, row.line, format!("unknown owner '{owner}'")))?;
    let label = rest.first().cloned().unwrap_or_default();

    if netfields {
        let kind = ValueKind::parse(third)
            .ok_or_else(|| Error::parse(file, row.line, format!("unknown type '{third}'")))?;
        let mut def = AttributeDef::netfield(name, owner, kind);
        // The declared label wins over the name-derived one, also when
        // it is empty.
        def.label = label;
        Ok(def)
    } else {
        let default = third
            .parse::<f64>()
            .map_err(|_| Error::parse(file, row.line, format!("bad default '{third}'")))?;
        Ok(AttributeDef {
            name: name.clone(),
            owner,
            kind: ValueKind::Real,
            default: AttrValue::Real(default),
            label,
        })
    }
}

pub(crate) struct AttrFile {
    pub defs: Vec<AttributeDef>,
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

pub(crate) fn read_attr_file(path: &Path) -> Result<AttrFile, Error> {
    let content = fs::read_to_string(path)?;
    let sections = parse_sections(path, &content)?;
    let netfields = !sections.netfield_defs.is_empty();
    let def_rows: &[Row] = if netfields {
        &sections.netfield_defs
    } else {
        &sections.extra_defs
    };
    let defs = def_rows
        .iter()
        .map(|row| parse_def(path, row, netfields))
        .collect::<Result<Vec<_>, _>>()?;
    let table = value_table(&sections);
    Ok(AttrFile {
        defs,
        header: table.map(|t| t.header.clone()).unwrap_or_default(),
        rows: table.map(|t| t.rows.clone()).unwrap_or_default(),
    })
}

fn value_table(sections: &Sections) -> Option<&super::section::Table> {
    sections.table("").or_else(|| sections.tables.first())
}

fn find_def<'a>(defs: &'a [AttributeDef], name: &str) -> Option<&'a AttributeDef> {
    defs.iter().find(|d| d.name == name)
}

fn parse_value(
    file: &Path,
    row: &Row,
    token: &str,
    def: Option<&AttributeDef>,
) -> Result<AttrValue, Error> {
    let kind = def.map_or(ValueKind::Real, |d| d.kind);
    AttrValue::parse_as(kind, token).ok_or_else(|| {
        Error::parse(
            file,
            row.line,
            format!("'{token}' is not a {}", kind.as_str()),
        )
    })
}

/// Merge a link attribute file into the network, declaring every
/// attribute it carries. Rows are keyed on `inode`, `jnode`; rows for
/// unknown links are skipped.
pub(crate) fn merge_link_values(
    network: &mut Network,
    path: &Path,
    file: &AttrFile,
) -> Result<(), Error> {
    for def in &file.defs {
        network.declare_link_attr(def.clone());
    }
    let Some(inode) = file.header.iter().position(|h| h == "inode") else {
        return Ok(());
    };
    let Some(jnode) = file.header.iter().position(|h| h == "jnode") else {
        return Ok(());
    };

    for row in &file.rows {
        if row.tokens.len() != file.header.len() {
            return Err(Error::parse(path, row.line, "wrong column count"));
        }
        let from: NodeId = row.tokens[inode]
            .parse()
            .map_err(|_| Error::parse(path, row.line, "bad inode"))?;
        let to: NodeId = row.tokens[jnode]
            .parse()
            .map_err(|_| Error::parse(path, row.line, "bad jnode"))?;
        let values: Vec<(String, AttrValue)> = file
            .header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != inode && i != jnode)
            .map(|(i, name)| {
                let def = find_def(&file.defs, name);
                Ok((
                    name.clone(),
                    parse_value(path, row, &row.tokens[i], def)?,
                ))
            })
            .collect::<Result<_, Error>>()?;
        if let Some(link) = network
            .links
            .iter_mut()
            .find(|l| l.from == from && l.to == to)
        {
            link.extra.extend(values);
        }
    }
    Ok(())
}

/// Merge a node attribute file, keyed on the `Node` (or `inode`)
/// column.
pub(crate) fn merge_node_values(
    network: &mut Network,
    path: &Path,
    file: &AttrFile,
) -> Result<(), Error> {
    for def in &file.defs {
        network.declare_node_attr(def.clone());
    }
    let Some(key) = file
        .header
        .iter()
        .position(|h| h == "Node" || h == "inode")
    else {
        return Ok(());
    };

    for row in &file.rows {
        if row.tokens.len() != file.header.len() {
            return Err(Error::parse(path, row.line, "wrong column count"));
        }
        let id: NodeId = row.tokens[key]
            .parse()
            .map_err(|_| Error::parse(path, row.line, "bad node id"))?;
        let values: Vec<(String, AttrValue)> = file
            .header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != key)
            .map(|(i, name)| {
                let def = find_def(&file.defs, name);
                Ok((
                    name.clone(),
                    parse_value(path, row, &row.tokens[i], def)?,
                ))
            })
            .collect::<Result<_, Error>>()?;
        if let Some(node) = network.node_mut(id) {
            node.extra.extend(values);
        }
    }
    Ok(())
}

/// Merge a transit line attribute file, keyed on the quoted `line`
/// column. Rows for unknown lines are skipped.
pub(crate) fn merge_line_values(
    transit: &mut TransitNetwork,
    path: &Path,
    file: &AttrFile,
) -> Result<(), Error> {
    for def in &file.defs {
        if !transit.line_defs.iter().any(|d| d.name == def.name) {
            transit.line_defs.push(def.clone());
        }
    }
    let Some(key) = file.header.iter().position(|h| h == "line") else {
        return Ok(());
    };

    for row in &file.rows {
        if row.tokens.len() != file.header.len() {
            return Err(Error::parse(path, row.line, "wrong column count"));
        }
        let code = row.tokens[key].trim();
        let values: Vec<(String, AttrValue)> = file
            .header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != key)
            .map(|(i, name)| {
                let def = find_def(&file.defs, name);
                Ok((
                    name.clone(),
                    parse_value(path, row, &row.tokens[i], def)?,
                ))
            })
            .collect::<Result<_, Error>>()?;
        if let Some(line) = transit.lines.iter_mut().find(|l| l.code == code) {
            line.extra.extend(values);
        }
    }
    Ok(())
}

/// Merge a transit segment attribute file, keyed on `line`, `inode`,
/// `jnode`. Open-ended last segments have no `jnode` and carry no rows.
pub(crate) fn merge_segment_values(
    transit: &mut TransitNetwork,
    path: &Path,
    file: &AttrFile,
) -> Result<(), Error> {
    for def in &file.defs {
        if !transit.segment_defs.iter().any(|d| d.name == def.name) {
            transit.segment_defs.push(def.clone());
        }
    }
    let key = |name: &str| file.header.iter().position(|h| h == name);
    let (Some(line_col), Some(inode), Some(jnode)) = (key("line"), key("inode"), key("jnode"))
    else {
        return Ok(());
    };

    for row in &file.rows {
        if row.tokens.len() != file.header.len() {
            return Err(Error::parse(path, row.line, "wrong column count"));
        }
        let code = row.tokens[line_col].trim().to_string();
        let from: NodeId = row.tokens[inode]
            .parse()
            .map_err(|_| Error::parse(path, row.line, "bad inode"))?;
        let to: NodeId = row.tokens[jnode]
            .parse()
            .map_err(|_| Error::parse(path, row.line, "bad jnode"))?;
        let values: Vec<(String, AttrValue)> = file
            .header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != line_col && i != inode && i != jnode)
            .map(|(i, name)| {
                let def = find_def(&file.defs, name);
                Ok((
                    name.clone(),
                    parse_value(path, row, &row.tokens[i], def)?,
                ))
            })
            .collect::<Result<_, Error>>()?;
        if let Some(segment) = transit
            .segments
            .iter_mut()
            .find(|s| s.line == code && s.node == from && s.to == Some(to))
        {
            segment.extra.extend(values);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Crs;
    use crate::model::network::tests::{link, node};

    #[test]
    fn extra_declaration_parses_default_and_label() {
        let row = Row {
            line: 2,
            tokens: vec![
                "@pyoratieluokka".into(),
                "LINK".into(),
                "0.0".into(),
                "pyoratieluokka".into(),
            ],
        };
        let def = parse_def(Path::new("x.txt"), &row, false).unwrap();
        assert_eq!(def.owner, OwnerKind::Link);
        assert_eq!(def.kind, ValueKind::Real);
        assert_eq!(def.label, "pyoratieluokka");
    }

    #[test]
    fn netfield_declaration_parses_kind() {
        let row = Row {
            line: 2,
            tokens: vec!["#linkkityyppi".into(), "LINK".into(), "STRING".into()],
        };
        let def = parse_def(Path::new("x.txt"), &row, true).unwrap();
        assert_eq!(def.kind, ValueKind::Text);
        assert_eq!(def.label, "");
    }

    fn transit_fixture() -> TransitNetwork {
        use crate::model::{AttrMap, SegmentFields, TransitLine, TransitSegment};
        TransitNetwork {
            lines: vec![TransitLine {
                code: "1001A1".to_string(),
                direction: '1',
                mode: "b".to_string(),
                vehicle: 1,
                headway: 10.0,
                speed: 35.0,
                description: "test".to_string(),
                data: [0.0; 3],
                headways: None,
                extra: AttrMap::new(),
            }],
            segments: vec![
                TransitSegment {
                    line: "1001A1".to_string(),
                    node: 101,
                    to: Some(102),
                    key: "dwt".to_string(),
                    dwell: "+0.01".to_string(),
                    fields: Some(SegmentFields {
                        ttf: "1".into(),
                        us1: "0".into(),
                        us2: "0".into(),
                        us3: "0".into(),
                    }),
                    extra: AttrMap::new(),
                },
                TransitSegment {
                    line: "1001A1".to_string(),
                    node: 102,
                    to: None,
                    key: "lay".to_string(),
                    dwell: "0".to_string(),
                    fields: None,
                    extra: AttrMap::new(),
                },
            ],
            line_defs: vec![],
            segment_defs: vec![],
        }
    }

    #[test]
    fn line_values_merge_by_quoted_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netfield_transit_lines_1.txt");
        fs::write(
            &path,
            "t network_fields\n\
             #operaattori TRANSIT_LINE STRING 'operaattori'\n\
             end network_fields\n\
             line      #operaattori\n\
             '1001A1'  'HSL'\n\
             '9999Z1'  'none'\n",
        )
        .unwrap();
        let mut transit = transit_fixture();
        let file = read_attr_file(&path).unwrap();
        merge_line_values(&mut transit, &path, &file).unwrap();
        assert_eq!(
            transit.lines[0].extra.get("#operaattori"),
            Some(&AttrValue::Text("HSL".to_string()))
        );
        assert!(transit.line_defs.iter().any(|d| d.name == "#operaattori"));
    }

    #[test]
    fn segment_values_merge_by_line_and_node_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netfield_segments_1.txt");
        fs::write(
            &path,
            "t network_fields\n\
             #pysakkitunnus TRANSIT_SEGMENT INTEGER32 'pysakkitunnus'\n\
             end network_fields\n\
             line      inode  jnode  #pysakkitunnus\n\
             '1001A1'  101    102    7\n",
        )
        .unwrap();
        let mut transit = transit_fixture();
        let file = read_attr_file(&path).unwrap();
        merge_segment_values(&mut transit, &path, &file).unwrap();
        assert_eq!(
            transit.segments[0].extra.get("#pysakkitunnus"),
            Some(&AttrValue::Int(7))
        );
        assert!(transit.segments[1].extra.is_empty());
        assert!(
            transit
                .segment_defs
                .iter()
                .any(|d| d.name == "#pysakkitunnus")
        );
    }

    #[test]
    fn link_values_merge_by_node_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra_links_1.txt");
        fs::write(
            &path,
            "t extra_attributes\n\
             @pyoratieluokka LINK 0.0 'pyoratieluokka'\n\
             end extra_attributes\n\
             inode  jnode  @pyoratieluokka\n\
             101    102    2\n",
        )
        .unwrap();
        let nodes = vec![node(101, 0.0, 0.0, false), node(102, 1.0, 0.0, false)];
        let links = vec![link(101, 102, 0.1), link(102, 101, 0.1)];
        let mut network = Network::new(nodes, links, vec![], vec![], Crs::Gk25);
        let file = read_attr_file(&path).unwrap();
        merge_link_values(&mut network, &path, &file).unwrap();
        assert_eq!(
            network.links[0].extra.get("@pyoratieluokka"),
            Some(&AttrValue::Real(2.0))
        );
        assert!(network.links[1].extra.is_empty());
        assert!(network.link_defs.iter().any(|d| d.name == "@pyoratieluokka"));
    }

    #[test]
    fn node_values_merge_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra_nodes_1.txt");
        fs::write(
            &path,
            "t extra_attributes\n\
             @korkeus NODE 0.0 ''\n\
             @hsl NODE 0.0 ''\n\
             end extra_attributes\n\
             Node  @korkeus  @hsl\n\
             101   12.5      1\n",
        )
        .unwrap();
        let nodes = vec![node(101, 0.0, 0.0, false)];
        let links = vec![link(101, 0, 0.0)];
        let mut network = Network::new(nodes, links, vec![], vec![], Crs::Gk25);
        let file = read_attr_file(&path).unwrap();
        merge_node_values(&mut network, &path, &file).unwrap();
        let n = network.node(101).unwrap();
        assert_eq!(n.extra.get("@korkeus"), Some(&AttrValue::Real(12.5)));
        assert_eq!(n.extra.get("@hsl"), Some(&AttrValue::Real(1.0)));
    }
}
