//! Transit transaction writers.

use std::fs;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::model::{AttrValue, AttributeDef, ScenarioMeta, TransitNetwork};

use super::format::{fmt_g, fmt_num, tabulate_right};
use super::header_block;

/// Write `transit_lines_<n>.txt`: one record per line with its segment
/// rows, delimited by the quoted-code trailer.
pub fn write_transit_lines(
    transit: &TransitNetwork,
    meta: &ScenarioMeta,
    timestamp: &str,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let mut content = header_block("Transit Line", meta, timestamp);
    content.push_str("t lines\n");
    for line in &transit.lines {
        let _ = writeln!(
            content,
            "a'{:<6}' {} {} {} {} '{}' {} {} {}",
            line.code,
            line.mode,
            line.vehicle,
            fmt_num(line.headway),
            fmt_num(line.speed),
            line.description,
            fmt_num(line.data[0]),
            fmt_num(line.data[1]),
            fmt_num(line.data[2]),
        );
        content.push_str(" path=no\n");
        for segment in transit.segments_of(&line.code) {
            match &segment.fields {
                Some(f) => {
                    let _ = writeln!(
                        content,
                        "  {} {}={} ttf={} us1={} us2={} us3={}",
                        segment.node, segment.key, segment.dwell, f.ttf, f.us1, f.us2, f.us3
                    );
                }
                None => {
                    let _ = writeln!(content, "  {} {}={}", segment.node, segment.key, segment.dwell);
                }
            }
        }
        let _ = writeln!(content, "c '{}'", line.code);
    }

    let path = out_dir.join(format!("transit_lines_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}

/// Write `extra_transit_lines_<n>.txt`: quoted left-padded line codes
/// with the time-of-day headway columns.
pub fn write_extra_transit_lines(
    transit: &TransitNetwork,
    meta: &ScenarioMeta,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let defs: Vec<&AttributeDef> = transit
        .line_defs
        .iter()
        .filter(|d| d.name.starts_with('@'))
        .collect();

    let mut content = String::from("t extra_attributes\n");
    for def in &defs {
        let default = match &def.default {
            AttrValue::Real(v) => format!("{v:?}"),
            other => other.to_string(),
        };
        let _ = writeln!(
            content,
            "{} {} {} '{}'",
            def.name,
            def.owner.as_str(),
            default,
            def.label
        );
    }
    content.push_str("end extra_attributes\n");

    let mut headers = vec!["line".to_string()];
    headers.extend(defs.iter().map(|d| d.name.clone()));
    let rows: Vec<Vec<String>> = transit
        .lines
        .iter()
        .map(|line| {
            let mut row = vec![format!("'{:<6}'", line.code)];
            for def in &defs {
                let value = match (def.name.as_str(), line.headways) {
                    ("@hw_aht", Some(hw)) => hw.aht,
                    ("@hw_pt", Some(hw)) => hw.pt,
                    ("@hw_iht", Some(hw)) => hw.iht,
                    ("@hw_aht" | "@hw_pt" | "@hw_iht", None) => line.headway,
                    _ => line
                        .extra
                        .get(&def.name)
                        .and_then(AttrValue::as_f64)
                        .or_else(|| def.default.as_f64())
                        .unwrap_or(0.0),
                };
                row.push(fmt_g(value));
            }
            row
        })
        .collect();
    content.push_str(&tabulate_right(&headers, &rows));
    content.push('\n');

    let path = out_dir.join(format!(
        "extra_transit_lines_{}.txt",
        meta.scenario_number
    ));
    fs::write(&path, content)?;
    Ok(path)
}

/// Write `netfield_transit_lines_<n>.txt` for the `#` line fields.
pub fn write_netfield_transit_lines(
    transit: &TransitNetwork,
    meta: &ScenarioMeta,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let defs: Vec<&AttributeDef> = transit
        .line_defs
        .iter()
        .filter(|d| d.name.starts_with('#'))
        .collect();

    let mut content = String::from("t network_fields\n");
    for def in &defs {
        let _ = writeln!(
            content,
            "{} {} {} '{}'",
            def.name,
            def.owner.as_str(),
            def.kind.as_str(),
            def.label
        );
    }
    content.push_str("end network_fields\n");

    let mut headers = vec!["line".to_string()];
    headers.extend(defs.iter().map(|d| d.name.clone()));
    let rows: Vec<Vec<String>> = transit
        .lines
        .iter()
        .map(|line| {
            let mut row = vec![format!("'{:<6}'", line.code)];
            for def in &defs {
                let value = line.extra.get(&def.name).unwrap_or(&def.default);
                row.push(match value {
                    AttrValue::Real(v) => fmt_g(*v),
                    AttrValue::Int(v) => v.to_string(),
                    AttrValue::Text(v) => format!("'{v}'"),
                });
            }
            row
        })
        .collect();
    content.push_str(&tabulate_right(&headers, &rows));
    content.push('\n');

    let path = out_dir.join(format!(
        "netfield_transit_lines_{}.txt",
        meta.scenario_number
    ));
    fs::write(&path, content)?;
    Ok(path)
}

/// Write `netfield_segments_<n>.txt` for the `#` segment fields, keyed
/// on line, inode, jnode. Open-ended last segments carry no row.
pub fn write_netfield_segments(
    transit: &TransitNetwork,
    meta: &ScenarioMeta,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let defs: Vec<&AttributeDef> = transit
        .segment_defs
        .iter()
        .filter(|d| d.name.starts_with('#'))
        .collect();

    let mut content = String::from("t network_fields\n");
    for def in &defs {
        let _ = writeln!(
            content,
            "{} {} {} '{}'",
            def.name,
            def.owner.as_str(),
            def.kind.as_str(),
            def.label
        );
    }
    content.push_str("end network_fields\n");

    let mut headers = vec!["line".to_string(), "inode".to_string(), "jnode".to_string()];
    headers.extend(defs.iter().map(|d| d.name.clone()));
    let rows: Vec<Vec<String>> = transit
        .segments
        .iter()
        .filter_map(|segment| {
            let to = segment.to?;
            let mut row = vec![
                format!("'{:<6}'", segment.line),
                segment.node.to_string(),
                to.to_string(),
            ];
            for def in &defs {
                let value = segment.extra.get(&def.name).unwrap_or(&def.default);
                row.push(match value {
                    AttrValue::Real(v) => fmt_g(*v),
                    AttrValue::Int(v) => v.to_string(),
                    AttrValue::Text(v) => format!("'{v}'"),
                });
            }
            Some(row)
        })
        .collect();
    content.push_str(&tabulate_right(&headers, &rows));
    content.push('\n');

    let path = out_dir.join(format!("netfield_segments_{}.txt", meta.scenario_number));
    fs::write(&path, content)?;
    Ok(path)
}
