//! Transit lines and headway file parsing.

use std::fs;
use std::path::Path;

use log::warn;

use crate::error::Error;
use crate::model::{
    AttrMap, AttributeDef, Headways, NodeId, OwnerKind, SegmentFields, TransitLine,
    TransitNetwork, TransitSegment,
};

use super::section::tokenize;

fn parse_line_record(file: &Path, line_no: usize, line: &str) -> Result<TransitLine, Error> {
    let code = line
        .split('\'')
        .nth(1)
        .ok_or_else(|| Error::parse(file, line_no, "unquoted line code"))?
        .trim()
        .to_string();
    let direction = code
        .chars()
        .next_back()
        .ok_or_else(|| Error::parse(file, line_no, "empty line code"))?;

    // a'<code>' <mode> <veh> <headwy> <speed> '<description>' <d1> <d2> <d3>
    let tokens = tokenize(line);
    let [_, mode, vehicle, headway, speed, rest @ ..] = tokens.as_slice() else {
        return Err(Error::parse(file, line_no, "short transit line record"));
    };
    if rest.len() < 4 {
        return Err(Error::parse(file, line_no, "short transit line record"));
    }
    let description = rest[..rest.len() - 3].join(" ");
    let num = |token: &str| {
        token
            .parse::<f64>()
            .map_err(|_| Error::parse(file, line_no, format!("'{token}' is not a number")))
    };
    let data = &rest[rest.len() - 3..];
    Ok(TransitLine {
        code,
        direction,
        mode: mode.clone(),
        vehicle: vehicle
            .parse()
            .map_err(|_| Error::parse(file, line_no, "bad vehicle number"))?,
        headway: num(headway)?,
        speed: num(speed)?,
        description,
        data: [num(&data[0])?, num(&data[1])?, num(&data[2])?],
        headways: None,
        extra: AttrMap::new(),
    })
}

fn parse_segment_row(
    file: &Path,
    line_no: usize,
    code: &str,
    line: &str,
) -> Result<TransitSegment, Error> {
    let tokens = tokenize(line);
    let [node, dwell, fields @ ..] = tokens.as_slice() else {
        return Err(Error::parse(file, line_no, "short segment row"));
    };
    let node: NodeId = node
        .parse()
        .map_err(|_| Error::parse(file, line_no, "bad segment node"))?;
    let (key, dwell) = dwell
        .split_once('=')
        .ok_or_else(|| Error::parse(file, line_no, "segment row without dwt/lay value"))?;

    let item = |prefix: &str| {
        fields
            .iter()
            .find_map(|t| t.strip_prefix(prefix))
            .map(str::to_string)
            .ok_or_else(|| Error::parse(file, line_no, format!("segment row missing {prefix}")))
    };
    let fields = if fields.is_empty() {
        None
    } else {
        Some(SegmentFields {
            ttf: item("ttf=")?,
            us1: item("us1=")?,
            us2: item("us2=")?,
            us3: item("us3=")?,
        })
    };
    Ok(TransitSegment {
        line: code.to_string(),
        node,
        to: None,
        key: key.to_string(),
        dwell: dwell.to_string(),
        fields,
        extra: AttrMap::new(),
    })
}

/// Parse `transit_lines_<n>.txt`. Records run from an `a'<code>'`
/// header through a `path=` marker and segment rows to the `c '<code>'`
/// trailer; the destination of each segment is the next row's node.
pub(crate) fn read_transit_lines(path: &Path) -> Result<TransitNetwork, Error> {
    let content = fs::read_to_string(path)?;
    let mut transit = TransitNetwork::default();
    let mut current: Option<String> = None;
    let mut in_route = false;
    let mut route_start = 0;

    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("a'") {
            transit.lines.push(parse_line_record(path, line_no, line)?);
            current = Some(transit.lines[transit.lines.len() - 1].code.clone());
            in_route = false;
        } else if line.starts_with("path=") {
            if current.is_none() {
                return Err(Error::parse(path, line_no, "path marker outside a record"));
            }
            in_route = true;
            route_start = transit.segments.len();
        } else if line.starts_with("c '") {
            // Link consecutive rows; the last segment stays open-ended.
            for j in route_start..transit.segments.len() {
                transit.segments[j].to = transit
                    .segments
                    .get(j + 1)
                    .map(|next| next.node);
            }
            current = None;
            in_route = false;
        } else if in_route {
            let code = current
                .as_deref()
                .ok_or_else(|| Error::parse(path, line_no, "segment row outside a record"))?;
            transit
                .segments
                .push(parse_segment_row(path, line_no, code, line)?);
        }
    }
    Ok(transit)
}

/// Parse `extra_transit_lines_<n>.txt` and attach the time-of-day
/// headways. Rows carry 3 or 4 value tokens; with 4, the first is a
/// leftover index column and is skipped. Codes without a parsed line
/// are warned about and dropped.
pub(crate) fn read_extra_transit_lines(
    path: &Path,
    transit: &mut TransitNetwork,
) -> Result<(), Error> {
    let content = fs::read_to_string(path)?;
    for name in ["@hw_aht", "@hw_pt", "@hw_iht"] {
        let def = AttributeDef::extra(name, OwnerKind::TransitLine);
        if !transit.line_defs.iter().any(|d| d.name == def.name) {
            transit.line_defs.push(def);
        }
    }

    let mut past_block = false;
    let mut past_header = false;
    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("t extra_attributes") {
            continue;
        }
        if line.starts_with("end extra_attributes") {
            past_block = true;
            continue;
        }
        if !past_block {
            continue;
        }
        if !past_header {
            past_header = true;
            continue;
        }

        let tokens = tokenize(line);
        if tokens.len() < 4 {
            return Err(Error::parse(path, line_no, "short headway row"));
        }
        let code = tokens[0].trim();
        let values = &tokens[tokens.len() - 3..];
        let parse = |token: &str| {
            token
                .parse::<f64>()
                .map_err(|_| Error::parse(path, line_no, format!("bad headway '{token}'")))
        };
        let headways = Headways {
            aht: parse(&values[0])?,
            pt: parse(&values[1])?,
            iht: parse(&values[2])?,
        };
        match transit.lines.iter_mut().find(|l| l.code == code) {
            Some(line) => line.headways = Some(headways),
            None => warn!("headway row for unknown line '{code}'"),
        }
    }
    Ok(())
}
