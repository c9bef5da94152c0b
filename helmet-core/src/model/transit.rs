//! Transit lines and their segment paths.

use super::attributes::AttributeDef;
use super::network::NodeId;
use crate::error::Error;

/// Time-of-day headways from the extra transit lines file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Headways {
    pub aht: f64,
    pub pt: f64,
    pub iht: f64,
}

/// A transit line. The code is direction-qualified: its last character
/// is the direction digit.
#[derive(Debug, Clone)]
pub struct TransitLine {
    pub code: String,
    pub direction: char,
    pub mode: String,
    pub vehicle: i32,
    pub headway: f64,
    pub speed: f64,
    pub description: String,
    pub data: [f64; 3],
    pub headways: Option<Headways>,
    pub extra: crate::model::network::AttrMap,
}

/// Itinerary fields of a regular (non-layover) segment row. Values are
/// kept as the raw tokens so re-export is lossless.
#[derive(Debug, Clone)]
pub struct SegmentFields {
    pub ttf: String,
    pub us1: String,
    pub us2: String,
    pub us3: String,
}

/// One hop of a line's route. The last segment of a line has no
/// destination (`to == None`).
#[derive(Debug, Clone)]
pub struct TransitSegment {
    pub line: String,
    pub node: NodeId,
    pub to: Option<NodeId>,
    /// Key of the first itinerary token, `dwt` or `lay`.
    pub key: String,
    /// Raw dwell/layover value, e.g. `+0.01` or `#0`.
    pub dwell: String,
    /// `None` on layover rows.
    pub fields: Option<SegmentFields>,
    pub extra: crate::model::network::AttrMap,
}

impl TransitSegment {
    pub fn is_stop_marker(&self) -> bool {
        self.dwell == "+0.01"
    }
}

/// The transit side of a scenario.
#[derive(Debug, Clone, Default)]
pub struct TransitNetwork {
    pub lines: Vec<TransitLine>,
    /// Segments grouped by line, in file order.
    pub segments: Vec<TransitSegment>,
    pub line_defs: Vec<AttributeDef>,
    pub segment_defs: Vec<AttributeDef>,
}

impl TransitNetwork {
    pub fn line(&self, code: &str) -> Option<&TransitLine> {
        self.lines.iter().find(|l| l.code == code)
    }

    pub fn segments_of<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a TransitSegment> {
        self.segments.iter().filter(move |s| s.line == code)
    }

    /// Stop nodes of a line: the first node of the route plus every node
    /// following a `dwt=+0.01` row.
    pub fn stops_of(&self, code: &str) -> Vec<NodeId> {
        let mut stops = Vec::new();
        let mut stop_flag = false;
        for (i, segment) in self.segments_of(code).enumerate() {
            if i == 0 || stop_flag {
                stops.push(segment.node);
            }
            stop_flag = segment.is_stop_marker();
        }
        stops
    }

    /// Overwrite the time-of-day headways on the named lines. A missing
    /// component keeps the line's current value.
    pub fn set_headways(
        &mut self,
        codes: &[&str],
        aht: Option<f64>,
        pt: Option<f64>,
        iht: Option<f64>,
    ) {
        for line in self.lines.iter_mut().filter(|l| codes.contains(&l.code.as_str())) {
            let current = line.headways.unwrap_or(Headways {
                aht: line.headway,
                pt: line.headway,
                iht: line.headway,
            });
            line.headways = Some(Headways {
                aht: aht.unwrap_or(current.aht),
                pt: pt.unwrap_or(current.pt),
                iht: iht.unwrap_or(current.iht),
            });
        }
    }

    /// Segments of each line must form a connected path and only the
    /// last segment may be open-ended.
    pub fn validate_paths(&self) -> Result<(), Error> {
        for line in &self.lines {
            let segments: Vec<&TransitSegment> = self.segments_of(&line.code).collect();
            for window in segments.windows(2) {
                match window[0].to {
                    Some(to) if to == window[1].node => {}
                    Some(to) => {
                        return Err(Error::InvalidData(format!(
                            "line {}: segment {} -> {} does not reach next segment at {}",
                            line.code, window[0].node, to, window[1].node
                        )));
                    }
                    None => {
                        return Err(Error::InvalidData(format!(
                            "line {}: open-ended segment at {} is not last",
                            line.code, window[0].node
                        )));
                    }
                }
            }
            if let Some(last) = segments.last()
                && last.to.is_some()
            {
                return Err(Error::InvalidData(format!(
                    "line {}: last segment must be open-ended",
                    line.code
                )));
            }
        }
        Ok(())
    }
}
