//! Line scanner for the transaction files.
//!
//! The files interleave comment headers, `t <marker>` table markers,
//! declaration blocks and whitespace-tokenized tables. The scanner is an
//! explicit state machine so that a stray marker or a malformed row
//! fails loudly with the offending line number instead of being silently
//! folded into the previous table.

use std::path::Path;

use crate::error::Error;
use crate::model::ScenarioMeta;

/// One tokenized data row with its 1-based source line number.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub line: usize,
    pub tokens: Vec<String>,
}

/// A parsed table: marker (empty for the implicit value table that
/// follows a declaration block), column header and data rows.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub marker: String,
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Default)]
pub(crate) struct Sections {
    pub meta: ScenarioMeta,
    /// Rows of the `t extra_attributes` block.
    pub extra_defs: Vec<Row>,
    /// Rows of the `t network_fields` block.
    pub netfield_defs: Vec<Row>,
    pub tables: Vec<Table>,
}

impl Sections {
    pub fn table(&self, marker: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.marker == marker)
    }
}

enum State {
    Idle,
    Declarations { netfields: bool },
    AwaitHeader { marker: String },
    InTable,
}

/// Tokenize on whitespace, treating a single-quoted span as one token
/// with the quotes stripped. Quoted content is kept verbatim, padding
/// included.
pub(crate) fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '\'' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn scan_meta(meta: &mut ScenarioMeta, comment: &str) {
    if let Some(rest) = comment.split("Project:").nth(1) {
        meta.project_name = rest.trim().to_string();
    } else if let Some(rest) = comment.split("Scenario").nth(1)
        && let Some((number, name)) = rest.split_once(':')
    {
        meta.scenario_number = number.trim().to_string();
        meta.scenario_name = name.trim().to_string();
    }
}

/// Scan a transaction file into metadata, declaration rows and tables.
pub(crate) fn parse_sections(file: &Path, content: &str) -> Result<Sections, Error> {
    let mut out = Sections::default();
    let mut state = State::Idle;

    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(marker) = line.strip_prefix("t ") {
            let marker = marker.trim();
            state = match marker {
                "extra_attributes" => State::Declarations { netfields: false },
                "network_fields" => State::Declarations { netfields: true },
                _ => State::AwaitHeader {
                    marker: marker.to_string(),
                },
            };
            continue;
        }
        if let Some(closed) = line.strip_prefix("end ") {
            match (&state, closed.trim()) {
                (State::Declarations { .. }, "extra_attributes" | "network_fields") => {
                    // A value table without its own marker may follow.
                    state = State::AwaitHeader {
                        marker: String::new(),
                    };
                }
                _ => {
                    return Err(Error::parse(
                        file,
                        line_no,
                        format!("unexpected block terminator '{line}'"),
                    ));
                }
            }
            continue;
        }

        match &mut state {
            State::Idle => {
                if line == "c" || line.starts_with("c ") {
                    scan_meta(&mut out.meta, line);
                } else {
                    return Err(Error::parse(
                        file,
                        line_no,
                        format!("data row outside any table: '{line}'"),
                    ));
                }
            }
            State::Declarations { netfields } => {
                let row = Row {
                    line: line_no,
                    tokens: tokenize(line),
                };
                if *netfields {
                    out.netfield_defs.push(row);
                } else {
                    out.extra_defs.push(row);
                }
            }
            State::AwaitHeader { marker } => {
                out.tables.push(Table {
                    marker: std::mem::take(marker),
                    header: tokenize(line),
                    rows: Vec::new(),
                });
                state = State::InTable;
            }
            State::InTable => {
                if line == "c" || line.starts_with("c ") {
                    continue;
                }
                let table = out
                    .tables
                    .last_mut()
                    .ok_or_else(|| Error::parse(file, line_no, "row before any table"))?;
                table.rows.push(Row {
                    line: line_no,
                    tokens: tokenize(line),
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file() -> PathBuf {
        PathBuf::from("test.txt")
    }

    #[test]
    fn metadata_comes_from_comment_header() {
        let content = "c Modeller - Base Network Transaction\n\
                       c Date: 2025-01-01 12:00:00\n\
                       c Project: helsinki\n\
                       c Scenario 21: baseline\n\
                       t nodes\n\
                       c Node\n\
                       a 101\n";
        let sections = parse_sections(&file(), content).unwrap();
        assert_eq!(sections.meta.project_name, "helsinki");
        assert_eq!(sections.meta.scenario_number, "21");
        assert_eq!(sections.meta.scenario_name, "baseline");
        let table = sections.table("nodes").unwrap();
        assert_eq!(table.header, vec!["c", "Node"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].line, 7);
    }

    #[test]
    fn declaration_block_precedes_implicit_table() {
        let content = "t extra_attributes\n\
                       @pyoratieluokka LINK 0.0 'pyoratieluokka'\n\
                       end extra_attributes\n\
                       inode jnode @pyoratieluokka\n\
                       101 102 2\n";
        let sections = parse_sections(&file(), content).unwrap();
        assert_eq!(sections.extra_defs.len(), 1);
        assert_eq!(
            sections.extra_defs[0].tokens,
            vec!["@pyoratieluokka", "LINK", "0.0", "pyoratieluokka"]
        );
        let table = sections.table("").unwrap();
        assert_eq!(table.rows[0].tokens, vec!["101", "102", "2"]);
    }

    #[test]
    fn stray_terminator_is_an_error() {
        let err = parse_sections(&file(), "end extra_attributes\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn quoted_tokens_keep_padding() {
        assert_eq!(
            tokenize("'1001  '    5   10  7.5"),
            vec!["1001  ", "5", "10", "7.5"]
        );
        assert_eq!(
            tokenize("@hw_aht TRANSIT_LINE 0.0 ''"),
            vec!["@hw_aht", "TRANSIT_LINE", "0.0"]
        );
    }
}
