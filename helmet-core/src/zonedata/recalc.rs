//! Redistribution of zone totals after a split, and the folder writer.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::Error;
use crate::export::format::fmt_g4;

use super::split::AreaChanges;
use super::{
    BikesRow, EducationRow, LanduseRow, PopulationRow, Sij2023, WorkplaceRow, ZoneData,
};

/// Per sub-zone: the parent it was cut from and its share of the
/// parent's built area.
pub(crate) type LanduseShares = BTreeMap<Sij2023, (Sij2023, f64)>;

/// Built-area shares of each sub-zone relative to its parent's original
/// built area. A parent missing from the landuse table means the area
/// changes do not match the zone set.
pub(crate) fn landuse_shares(
    new_landuse: &BTreeMap<Sij2023, LanduseRow>,
    original_landuse: &BTreeMap<Sij2023, LanduseRow>,
    changes: &AreaChanges,
) -> Result<LanduseShares, Error> {
    let mut shares = LanduseShares::new();
    for (parent, children) in changes {
        let original = original_landuse.get(parent).ok_or_else(|| {
            Error::InvalidData(format!(
                "area changes and zones do not match: no landuse row for zone {}",
                parent.0
            ))
        })?;
        for child in children {
            let child_row = new_landuse.get(child).ok_or_else(|| {
                Error::InvalidData(format!(
                    "area changes and zones do not match: no zone polygon for {}",
                    child.0
                ))
            })?;
            let share = if original.builtar > 0.0 {
                child_row.builtar / original.builtar
            } else {
                0.0
            };
            shares.insert(*child, (*parent, share));
        }
    }
    Ok(shares)
}

/// Copy the parent's detached-house share onto every sub-zone and keep
/// the original value everywhere else.
pub(crate) fn fill_detach(
    landuse: &mut BTreeMap<Sij2023, LanduseRow>,
    original: &BTreeMap<Sij2023, LanduseRow>,
    shares: &LanduseShares,
) {
    for (id, row) in landuse.iter_mut() {
        let source = shares.get(id).map_or(*id, |(parent, _)| *parent);
        if let Some(orig) = original.get(&source) {
            row.detach = orig.detach;
        }
    }
}

pub(crate) fn redistribute_population(
    original: &BTreeMap<Sij2023, PopulationRow>,
    shares: &LanduseShares,
) -> BTreeMap<Sij2023, PopulationRow> {
    let mut out = original.clone();
    for (id, (parent, share)) in shares {
        let Some(source) = original.get(parent) else {
            warn!("no population row for parent zone {}", parent.0);
            continue;
        };
        out.insert(
            *id,
            PopulationRow {
                total: (source.total as f64 * share).round() as i64,
                shares: source.shares,
            },
        );
    }
    out
}

pub(crate) fn redistribute_workplace(
    original: &BTreeMap<Sij2023, WorkplaceRow>,
    shares: &LanduseShares,
) -> BTreeMap<Sij2023, WorkplaceRow> {
    let mut out = original.clone();
    for (id, (parent, share)) in shares {
        let Some(source) = original.get(parent) else {
            warn!("no workplace row for parent zone {}", parent.0);
            continue;
        };
        out.insert(
            *id,
            WorkplaceRow {
                total: (source.total as f64 * share).round() as i64,
                shares: source.shares,
            },
        );
    }
    out
}

pub(crate) fn redistribute_education(
    original: &BTreeMap<Sij2023, EducationRow>,
    shares: &LanduseShares,
) -> BTreeMap<Sij2023, EducationRow> {
    let mut out = original.clone();
    for (id, (parent, share)) in shares {
        let Some(source) = original.get(parent) else {
            warn!("no education row for parent zone {}", parent.0);
            continue;
        };
        let scale = |count: i64| (count as f64 * share).round() as i64;
        out.insert(
            *id,
            EducationRow {
                compreh: scale(source.compreh),
                secndry: scale(source.secndry),
                tertiary: scale(source.tertiary),
            },
        );
    }
    out
}

/// Share-bike figures are not redistributable from land use, so only
/// the parent keeps its station figures; sub-zones get zeros.
pub(crate) fn redistribute_bikes(
    original: &BTreeMap<Sij2023, BikesRow>,
    shares: &LanduseShares,
) -> BTreeMap<Sij2023, BikesRow> {
    let mut out = original.clone();
    for (id, (parent, _)) in shares {
        let Some(source) = original.get(parent) else {
            warn!("no share-bike row for parent zone {}", parent.0);
            continue;
        };
        let keeps_stations = id == parent;
        out.insert(
            *id,
            BikesRow {
                distance: source.distance,
                rel_capacity: if keeps_stations { source.rel_capacity } else { 0.0 },
                rel_stations: if keeps_stations { source.rel_stations } else { 0.0 },
                operator: source.operator.clone(),
            },
        );
    }
    out
}

fn write_table<R>(
    path: &Path,
    comment: &str,
    columns: &[&str],
    rows: &BTreeMap<Sij2023, R>,
    mut cells: impl FnMut(&R) -> Vec<String>,
) -> Result<(), Error> {
    let mut content = String::from(comment);
    content.push('\t');
    content.push_str(&columns.join("\t"));
    content.push('\n');
    for (id, row) in rows {
        let _ = write!(content, "{}", id.0);
        for cell in cells(row) {
            let _ = write!(content, "\t{cell}");
        }
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// Write the recalculated tables into `out_dir` as
/// `<year>.lnd/.pop/.wrk/.edu/.bks` with the published comment headers.
pub(crate) fn write_zonedata_folder(
    data: &ZoneData,
    year: i32,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, Error> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    let path = out_dir.join(format!("{year}.lnd"));
    write_table(
        &path,
        "# Land use 2023\n#\n\
         # builtar: area of built environment\n\
         # sportsar: area of sports or leisure facilities, currently not used in Helmet 5.0\n\
         # detach: detached houses as share of total number of houses\n#\n",
        &["builtar", "sportsar", "detach"],
        &data.landuse,
        |r| vec![fmt_g4(r.builtar), fmt_g4(r.sportsar), fmt_g4(r.detach)],
    )?;
    written.push(path);

    let path = out_dir.join(format!("{year}.pop"));
    write_table(
        &path,
        "# Population 2023\n#\n\
         # total: total number of residents in zone\n\
         # sh_7-17: share of population aged 7-17\n\
         # sh_1829: share of population aged 18-29\n\
         # sh_3049: share of population aged 30-49\n\
         # sh_5064: share of population aged 50-64\n\
         # sh_65-: share of population aged over 65\n#\n",
        &["total", "sh_7-17", "sh_1829", "sh_3049", "sh_5064", "sh_65-"],
        &data.population,
        |r| {
            let mut cells = vec![r.total.to_string()];
            cells.extend(r.shares.iter().map(|s| fmt_g4(*s)));
            cells
        },
    )?;
    written.push(path);

    let path = out_dir.join(format!("{year}.wrk"));
    write_table(
        &path,
        "# Workplaces 2022\n#\n\
         # total: total number of workplaces in zone\n\
         # sh_serv: service workplaces as share of total number of workplaces\n\
         # sh_shop: retail workplaces as share of total number of workplaces\n\
         # sh_logi: logistics workplaces as share of total number of workplaces\n\
         # sh_indu: industry workplaces as share of total number of workplaces\n#\n",
        &["total", "sh_serv", "sh_shop", "sh_logi", "sh_indu"],
        &data.workplace,
        |r| {
            let mut cells = vec![r.total.to_string()];
            cells.extend(r.shares.iter().map(|s| fmt_g4(*s)));
            cells
        },
    )?;
    written.push(path);

    let path = out_dir.join(format!("{year}.edu"));
    write_table(
        &path,
        "# Schools 2023\n#\n\
         # compreh: Students in comprehensive school (1-9)\n\
         # secndry: Students in upper secondary education (gymnasium, vocational)\n\
         # tertiary: Students in tertiary education (university, college, polytechnic)\n#\n",
        &["compreh", "secndry", "tertiary"],
        &data.education,
        |r| {
            vec![
                r.compreh.to_string(),
                r.secndry.to_string(),
                r.tertiary.to_string(),
            ]
        },
    )?;
    written.push(path);

    let path = out_dir.join(format!("{year}.bks"));
    write_table(
        &path,
        "# Sharebikes 2023\n\
         # rel_capacity: total capacity at stations / zone area\n\
         # rel_stations: number of stations / zone_area\n\
         # operator: operator city or region\n\
         # HE: Helsinki-Espoo\n# VA: Vantaa\n# PO: Porvoo\n# LA: Lahti\n#\n",
        &["distance", "rel_capacity", "rel_stations", "operator"],
        &data.bikes,
        |r| {
            vec![
                fmt_g4(r.distance),
                fmt_g4(r.rel_capacity),
                fmt_g4(r.rel_stations),
                r.operator.clone(),
            ]
        },
    )?;
    written.push(path);

    info!("wrote {} zone data files to {}", written.len(), out_dir.display());
    Ok(written)
}
