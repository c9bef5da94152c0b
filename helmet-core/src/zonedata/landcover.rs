//! Zonal statistics on the Corine land-cover raster.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use geo::{Area, BoundingRect, Contains, MapCoords, MultiPolygon, Point};
use hashbrown::HashMap;
use log::info;

use crate::error::Error;
use crate::height::raster::Raster;
use crate::model::{Crs, crs::reproject};

use super::{LanduseRow, Sij2023, Zone};

/// One Corine cell is 20 m x 20 m; counts scale to km^2.
const AREA_MULTIPLIER: f64 = 400.0 * 0.000001;

/// Corine class groups. The classification changed between the 2012
/// and 2018 deliveries, so the groups are year-dependent.
struct ClassGroups {
    built: &'static [i32],
    water: &'static [i32],
    sports: i32,
}

fn class_groups(year: i32) -> ClassGroups {
    if year >= 2018 {
        ClassGroups {
            built: &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 14, 15, 16],
            water: &[47, 48, 49],
            sports: 14,
        }
    } else {
        ClassGroups {
            built: &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
            water: &[46, 47, 48],
            sports: 13,
        }
    }
}

/// Count raster cells per class whose center falls inside the polygon.
fn cell_counts(raster: &Raster, polygon: &MultiPolygon<f64>) -> HashMap<i32, usize> {
    let mut counts = HashMap::new();
    let Some(bounds) = polygon.bounding_rect() else {
        return counts;
    };
    let (rows, cols) = raster.window(
        (bounds.min().x, bounds.min().y),
        (bounds.max().x, bounds.max().y),
    );
    for row in rows {
        for col in cols.clone() {
            let (x, y) = raster.cell_center(row, col);
            if polygon.contains(&Point::new(x, y)) {
                let class = raster.value(row, col);
                if class.is_finite() {
                    *counts.entry(class as i32).or_insert(0) += 1;
                }
            }
        }
    }
    counts
}

fn group_area(counts: &HashMap<i32, usize>, classes: &[i32]) -> f64 {
    classes
        .iter()
        .map(|c| counts.get(c).copied().unwrap_or(0) as f64)
        .sum::<f64>()
        * AREA_MULTIPLIER
}

/// Land-use metrics per zone from the land-cover raster. The raster is
/// in TM35FIN, so zone polygons are reprojected for the overlay.
/// `builtar` is clamped to the zone's land area (zone area less water).
pub(crate) fn landuse_from_raster(
    zones: &[Zone],
    landcover: &Path,
    year: i32,
    zone_crs: Crs,
) -> Result<BTreeMap<Sij2023, LanduseRow>, Error> {
    let bytes = fs::read(landcover)?;
    let raster = Raster::decode(&bytes)?;
    let groups = class_groups(year);
    info!("computing zonal statistics for {} zones", zones.len());

    let mut out = BTreeMap::new();
    for zone in zones {
        let polygon = if zone_crs == Crs::Tm35Fin {
            zone.polygon.clone()
        } else {
            zone.polygon
                .map_coords(|c| reproject(c, zone_crs, Crs::Tm35Fin))
        };
        let counts = cell_counts(&raster, &polygon);
        let area_km2 = polygon.unsigned_area() * 1e-6;
        let water = group_area(&counts, groups.water);
        let land_area = area_km2 - water;
        let builtar = group_area(&counts, groups.built).min(land_area);
        let sportsar = counts.get(&groups.sports).copied().unwrap_or(0) as f64 * AREA_MULTIPLIER;
        out.insert(
            zone.sij2023,
            LanduseRow {
                builtar,
                sportsar,
                // Caller fills the detached-house share from the
                // existing landuse table.
                detach: 0.0,
            },
        );
    }
    Ok(out)
}
