//! Zone data recalculation after network-driven zone splits.
//!
//! Zones are split where a new centroid was added inside an existing
//! zone, sub-zone land use is measured from the Corine land-cover
//! raster, and the population, workplace, education and share-bike
//! tables are redistributed by built-area share.

mod landcover;
mod reader;
mod recalc;
mod split;
mod voronoi;

pub use reader::read_zonedata;
pub use split::{AreaChanges, split_zones_by_network};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use geo::MultiPolygon;
use log::info;
use serde_json::{Map, Value, json};

use crate::error::Error;
use crate::loading::read_scenario;
use crate::model::Crs;

/// Zone ID of the 2019 zoning. Kept distinct from [`Sij2023`] so the
/// two ID spaces cannot be mixed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sij2019(pub i32);

/// Zone ID of the 2023 zoning, the primary key of all zone tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sij2023(pub i32);

/// One zone polygon with its IDs and split provenance.
#[derive(Debug, Clone)]
pub struct Zone {
    pub sij2023: Sij2023,
    pub sij2019: Sij2019,
    /// Kela municipality code, carried through unparsed.
    pub kela: String,
    /// The zone this one was cut from, if any.
    pub parent: Option<Sij2023>,
    pub polygon: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanduseRow {
    /// Built area in km^2.
    pub builtar: f64,
    /// Sports and leisure area in km^2.
    pub sportsar: f64,
    /// Detached houses as a share of all houses.
    pub detach: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationRow {
    pub total: i64,
    /// Age-group shares: 7-17, 18-29, 30-49, 50-64, 65-.
    pub shares: [f64; 5],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkplaceRow {
    pub total: i64,
    /// Sector shares: services, retail, logistics, industry.
    pub shares: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EducationRow {
    pub compreh: i64,
    pub secndry: i64,
    pub tertiary: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BikesRow {
    pub distance: f64,
    pub rel_capacity: f64,
    pub rel_stations: f64,
    pub operator: String,
}

/// All zone inputs of one model run.
#[derive(Debug, Clone)]
pub struct ZoneData {
    pub landuse: BTreeMap<Sij2023, LanduseRow>,
    pub population: BTreeMap<Sij2023, PopulationRow>,
    pub workplace: BTreeMap<Sij2023, WorkplaceRow>,
    pub education: BTreeMap<Sij2023, EducationRow>,
    pub bikes: BTreeMap<Sij2023, BikesRow>,
    pub zones: Vec<Zone>,
    /// Corine land-cover GeoTIFF in TM35FIN.
    pub landcover: PathBuf,
}

/// How the zone set is modified before recalculation.
#[derive(Debug, Clone)]
pub enum RecalcMode {
    /// Split zones automatically around centroids added to a scenario
    /// network.
    SplitByNetwork { scenario_dir: PathBuf },
    /// The zone file is already cut; the caller names which parent was
    /// split into which sub-zones.
    AreaChanges(AreaChanges),
    /// Only recompute land use from the raster.
    LanduseOnly,
}

#[derive(Debug, Clone)]
pub struct RecalcOptions {
    pub year: i32,
    pub output: PathBuf,
    pub mode: RecalcMode,
}

fn write_split_zones(zones: &[Zone], path: &Path) -> Result<(), Error> {
    let features: Vec<Value> = zones
        .iter()
        .map(|zone| {
            let mut properties = Map::new();
            properties.insert("SIJ2023".to_string(), json!(zone.sij2023.0));
            properties.insert("SIJ_ID".to_string(), json!(zone.sij2023.0));
            properties.insert("SIJ2019".to_string(), json!(zone.sij2019.0));
            properties.insert("KELA".to_string(), json!(zone.kela));
            if let Some(parent) = zone.parent {
                properties.insert("parent".to_string(), json!(parent.0));
            }
            let geometry = geojson::Geometry::new(geojson::Value::from(&zone.polygon));
            json!({
                "type": "Feature",
                "properties": Value::Object(properties),
                "geometry": geometry,
            })
        })
        .collect();
    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    fs::write(path, serde_json::to_string(&collection)?)?;
    Ok(())
}

/// Recalculate a zone data folder. Returns the written file paths.
pub fn recalculate_zonedata(
    data: &ZoneData,
    options: &RecalcOptions,
) -> Result<Vec<PathBuf>, Error> {
    fs::create_dir_all(&options.output)?;
    let (zones, changes) = match &options.mode {
        RecalcMode::SplitByNetwork { scenario_dir } => {
            let scenario = read_scenario(scenario_dir)?;
            let (zones, changes) = split_zones_by_network(&data.zones, &scenario.network)?;
            let path = options.output.join("zones_split.geojson");
            write_split_zones(&zones, &path)?;
            info!("split zone set written to {}", path.display());
            (zones, changes)
        }
        RecalcMode::AreaChanges(changes) => (data.zones.clone(), changes.clone()),
        RecalcMode::LanduseOnly => {
            info!("no area changes given, populations are kept as-is");
            (data.zones.clone(), AreaChanges::new())
        }
    };

    let mut landuse =
        landcover::landuse_from_raster(&zones, &data.landcover, options.year, Crs::Gk25)?;
    let shares = recalc::landuse_shares(&landuse, &data.landuse, &changes)?;
    recalc::fill_detach(&mut landuse, &data.landuse, &shares);

    let result = ZoneData {
        landuse,
        population: recalc::redistribute_population(&data.population, &shares),
        workplace: recalc::redistribute_workplace(&data.workplace, &shares),
        education: recalc::redistribute_education(&data.education, &shares),
        bikes: recalc::redistribute_bikes(&data.bikes, &shares),
        zones,
        landcover: data.landcover.clone(),
    };
    recalc::write_zonedata_folder(&result, options.year, &options.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn split_zone_geojson_carries_provenance() {
        let zones = vec![Zone {
            sij2023: Sij2023(5001),
            sij2019: Sij2019(101),
            kela: "091".to_string(),
            parent: Some(Sij2023(101)),
            polygon: MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
            ]]),
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones_split.geojson");
        write_split_zones(&zones, &path).unwrap();
        let round_trip = reader::read_zones(&path).unwrap();
        assert_eq!(round_trip.len(), 1);
        assert_eq!(round_trip[0].sij2023, Sij2023(5001));
        assert_eq!(round_trip[0].sij2019, Sij2019(101));
        assert_eq!(round_trip[0].parent, Some(Sij2023(101)));
    }
}
