//! Zone data folder and zone polygon readers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use geo::MultiPolygon;
use geojson::GeoJson;
use log::debug;

use crate::error::Error;

use super::{
    BikesRow, EducationRow, LanduseRow, PopulationRow, Sij2019, Sij2023, WorkplaceRow, Zone,
    ZoneData,
};

/// Tab-separated zone table with `#` comment lines. The first column is
/// the zone ID; remaining columns are looked up by header name.
struct ZoneFile {
    header: Vec<String>,
    rows: Vec<(usize, Sij2023, Vec<String>)>,
}

impl ZoneFile {
    fn read(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let mut header = None;
        let mut rows = Vec::new();
        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cells: Vec<String> = line.split('\t').map(str::to_string).collect();
            match &header {
                None => header = Some(cells),
                Some(h) => {
                    if cells.len() != h.len() {
                        return Err(Error::parse(path, i + 1, "wrong column count"));
                    }
                    let id = cells[0].trim().parse().map_err(|_| {
                        Error::parse(path, i + 1, format!("bad zone id '{}'", cells[0]))
                    })?;
                    rows.push((i + 1, Sij2023(id), cells[1..].to_vec()));
                }
            }
        }
        Ok(Self {
            // The ID column header is blank in exported files.
            header: header
                .map(|h| h[1..].to_vec())
                .unwrap_or_default(),
            rows,
        })
    }

    fn column(&self, path: &Path, name: &str) -> Result<usize, Error> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::parse(path, 0, format!("missing column '{name}'")))
    }

    fn value<T: FromStr>(&self, path: &Path, row: usize, col: usize) -> Result<T, Error> {
        let (line, _, cells) = &self.rows[row];
        cells[col].trim().parse().map_err(|_| {
            Error::parse(path, *line, format!("bad value '{}'", cells[col]))
        })
    }
}

fn find_by_extension(dir: &Path, ext: &str) -> Result<std::path::PathBuf, Error> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    paths.sort();
    paths
        .into_iter()
        .next()
        .ok_or_else(|| Error::MissingInput(format!("no *.{ext} file in {}", dir.display())))
}

pub(crate) fn read_landuse(path: &Path) -> Result<BTreeMap<Sij2023, LanduseRow>, Error> {
    let file = ZoneFile::read(path)?;
    let builtar = file.column(path, "builtar")?;
    let sportsar = file.column(path, "sportsar")?;
    let detach = file.column(path, "detach")?;
    (0..file.rows.len())
        .map(|i| {
            Ok((
                file.rows[i].1,
                LanduseRow {
                    builtar: file.value(path, i, builtar)?,
                    sportsar: file.value(path, i, sportsar)?,
                    detach: file.value(path, i, detach)?,
                },
            ))
        })
        .collect()
}

pub(crate) fn read_population(path: &Path) -> Result<BTreeMap<Sij2023, PopulationRow>, Error> {
    let file = ZoneFile::read(path)?;
    let total = file.column(path, "total")?;
    let shares = [
        file.column(path, "sh_7-17")?,
        file.column(path, "sh_1829")?,
        file.column(path, "sh_3049")?,
        file.column(path, "sh_5064")?,
        file.column(path, "sh_65-")?,
    ];
    (0..file.rows.len())
        .map(|i| {
            let mut row = PopulationRow {
                total: file.value(path, i, total)?,
                shares: [0.0; 5],
            };
            for (slot, col) in row.shares.iter_mut().zip(shares) {
                *slot = file.value(path, i, col)?;
            }
            Ok((file.rows[i].1, row))
        })
        .collect()
}

pub(crate) fn read_workplace(path: &Path) -> Result<BTreeMap<Sij2023, WorkplaceRow>, Error> {
    let file = ZoneFile::read(path)?;
    let total = file.column(path, "total")?;
    let shares = [
        file.column(path, "sh_serv")?,
        file.column(path, "sh_shop")?,
        file.column(path, "sh_logi")?,
        file.column(path, "sh_indu")?,
    ];
    (0..file.rows.len())
        .map(|i| {
            let mut row = WorkplaceRow {
                total: file.value(path, i, total)?,
                shares: [0.0; 4],
            };
            for (slot, col) in row.shares.iter_mut().zip(shares) {
                *slot = file.value(path, i, col)?;
            }
            Ok((file.rows[i].1, row))
        })
        .collect()
}

pub(crate) fn read_education(path: &Path) -> Result<BTreeMap<Sij2023, EducationRow>, Error> {
    let file = ZoneFile::read(path)?;
    let compreh = file.column(path, "compreh")?;
    let secndry = file.column(path, "secndry")?;
    let tertiary = file.column(path, "tertiary")?;
    (0..file.rows.len())
        .map(|i| {
            Ok((
                file.rows[i].1,
                EducationRow {
                    compreh: file.value(path, i, compreh)?,
                    secndry: file.value(path, i, secndry)?,
                    tertiary: file.value(path, i, tertiary)?,
                },
            ))
        })
        .collect()
}

pub(crate) fn read_bikes(path: &Path) -> Result<BTreeMap<Sij2023, BikesRow>, Error> {
    let file = ZoneFile::read(path)?;
    let distance = file.column(path, "distance")?;
    let rel_capacity = file.column(path, "rel_capacity")?;
    let rel_stations = file.column(path, "rel_stations")?;
    let operator = file.column(path, "operator")?;
    (0..file.rows.len())
        .map(|i| {
            Ok((
                file.rows[i].1,
                BikesRow {
                    distance: file.value(path, i, distance)?,
                    rel_capacity: file.value(path, i, rel_capacity)?,
                    rel_stations: file.value(path, i, rel_stations)?,
                    operator: file.rows[i].2[operator].trim().to_string(),
                },
            ))
        })
        .collect()
}

fn property_i32(feature: &geojson::Feature, key: &str) -> Option<i32> {
    match feature.property(key)? {
        serde_json::Value::Number(n) => n.as_i64().map(|v| v as i32),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn property_string(feature: &geojson::Feature, key: &str) -> String {
    match feature.property(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Read the zone polygons from GeoJSON. Coordinates are taken as-is in
/// the file's projected CRS (EPSG:3879 for the delivered zone sets).
pub(crate) fn read_zones(path: &Path) -> Result<Vec<Zone>, Error> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content
        .parse()
        .map_err(|e| Error::InvalidData(format!("{}: {e}", path.display())))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(Error::InvalidData(format!(
            "{}: expected a FeatureCollection",
            path.display()
        )));
    };

    let mut zones = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let sij2023 = property_i32(feature, "SIJ2023").ok_or_else(|| {
            Error::InvalidData(format!("{}: zone without SIJ2023", path.display()))
        })?;
        let sij2019 = property_i32(feature, "SIJ2019").unwrap_or(sij2023);
        let geometry = feature.geometry.as_ref().ok_or_else(|| {
            Error::InvalidData(format!("{}: zone {sij2023} has no geometry", path.display()))
        })?;
        let geometry: geo::Geometry<f64> = geometry.try_into().map_err(|e| {
            Error::InvalidData(format!("{}: zone {sij2023}: {e}", path.display()))
        })?;
        let polygon: MultiPolygon<f64> = match geometry {
            geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
            geo::Geometry::MultiPolygon(mp) => mp,
            _ => {
                return Err(Error::InvalidData(format!(
                    "{}: zone {sij2023} is not a polygon",
                    path.display()
                )));
            }
        };
        zones.push(Zone {
            sij2023: Sij2023(sij2023),
            sij2019: Sij2019(sij2019),
            kela: property_string(feature, "KELA"),
            parent: property_i32(feature, "parent").map(Sij2023),
            polygon,
        });
    }
    debug!("read {} zones from {}", zones.len(), path.display());
    Ok(zones)
}

/// Read a whole zone data folder plus the zone polygons and remember
/// the land-cover raster location.
pub fn read_zonedata(
    dir: &Path,
    zones_file: &Path,
    landcover_file: &Path,
) -> Result<ZoneData, Error> {
    for required in [zones_file, landcover_file] {
        if !required.exists() {
            return Err(Error::MissingInput(format!(
                "{} does not exist",
                required.display()
            )));
        }
    }
    Ok(ZoneData {
        landuse: read_landuse(&find_by_extension(dir, "lnd")?)?,
        population: read_population(&find_by_extension(dir, "pop")?)?,
        workplace: read_workplace(&find_by_extension(dir, "wrk")?)?,
        education: read_education(&find_by_extension(dir, "edu")?)?,
        bikes: read_bikes(&find_by_extension(dir, "bks")?)?,
        zones: read_zones(zones_file)?,
        landcover: landcover_file.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_table_parses_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2023.pop");
        fs::write(
            &path,
            "# Population 2023\n\
             #\n\
             \ttotal\tsh_7-17\tsh_1829\tsh_3049\tsh_5064\tsh_65-\n\
             101\t1200\t0.12\t0.2\t0.3\t0.2\t0.18\n\
             102\t800\t0.1\t0.25\t0.3\t0.2\t0.15\n",
        )
        .unwrap();
        let pop = read_population(&path).unwrap();
        assert_eq!(pop.len(), 2);
        let row = &pop[&Sij2023(101)];
        assert_eq!(row.total, 1200);
        assert_eq!(row.shares[0], 0.12);
    }

    #[test]
    fn bad_zone_id_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2023.lnd");
        fs::write(
            &path,
            "\tbuiltar\tsportsar\tdetach\nxyz\t1.0\t0.1\t0.5\n",
        )
        .unwrap();
        assert!(matches!(
            read_landuse(&path),
            Err(Error::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn zones_geojson_round_trips_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.geojson");
        fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"SIJ2023":101,"SIJ2019":1,"KELA":"091"},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[100,0],[100,100],[0,100],[0,0]]]}}
            ]}"#,
        )
        .unwrap();
        let zones = read_zones(&path).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].sij2023, Sij2023(101));
        assert_eq!(zones[0].sij2019, Sij2019(1));
        assert_eq!(zones[0].kela, "091");
        assert!(zones[0].parent.is_none());
    }
}
