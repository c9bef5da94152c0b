//! Splitting zones around centroids added to the network.

use std::collections::BTreeMap;

use geo::{Contains, Coord, Point};
use log::info;

use crate::error::Error;
use crate::model::{Network, NodeId, NodeView};

use super::voronoi::voronoi_cells;
use super::{Sij2023, Zone};

/// Station centroids live in this node range and never seed a split.
const STATION_RANGE: std::ops::RangeInclusive<NodeId> = 34000..=35999;

/// Map from parent zone to the sub-zone IDs it splits into. The
/// parent's own ID is always among the children.
pub type AreaChanges = BTreeMap<Sij2023, Vec<Sij2023>>;

fn area_centroids(network: &Network) -> Vec<NodeView> {
    network
        .centroids()
        .into_iter()
        .filter(|c| !STATION_RANGE.contains(&c.id))
        .collect()
}

/// Zones containing a centroid whose node ID is not the zone's own ID.
/// The returned seed lists end with the zone's own ID.
fn zones_to_split(zones: &[Zone], centroids: &[NodeView]) -> BTreeMap<Sij2023, Vec<NodeId>> {
    let mut out = BTreeMap::new();
    for zone in zones {
        let matched: Vec<NodeId> = centroids
            .iter()
            .filter(|c| {
                c.id != zone.sij2023.0 && zone.polygon.contains(&Point::from(c.coord))
            })
            .map(|c| c.id)
            .collect();
        if !matched.is_empty() {
            let mut seeds = matched;
            seeds.push(zone.sij2023.0);
            out.insert(zone.sij2023, seeds);
        }
    }
    out
}

/// Reject a second split of an already-split zone set: either a zone
/// carries split provenance or a seed centroid is already a zone of its
/// own.
fn check_not_already_split(
    zones: &[Zone],
    to_split: &BTreeMap<Sij2023, Vec<NodeId>>,
) -> Result<(), Error> {
    if let Some(zone) = zones.iter().find(|z| z.parent.is_some()) {
        return Err(Error::AlreadySplit(format!(
            "zone {} already carries split provenance (parent {})",
            zone.sij2023.0,
            zone.parent.map(|p| p.0).unwrap_or_default()
        )));
    }
    for (parent, seeds) in to_split {
        for &seed in seeds {
            if seed != parent.0 && zones.iter().any(|z| z.sij2023.0 == seed) {
                return Err(Error::AlreadySplit(format!(
                    "centroid {seed} in zone {} is already a zone of its own",
                    parent.0
                )));
            }
        }
    }
    Ok(())
}

/// Split zones around the centroids added to the network. Returns the
/// new zone set (untouched zones first, sub-zones appended) and the
/// parent-to-children map for redistribution.
pub fn split_zones_by_network(
    zones: &[Zone],
    network: &Network,
) -> Result<(Vec<Zone>, AreaChanges), Error> {
    let centroids = area_centroids(network);
    let to_split = zones_to_split(zones, &centroids);
    check_not_already_split(zones, &to_split)?;
    if to_split.is_empty() {
        info!("no zones to split");
        return Ok((zones.to_vec(), AreaChanges::new()));
    }
    info!(
        "splitting {} zones: {:?}",
        to_split.len(),
        to_split.keys().map(|z| z.0).collect::<Vec<_>>()
    );

    let centroid_coord = |id: NodeId| -> Result<Coord<f64>, Error> {
        centroids
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.coord)
            .ok_or_else(|| {
                Error::InvalidData(format!("zone {id} has no centroid node in the network"))
            })
    };

    let mut result: Vec<Zone> = zones
        .iter()
        .filter(|z| !to_split.contains_key(&z.sij2023))
        .cloned()
        .collect();
    let mut changes = AreaChanges::new();

    for (parent_id, seeds) in &to_split {
        let parent = zones
            .iter()
            .find(|z| z.sij2023 == *parent_id)
            .ok_or_else(|| Error::InvalidData(format!("zone {} vanished", parent_id.0)))?;
        let coords = seeds
            .iter()
            .map(|&id| centroid_coord(id))
            .collect::<Result<Vec<_>, _>>()?;
        let cells = voronoi_cells(&parent.polygon, &coords);
        let mut children = Vec::with_capacity(seeds.len());
        for (&seed, cell) in seeds.iter().zip(cells) {
            if cell.0.is_empty() {
                continue;
            }
            children.push(Sij2023(seed));
            result.push(Zone {
                sij2023: Sij2023(seed),
                sij2019: parent.sij2019,
                kela: parent.kela.clone(),
                parent: Some(*parent_id),
                polygon: cell,
            });
        }
        changes.insert(*parent_id, children);
    }
    Ok((result, changes))
}
