//! Link gradients from node elevations.

use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::Error;
use crate::model::{AttrValue, AttributeDef, Network, NodeId, OwnerKind};

#[derive(Debug, Deserialize)]
struct ElevationFix {
    node: NodeId,
    elevation: f64,
}

/// Apply manual elevation overrides from a `node,elevation` CSV. Fixes
/// for unknown nodes are an input error.
pub fn apply_elevation_fixes(network: &mut Network, path: &Path) -> Result<usize, Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut applied = 0;
    for record in reader.deserialize() {
        let fix: ElevationFix = record?;
        let node = network.node_mut(fix.node).ok_or_else(|| {
            Error::InvalidData(format!("elevation fix for unknown node {}", fix.node))
        })?;
        node.elevation = Some(fix.elevation);
        applied += 1;
    }
    info!("applied {applied} elevation fixes from {}", path.display());
    Ok(applied)
}

/// Write `@korkeus` on nodes and `@korkeus_from` / `@korkeus_to` /
/// `@kaltevuus` on links. The gradient is the elevation drop over the
/// link's planar length in percent; links touching a centroid and
/// orphan rows are forced flat.
pub fn write_gradients(network: &mut Network) {
    for name in ["@kaltevuus", "@korkeus_from", "@korkeus_to"] {
        network.declare_link_attr(AttributeDef::extra(name, OwnerKind::Link));
    }
    network.declare_node_attr(AttributeDef::extra("@korkeus", OwnerKind::Node));
    network.declare_node_attr(AttributeDef::extra("@hsl", OwnerKind::Node));

    let ids: Vec<NodeId> = network.node_ids().collect();
    for id in ids {
        if let Some(node) = network.node_mut(id) {
            let elevation = node.elevation.unwrap_or(0.0);
            node.extra
                .insert("@korkeus".to_string(), AttrValue::Real(elevation));
        }
    }

    let elevation = |network: &Network, id: NodeId| {
        network
            .node(id)
            .and_then(|n| n.elevation)
            .unwrap_or(0.0)
    };

    for i in 0..network.links.len() {
        let link = &network.links[i];
        let from_elev = elevation(network, link.from);
        let (to_elev, gradient);
        if link.is_orphan() {
            to_elev = 0.0;
            gradient = 0.0;
        } else {
            to_elev = elevation(network, link.to);
            let length = network.planar_length(link);
            gradient = if network.is_connector(link) || length == 0.0 {
                0.0
            } else {
                (from_elev - to_elev) / length * 100.0
            };
        }
        let extra = &mut network.links[i].extra;
        extra.insert("@korkeus_from".to_string(), AttrValue::Real(from_elev));
        extra.insert("@korkeus_to".to_string(), AttrValue::Real(to_elev));
        extra.insert("@kaltevuus".to_string(), AttrValue::Real(gradient));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Crs;
    use crate::model::network::tests::{link, node};

    fn sloped_network() -> Network {
        let mut n1 = node(101, 0.0, 0.0, true);
        n1.elevation = Some(0.0);
        let mut n2 = node(102, 100.0, 0.0, false);
        n2.elevation = Some(5.0);
        let mut n3 = node(103, 200.0, 0.0, false);
        n3.elevation = Some(15.0);
        let nodes = vec![n1, n2, n3];
        let links = vec![
            link(101, 102, 0.1),
            link(102, 103, 0.1),
            link(103, 102, 0.1),
            link(103, 0, 0.0),
        ];
        Network::new(nodes, links, vec![], vec![], Crs::Gk25)
    }

    fn gradient_of(network: &Network, from: NodeId, to: NodeId) -> f64 {
        network
            .links
            .iter()
            .find(|l| l.from == from && l.to == to)
            .and_then(|l| l.extra.get("@kaltevuus"))
            .and_then(AttrValue::as_f64)
            .unwrap()
    }

    #[test]
    fn connector_links_stay_flat() {
        let mut network = sloped_network();
        write_gradients(&mut network);
        assert_eq!(gradient_of(&network, 101, 102), 0.0);
    }

    #[test]
    fn gradient_follows_elevation_drop() {
        let mut network = sloped_network();
        write_gradients(&mut network);
        // 5 m to 15 m over 100 m: climbing, so the drop is negative.
        assert_eq!(gradient_of(&network, 102, 103), -10.0);
        assert_eq!(gradient_of(&network, 103, 102), 10.0);
    }

    #[test]
    fn orphan_rows_are_flat_with_zero_to_elevation() {
        let mut network = sloped_network();
        write_gradients(&mut network);
        let orphan = network.links.iter().find(|l| l.is_orphan()).unwrap();
        assert_eq!(orphan.extra.get("@kaltevuus"), Some(&AttrValue::Real(0.0)));
        assert_eq!(
            orphan.extra.get("@korkeus_to"),
            Some(&AttrValue::Real(0.0))
        );
        assert_eq!(
            orphan.extra.get("@korkeus_from"),
            Some(&AttrValue::Real(15.0))
        );
    }

    #[test]
    fn korkeus_lands_on_nodes() {
        let mut network = sloped_network();
        write_gradients(&mut network);
        assert_eq!(
            network.node(102).unwrap().extra.get("@korkeus"),
            Some(&AttrValue::Real(5.0))
        );
    }

    #[test]
    fn elevation_fixes_override_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elevation_fixes.csv");
        std::fs::write(&path, "node,elevation\n102,42.0\n").unwrap();
        let mut network = sloped_network();
        assert_eq!(apply_elevation_fixes(&mut network, &path).unwrap(), 1);
        assert_eq!(network.node(102).unwrap().elevation, Some(42.0));

        std::fs::write(&path, "node,elevation\n999,1.0\n").unwrap();
        assert!(matches!(
            apply_elevation_fixes(&mut network, &path),
            Err(Error::InvalidData(_))
        ));
    }
}
