//! In-memory representation of the road network.

use geo::Coord;
use hashbrown::HashMap;

use super::attributes::{AttrValue, AttributeDef, OwnerKind};
use super::crs::{Crs, reproject};

pub type NodeId = i32;

/// Attribute values keyed by wire name (`@...` / `#...`).
pub type AttrMap = HashMap<String, AttrValue>;

/// First label characters of nodes inside the HSL tariff area, used for
/// the derived `@hsl` attribute when no extra-nodes file supplies one.
const HSL_LABELS: &[char] = &['H', 'E', 'V', 'K', 'S', 'T'];

/// A parsed network node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub coord: Coord<f64>,
    /// Ground elevation, present once height data has been added.
    pub elevation: Option<f64>,
    /// Origin marker was `a*`.
    pub is_centroid: bool,
    pub data: [f64; 3],
    pub label: String,
    pub extra: AttrMap,
}

/// A directed link between two nodes. An isolated node is represented by
/// a synthetic row with `to == 0` so that the From side of the link table
/// covers every node.
#[derive(Debug, Clone)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub length: f64,
    pub modes: String,
    pub link_type: i32,
    pub lanes: f64,
    pub vdf: i32,
    pub data: [f64; 3],
    pub extra: AttrMap,
}

impl Link {
    pub fn is_orphan(&self) -> bool {
        self.to <= 0
    }
}

/// One row of the derived node view.
#[derive(Debug, Clone)]
pub struct NodeView {
    pub id: NodeId,
    pub coord: Coord<f64>,
    pub is_centroid: bool,
    pub data: [f64; 3],
    pub label: String,
    /// `@korkeus`, 0 until height data has been added.
    pub korkeus: f64,
    /// `@hsl` membership flag.
    pub hsl: f64,
}

/// The road network: links plus the node table they resolve against,
/// with attribute declarations and the CRS carried as metadata.
#[derive(Debug, Clone)]
pub struct Network {
    pub links: Vec<Link>,
    nodes: HashMap<NodeId, Node>,
    pub link_defs: Vec<AttributeDef>,
    pub node_defs: Vec<AttributeDef>,
    crs: Crs,
}

impl Network {
    pub fn new(
        nodes: Vec<Node>,
        links: Vec<Link>,
        link_defs: Vec<AttributeDef>,
        node_defs: Vec<AttributeDef>,
        crs: Crs,
    ) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id, n)).collect();
        Self {
            links,
            nodes,
            link_defs,
            node_defs,
            crs,
        }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Euclidean length of a link in CRS units (meters for both
    /// supported systems). Orphan rows have no extent.
    pub fn planar_length(&self, link: &Link) -> f64 {
        if link.is_orphan() {
            return 0.0;
        }
        match (self.node(link.from), self.node(link.to)) {
            (Some(a), Some(b)) => {
                let dx = b.coord.x - a.coord.x;
                let dy = b.coord.y - a.coord.y;
                dx.hypot(dy)
            }
            _ => 0.0,
        }
    }

    /// Either endpoint of the link is a centroid.
    pub fn is_connector(&self, link: &Link) -> bool {
        let centroid = |id| self.node(id).is_some_and(|n: &Node| n.is_centroid);
        centroid(link.from) || (!link.is_orphan() && centroid(link.to))
    }

    /// Derived node view: the unique From side of every link, in link
    /// order. Because orphan nodes carry a synthetic link row this
    /// projection covers the whole node table. `@hsl` falls back to the
    /// label heuristic when the parsed node has no stored value.
    pub fn node_view(&self) -> Vec<NodeView> {
        let mut seen = HashMap::with_capacity(self.nodes.len());
        let mut view = Vec::with_capacity(self.nodes.len());
        for link in &self.links {
            if seen.contains_key(&link.from) {
                continue;
            }
            let Some(node) = self.node(link.from) else {
                continue;
            };
            seen.insert(link.from, ());
            view.push(NodeView {
                id: node.id,
                coord: node.coord,
                is_centroid: node.is_centroid,
                data: node.data,
                label: node.label.clone(),
                korkeus: node
                    .extra
                    .get("@korkeus")
                    .and_then(AttrValue::as_f64)
                    .or(node.elevation)
                    .unwrap_or(0.0),
                hsl: node
                    .extra
                    .get("@hsl")
                    .and_then(AttrValue::as_f64)
                    .unwrap_or_else(|| hsl_from_label(&node.label)),
            });
        }
        view
    }

    /// Nodes of the derived view flagged as centroids.
    pub fn centroids(&self) -> Vec<NodeView> {
        self.node_view()
            .into_iter()
            .filter(|n| n.is_centroid)
            .collect()
    }

    /// Reproject into `target`, producing a new network. The source is
    /// left untouched.
    pub fn to_crs(&self, target: Crs) -> Network {
        let mut out = self.clone();
        out.to_crs_in_place(target);
        out
    }

    /// Reproject in place.
    pub fn to_crs_in_place(&mut self, target: Crs) {
        if self.crs == target {
            return;
        }
        for node in self.nodes.values_mut() {
            node.coord = reproject(node.coord, self.crs, target);
        }
        self.crs = target;
    }

    /// Register a link attribute declaration unless one with the same
    /// name already exists.
    pub fn declare_link_attr(&mut self, def: AttributeDef) {
        if !self.link_defs.iter().any(|d| d.name == def.name) {
            self.link_defs.push(def);
        }
    }

    pub fn declare_node_attr(&mut self, def: AttributeDef) {
        if !self.node_defs.iter().any(|d| d.name == def.name) {
            self.node_defs.push(def);
        }
    }

    /// Set a node extra attribute, declaring it on first use.
    pub fn set_node_attr(&mut self, id: NodeId, name: &str, value: AttrValue) {
        self.declare_node_attr(AttributeDef::extra(name, OwnerKind::Node));
        if let Some(node) = self.nodes.get_mut(&id) {
            node.extra.insert(name.to_string(), value);
        }
    }
}

fn hsl_from_label(label: &str) -> f64 {
    match label.chars().next() {
        Some(c) if HSL_LABELS.contains(&c) => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn node(id: NodeId, x: f64, y: f64, centroid: bool) -> Node {
        Node {
            id,
            coord: Coord { x, y },
            elevation: None,
            is_centroid: centroid,
            data: [0.0; 3],
            label: "H".to_string(),
            extra: AttrMap::new(),
        }
    }

    pub(crate) fn link(from: NodeId, to: NodeId, length: f64) -> Link {
        Link {
            from,
            to,
            length,
            modes: "c".to_string(),
            link_type: 1,
            lanes: 1.0,
            vdf: 1,
            data: [0.0; 3],
            extra: AttrMap::new(),
        }
    }

    fn sample_network() -> Network {
        let nodes = vec![
            node(101, 0.0, 0.0, true),
            node(102, 100.0, 0.0, false),
            node(103, 100.0, 100.0, false),
        ];
        let links = vec![
            link(101, 102, 0.1),
            link(102, 101, 0.1),
            link(102, 103, 0.1),
            link(103, 0, 0.0),
        ];
        Network::new(nodes, links, vec![], vec![], Crs::Gk25)
    }

    #[test]
    fn node_view_deduplicates_from_side() {
        let network = sample_network();
        let view = network.node_view();
        let ids: Vec<NodeId> = view.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
    }

    #[test]
    fn orphan_node_survives_in_view() {
        let network = sample_network();
        assert!(network.node_view().iter().any(|n| n.id == 103));
        assert_eq!(network.links.iter().filter(|l| l.is_orphan()).count(), 1);
    }

    #[test]
    fn centroid_flag_and_connector() {
        let network = sample_network();
        let centroids = network.centroids();
        assert_eq!(centroids.len(), 1);
        assert_eq!(centroids[0].id, 101);
        assert!(network.is_connector(&network.links[0]));
        assert!(!network.is_connector(&network.links[2]));
    }

    #[test]
    fn hsl_heuristic_from_label() {
        let network = sample_network();
        let view = network.node_view();
        assert!(view.iter().all(|n| n.hsl == 1.0));
    }

    #[test]
    fn planar_length_uses_endpoints() {
        let network = sample_network();
        assert!((network.planar_length(&network.links[2]) - 100.0).abs() < 1e-9);
        assert_eq!(network.planar_length(&network.links[3]), 0.0);
    }

    #[test]
    fn to_crs_does_not_mutate_source() {
        let nodes = vec![node(1, 25_497_000.0, 6_673_000.0, false)];
        let links = vec![link(1, 0, 0.0)];
        let source = Network::new(nodes, links, vec![], vec![], Crs::Gk25);
        let projected = source.to_crs(Crs::Tm35Fin);
        assert_eq!(source.crs(), Crs::Gk25);
        assert_eq!(projected.crs(), Crs::Tm35Fin);
        assert!((source.node(1).unwrap().coord.x - 25_497_000.0).abs() < 1e-9);
        assert!(projected.node(1).unwrap().coord.x < 1_000_000.0);
    }
}
