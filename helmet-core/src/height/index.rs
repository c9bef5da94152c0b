//! R-tree over sampling targets.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::model::NodeId;

/// A node position inserted into the spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct IndexedNode {
    pub id: NodeId,
    pub position: [f64; 2],
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

pub(crate) fn build_index(nodes: impl IntoIterator<Item = IndexedNode>) -> RTree<IndexedNode> {
    RTree::bulk_load(nodes.into_iter().collect())
}

/// Nodes whose position falls inside the given bounds, expanded by
/// `buffer` on every side.
pub(crate) fn nodes_within<'a>(
    tree: &'a RTree<IndexedNode>,
    min: [f64; 2],
    max: [f64; 2],
    buffer: f64,
) -> Vec<&'a IndexedNode> {
    let envelope = AABB::from_corners(
        [min[0] - buffer, min[1] - buffer],
        [max[0] + buffer, max[1] + buffer],
    );
    tree.locate_in_envelope_intersecting(&envelope).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_query_picks_up_edge_nodes() {
        let tree = build_index([
            IndexedNode {
                id: 1,
                position: [0.0, 0.0],
            },
            IndexedNode {
                id: 2,
                position: [105.0, 0.0],
            },
            IndexedNode {
                id: 3,
                position: [500.0, 500.0],
            },
        ]);
        let hits = nodes_within(&tree, [0.0, 0.0], [100.0, 100.0], 10.0);
        let mut ids: Vec<NodeId> = hits.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }
}
