//! Voronoi partition of a zone polygon around seed points.
//!
//! Cells are built by half-plane clipping: the cell of a seed is the
//! zone intersected with, for every other seed, the half-plane on this
//! seed's side of their perpendicular bisector. For the handful of
//! seeds a zone split involves this is exact and needs no triangulation.

use geo::{BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Polygon};

/// Quad covering the half-plane closer to `near` than to `far`, sized
/// to safely contain `extent`.
fn half_plane(near: Coord<f64>, far: Coord<f64>, extent: f64) -> MultiPolygon<f64> {
    let mid = Coord {
        x: (near.x + far.x) / 2.0,
        y: (near.y + far.y) / 2.0,
    };
    let len = ((near.x - far.x).powi(2) + (near.y - far.y).powi(2)).sqrt();
    // Unit vector from far towards near, and its perpendicular.
    let d = Coord {
        x: (near.x - far.x) / len,
        y: (near.y - far.y) / len,
    };
    let t = Coord { x: -d.y, y: d.x };
    let reach = extent * 4.0;
    let corner = |a: f64, b: f64| Coord {
        x: mid.x + t.x * a + d.x * b,
        y: mid.y + t.y * a + d.y * b,
    };
    let ring = vec![
        corner(-reach, 0.0),
        corner(reach, 0.0),
        corner(reach, reach),
        corner(-reach, reach),
        corner(-reach, 0.0),
    ];
    MultiPolygon(vec![Polygon::new(LineString::from(ring), vec![])])
}

/// Partition `zone` into one cell per seed, in seed order. Coincident
/// seeds produce empty cells rather than failing.
pub(crate) fn voronoi_cells(
    zone: &MultiPolygon<f64>,
    seeds: &[Coord<f64>],
) -> Vec<MultiPolygon<f64>> {
    if seeds.len() == 1 {
        return vec![zone.clone()];
    }
    let extent = zone
        .bounding_rect()
        .map_or(0.0, |r| (r.width().powi(2) + r.height().powi(2)).sqrt());

    seeds
        .iter()
        .map(|&seed| {
            let mut cell = zone.clone();
            for &other in seeds {
                if other == seed {
                    continue;
                }
                cell = cell.intersection(&half_plane(seed, other, extent));
                if cell.0.is_empty() {
                    break;
                }
            }
            cell
        })
        .collect()
}
