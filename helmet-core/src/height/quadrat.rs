//! Quadrat partitioning of the model area.
//!
//! The elevation service caps coverage sizes, so the network area is cut
//! into grid tiles small enough to fetch in one request each. Tiles are
//! grid cells clipped against the convex hull of the sampled nodes, so
//! nothing outside the network is requested.

use geo::{BooleanOps, BoundingRect, ConvexHull, Coord, MultiPoint, Point, Polygon, polygon};

/// Minimum number of grid lines per axis, giving at least a 2x2 grid.
const MIN_GRID_LINES: usize = 3;

/// Convex hull of the given points. `None` for fewer than three points,
/// where no area exists to partition.
pub(crate) fn coverage_hull(points: &[Coord<f64>]) -> Option<Polygon<f64>> {
    if points.len() < 3 {
        return None;
    }
    let multi: MultiPoint<f64> = points.iter().map(|c| Point::from(*c)).collect();
    let hull = multi.convex_hull();
    if hull.exterior().0.len() < 4 {
        // Collinear input degenerates to a line.
        return None;
    }
    Some(hull)
}

fn grid_points(min: f64, max: f64, width: f64) -> Vec<f64> {
    let count = (((max - min) / width).ceil() as usize + 1).max(MIN_GRID_LINES);
    let step = (max - min) / (count - 1) as f64;
    (0..count).map(|i| min + step * i as f64).collect()
}

/// Cut the area into quadrat tiles of at most `width` on a side,
/// clipped to the area itself. Every point of the area lies in at
/// least one tile.
pub(crate) fn quadrat_tiles(area: &Polygon<f64>, width: f64) -> Vec<Polygon<f64>> {
    let Some(bounds) = area.bounding_rect() else {
        return Vec::new();
    };
    let xs = grid_points(bounds.min().x, bounds.max().x, width);
    let ys = grid_points(bounds.min().y, bounds.max().y, width);

    let mut tiles = Vec::new();
    for wx in xs.windows(2) {
        for wy in ys.windows(2) {
            let cell: Polygon<f64> = polygon![
                (x: wx[0], y: wy[0]),
                (x: wx[1], y: wy[0]),
                (x: wx[1], y: wy[1]),
                (x: wx[0], y: wy[1]),
            ];
            let clipped = area.intersection(&cell);
            tiles.extend(clipped.into_iter());
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn square_points(side: f64, spacing: f64) -> Vec<Coord<f64>> {
        let mut points = Vec::new();
        let n = (side / spacing) as i32;
        for i in 0..=n {
            for j in 0..=n {
                points.push(Coord {
                    x: f64::from(i) * spacing,
                    y: f64::from(j) * spacing,
                });
            }
        }
        points
    }

    #[test]
    fn hull_needs_area() {
        assert!(coverage_hull(&[]).is_none());
        assert!(
            coverage_hull(&[
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: 2.0, y: 2.0 },
            ])
            .is_none()
        );
        assert!(coverage_hull(&square_points(100.0, 50.0)).is_some());
    }

    #[test]
    fn tiles_cover_every_input_point() {
        use geo::Intersects;
        let points = square_points(30_000.0, 1000.0);
        let hull = coverage_hull(&points).unwrap();
        let tiles = quadrat_tiles(&hull, 9500.0);
        assert!(tiles.len() > 1);
        for point in &points {
            let p = Point::from(*point);
            assert!(
                tiles.iter().any(|t| t.intersects(&p)),
                "point {point:?} not covered"
            );
        }
    }

    #[test]
    fn tile_area_sums_to_hull_area() {
        let hull = coverage_hull(&square_points(20_000.0, 5000.0)).unwrap();
        let tiles = quadrat_tiles(&hull, 9500.0);
        let total: f64 = tiles.iter().map(Area::unsigned_area).sum();
        assert!((total - hull.unsigned_area()).abs() / hull.unsigned_area() < 1e-6);
    }

    #[test]
    fn small_area_still_gets_a_grid() {
        let hull = coverage_hull(&square_points(100.0, 25.0)).unwrap();
        let tiles = quadrat_tiles(&hull, 9500.0);
        // MIN_GRID_LINES forces a 2x2 cut even below one quadrat width.
        assert_eq!(tiles.len(), 4);
    }
}
