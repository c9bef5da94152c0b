//! Coordinate reference systems of the model.
//!
//! The network is exchanged in EPSG:3879 (GK25) while the elevation
//! service and land-cover raster use EPSG:3067 (TM35FIN). Both are
//! transverse-mercator projections on GRS80, so conversion goes through
//! the geodetic inverse of one and the forward of the other (Krüger
//! series, well below centimeter error inside the model area).

use geo::Coord;

/// GRS80 semi-major axis
const A: f64 = 6_378_137.0;
/// GRS80 flattening
const F: f64 = 1.0 / 298.257_222_101;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// EPSG:3879, ETRS89 / GK25FIN
    Gk25,
    /// EPSG:3067, ETRS89 / TM35FIN
    Tm35Fin,
}

impl Crs {
    pub fn epsg(self) -> u32 {
        match self {
            Self::Gk25 => 3879,
            Self::Tm35Fin => 3067,
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            3879 => Some(Self::Gk25),
            3067 => Some(Self::Tm35Fin),
            _ => None,
        }
    }

    fn params(self) -> TmParams {
        match self {
            Self::Gk25 => TmParams {
                lon0: 25.0_f64.to_radians(),
                k0: 1.0,
                false_easting: 25_500_000.0,
                false_northing: 0.0,
            },
            Self::Tm35Fin => TmParams {
                lon0: 27.0_f64.to_radians(),
                k0: 0.9996,
                false_easting: 500_000.0,
                false_northing: 0.0,
            },
        }
    }
}

struct TmParams {
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

/// Third flattening and the rectifying radius, shared by both directions.
fn series_constants() -> (f64, f64) {
    let n = F / (2.0 - F);
    let big_a = A / (1.0 + n) * (1.0 + n * n / 4.0 + n.powi(4) / 64.0);
    (n, big_a)
}

fn forward(lat: f64, lon: f64, p: &TmParams) -> Coord<f64> {
    let (n, big_a) = series_constants();
    let alpha = [
        n / 2.0 - 2.0 * n * n / 3.0 + 5.0 * n.powi(3) / 16.0,
        13.0 * n * n / 48.0 - 3.0 * n.powi(3) / 5.0,
        61.0 * n.powi(3) / 240.0,
    ];

    let dl = lon - p.lon0;
    let e2 = 2.0 * F - F * F;
    let e = e2.sqrt();
    let t = (lat.sin().atanh() - e * (e * lat.sin()).atanh()).sinh();

    let xi0 = t.atan2(dl.cos());
    let eta0 = (dl.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi0;
    let mut eta = eta0;
    for (j, a) in alpha.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi += a * (k * xi0).sin() * (k * eta0).cosh();
        eta += a * (k * xi0).cos() * (k * eta0).sinh();
    }

    Coord {
        x: p.false_easting + p.k0 * big_a * eta,
        y: p.false_northing + p.k0 * big_a * xi,
    }
}

fn inverse(coord: Coord<f64>, p: &TmParams) -> (f64, f64) {
    let (n, big_a) = series_constants();
    let beta = [
        n / 2.0 - 2.0 * n * n / 3.0 + 37.0 * n.powi(3) / 96.0,
        n * n / 48.0 + n.powi(3) / 15.0,
        17.0 * n.powi(3) / 480.0,
    ];
    let delta = [
        2.0 * n - 2.0 * n * n / 3.0 - 2.0 * n.powi(3),
        7.0 * n * n / 3.0 - 8.0 * n.powi(3) / 5.0,
        56.0 * n.powi(3) / 15.0,
    ];

    let xi = (coord.y - p.false_northing) / (p.k0 * big_a);
    let eta = (coord.x - p.false_easting) / (p.k0 * big_a);

    let mut xi0 = xi;
    let mut eta0 = eta;
    for (j, b) in beta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi0 -= b * (k * xi).sin() * (k * eta).cosh();
        eta0 -= b * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi0.sin() / eta0.cosh()).asin();
    let mut lat = chi;
    for (j, d) in delta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        lat += d * (k * chi).sin();
    }
    let lon = p.lon0 + eta0.sinh().atan2(xi0.cos());
    (lat, lon)
}

/// Reproject a single planar coordinate between the supported systems.
pub fn reproject(coord: Coord<f64>, from: Crs, to: Crs) -> Coord<f64> {
    if from == to {
        return coord;
    }
    let (lat, lon) = inverse(coord, &from.params());
    forward(lat, lon, &to.params())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let p = Crs::Gk25.params();
        let c = forward(60.0_f64.to_radians(), 25.0_f64.to_radians(), &p);
        assert!((c.x - 25_500_000.0).abs() < 1e-6);
        // Meridian arc from the equator to 60 N is roughly 6 654 km.
        assert!(c.y > 6.62e6 && c.y < 6.69e6, "northing {}", c.y);
    }

    #[test]
    fn forward_inverse_round_trip() {
        let p = Crs::Tm35Fin.params();
        let lat = 60.2_f64.to_radians();
        let lon = 24.95_f64.to_radians();
        let c = forward(lat, lon, &p);
        let (lat2, lon2) = inverse(c, &p);
        assert!((lat - lat2).abs() < 1e-10);
        assert!((lon - lon2).abs() < 1e-10);
    }

    #[test]
    fn reprojection_round_trip_is_identity() {
        let original = Coord {
            x: 25_497_000.0,
            y: 6_673_000.0,
        };
        let there = reproject(original, Crs::Gk25, Crs::Tm35Fin);
        let back = reproject(there, Crs::Tm35Fin, Crs::Gk25);
        assert!((original.x - back.x).abs() < 1e-4);
        assert!((original.y - back.y).abs() < 1e-4);
        // TM35FIN eastings in the capital region sit a few hundred km
        // west of the 27 E central meridian.
        assert!(there.x > 300_000.0 && there.x < 500_000.0, "easting {}", there.x);
    }

    #[test]
    fn same_crs_is_a_no_op() {
        let c = Coord { x: 1.0, y: 2.0 };
        assert_eq!(reproject(c, Crs::Gk25, Crs::Gk25), c);
    }
}
