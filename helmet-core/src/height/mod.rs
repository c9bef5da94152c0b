//! Elevation batch job against the national 2 m height model.
//!
//! The model area is cut into quadrat tiles, the tiles are split into
//! contiguous shards and each shard worker fetches one coverage per
//! tile for the nodes inside it. Failures degrade: a failed request
//! defaults its nodes to sea level and the run carries on, with the
//! damage tallied in a [`HeightReport`]. Strict mode turns a degraded
//! run into an error.

mod gradient;
mod index;
mod quadrat;
pub(crate) mod raster;
mod wcs;

pub use gradient::{apply_elevation_fixes, write_gradients};
pub use wcs::{BBox, Coverage, CoverageSource, DEFAULT_ENDPOINT, WcsClient};

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use geo::{BoundingRect, Coord};
use log::{error, info, warn};

use crate::error::Error;
use crate::model::{Crs, Network, NodeId, Scenario};

use index::{IndexedNode, build_index, nodes_within};
use raster::Raster;

/// Construction-time configuration of the batch job.
#[derive(Debug, Clone)]
pub struct HeightConfig {
    pub api_key: String,
    pub endpoint: String,
    /// Quadrat tile edge length in meters.
    pub quadrat_width: f64,
    /// Buffer around a tile when selecting nodes.
    pub tile_buffer: f64,
    /// Buffer around the selected nodes' bounds in the coverage request.
    pub fetch_buffer: f64,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    /// Requested shard count, clamped to 2 or 4.
    pub workers: usize,
    /// Fail the run instead of degrading to sea-level defaults.
    pub strict: bool,
    pub elevation_fixes: Option<PathBuf>,
}

impl HeightConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            quadrat_width: 9500.0,
            tile_buffer: 10.0,
            fetch_buffer: 20.0,
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
            workers: 2,
            strict: false,
            elevation_fixes: None,
        }
    }
}

/// Outcome tally of one elevation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeightReport {
    pub nodes_total: usize,
    pub nodes_sampled: usize,
    pub nodes_defaulted: usize,
    pub tiles_fetched: usize,
    pub tiles_empty: usize,
    pub tiles_failed: usize,
    pub retry_events: usize,
    pub failed_shards: usize,
}

impl HeightReport {
    pub fn is_degraded(&self) -> bool {
        self.nodes_defaulted > 0 || self.tiles_failed > 0 || self.failed_shards > 0
    }
}

impl fmt::Display for HeightReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} nodes sampled ({} defaulted), {} tiles fetched, {} empty, {} failed, \
             {} retries, {} failed shards",
            self.nodes_sampled,
            self.nodes_total,
            self.nodes_defaulted,
            self.tiles_fetched,
            self.tiles_empty,
            self.tiles_failed,
            self.retry_events,
            self.failed_shards
        )
    }
}

/// Clamp the requested shard count to 2 or 4 and to the machine.
fn shard_count(requested: usize) -> usize {
    let available = std::thread::available_parallelism().map_or(2, usize::from);
    let wanted = if requested >= 4 { 4 } else { 2 };
    if wanted > available {
        warn!("requested {wanted} workers but only {available} cores are available");
        wanted.min(available).max(1)
    } else {
        wanted
    }
}

struct ShardOutcome {
    elevations: Vec<(NodeId, f64)>,
    report: HeightReport,
}

fn process_shard(
    tiles: &[geo::Polygon<f64>],
    tree: &rstar::RTree<IndexedNode>,
    source: &dyn CoverageSource,
    config: &HeightConfig,
) -> ShardOutcome {
    let mut outcome = ShardOutcome {
        elevations: Vec::new(),
        report: HeightReport::default(),
    };
    for tile in tiles {
        let Some(bounds) = tile.bounding_rect() else {
            continue;
        };
        let selected = nodes_within(
            tree,
            [bounds.min().x, bounds.min().y],
            [bounds.max().x, bounds.max().y],
            config.tile_buffer,
        );
        if selected.is_empty() {
            outcome.report.tiles_empty += 1;
            continue;
        }
        let Some(bbox) = BBox::of_points(selected.iter().map(|n| &n.position)) else {
            continue;
        };
        match source
            .get_coverage(bbox.buffered(config.fetch_buffer))
            .and_then(|coverage| {
                outcome.report.retry_events += coverage.retries as usize;
                Raster::decode(&coverage.bytes)
            }) {
            Ok(raster) => {
                outcome.report.tiles_fetched += 1;
                for node in selected {
                    match raster.sample(node.position[0], node.position[1]) {
                        Some(elevation) => {
                            outcome.report.nodes_sampled += 1;
                            outcome.elevations.push((node.id, elevation));
                        }
                        None => {
                            outcome.report.nodes_defaulted += 1;
                            outcome.elevations.push((node.id, 0.0));
                        }
                    }
                }
            }
            Err(e) => {
                warn!("tile fetch failed, defaulting {} nodes: {e}", selected.len());
                outcome.report.tiles_failed += 1;
                for node in selected {
                    outcome.report.nodes_defaulted += 1;
                    outcome.elevations.push((node.id, 0.0));
                }
            }
        }
    }
    outcome
}

/// Sample an elevation for every non-centroid node and store it on the
/// network. Centroids are pinned to 0. Coordinates are reprojected to
/// TM35FIN for the coverage requests; the network itself is left in its
/// own CRS.
pub fn add_heights(
    network: &mut Network,
    source: &dyn CoverageSource,
    config: &HeightConfig,
) -> Result<HeightReport, Error> {
    let projected = network.to_crs(Crs::Tm35Fin);
    let view = projected.node_view();

    let mut report = HeightReport {
        nodes_total: view.len(),
        ..Default::default()
    };

    for node in view.iter().filter(|n| n.is_centroid) {
        if let Some(n) = network.node_mut(node.id) {
            n.elevation = Some(0.0);
        }
    }

    let targets: Vec<IndexedNode> = view
        .iter()
        .filter(|n| !n.is_centroid)
        .map(|n| IndexedNode {
            id: n.id,
            position: [n.coord.x, n.coord.y],
        })
        .collect();
    let points: Vec<Coord<f64>> = targets
        .iter()
        .map(|n| Coord {
            x: n.position[0],
            y: n.position[1],
        })
        .collect();
    let Some(hull) = quadrat::coverage_hull(&points) else {
        warn!("not enough non-centroid nodes to sample elevations");
        return Ok(report);
    };
    let tiles = quadrat::quadrat_tiles(&hull, config.quadrat_width);
    info!("sampling elevations over {} quadrat tiles", tiles.len());

    let tree = build_index(targets);
    let workers = shard_count(config.workers);
    let shard_size = tiles.len().div_ceil(workers);
    let outcomes: Mutex<Vec<ShardOutcome>> = Mutex::new(Vec::new());
    let panicked = Mutex::new(0usize);

    let tree = &tree;
    rayon::scope(|scope| {
        for shard in tiles.chunks(shard_size.max(1)) {
            let outcomes = &outcomes;
            let panicked = &panicked;
            scope.spawn(move |_| {
                match catch_unwind(AssertUnwindSafe(|| {
                    process_shard(shard, tree, source, config)
                })) {
                    Ok(outcome) => outcomes.lock().unwrap_or_else(|e| e.into_inner()).push(outcome),
                    Err(_) => {
                        error!("elevation shard panicked, its tiles are lost");
                        *panicked.lock().unwrap_or_else(|e| e.into_inner()) += 1;
                    }
                }
            });
        }
    });

    report.failed_shards = panicked.into_inner().unwrap_or_else(|e| e.into_inner());
    for outcome in outcomes.into_inner().unwrap_or_else(|e| e.into_inner()) {
        report.nodes_sampled += outcome.report.nodes_sampled;
        report.nodes_defaulted += outcome.report.nodes_defaulted;
        report.tiles_fetched += outcome.report.tiles_fetched;
        report.tiles_empty += outcome.report.tiles_empty;
        report.tiles_failed += outcome.report.tiles_failed;
        report.retry_events += outcome.report.retry_events;
        for (id, elevation) in outcome.elevations {
            if let Some(node) = network.node_mut(id) {
                node.elevation = Some(elevation);
            }
        }
    }

    info!("elevation run: {report}");
    if config.strict && report.is_degraded() {
        return Err(Error::HeightError(format!("degraded run: {report}")));
    }
    Ok(report)
}

/// Full height pipeline for a scenario: sample elevations, apply manual
/// fixes and write the gradient attributes.
pub fn add_height_data(
    scenario: &mut Scenario,
    source: &dyn CoverageSource,
    config: &HeightConfig,
) -> Result<HeightReport, Error> {
    let report = add_heights(&mut scenario.network, source, config)?;
    if let Some(fixes) = &config.elevation_fixes {
        apply_elevation_fixes(&mut scenario.network, fixes)?;
    }
    write_gradients(&mut scenario.network);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::tests::{link, node};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSource {
        calls: AtomicUsize,
    }

    impl CoverageSource for FailingSource {
        fn get_coverage(&self, _bbox: BBox) -> Result<Coverage, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::NetworkError("down".to_string()))
        }
    }

    fn grid_network() -> Network {
        let mut nodes = Vec::new();
        let mut links = Vec::new();
        let mut id = 100;
        for i in 0..5 {
            for j in 0..5 {
                nodes.push(node(
                    id,
                    25_490_000.0 + f64::from(i) * 1000.0,
                    6_670_000.0 + f64::from(j) * 1000.0,
                    false,
                ));
                links.push(link(id, 0, 0.0));
                id += 1;
            }
        }
        Network::new(nodes, links, vec![], vec![], Crs::Gk25)
    }

    #[test]
    fn failed_fetches_default_nodes_and_report_degradation() {
        let mut network = grid_network();
        let source = FailingSource {
            calls: AtomicUsize::new(0),
        };
        let config = HeightConfig::new("k");
        let report = add_heights(&mut network, &source, &config).unwrap();
        assert_eq!(report.nodes_total, 25);
        assert_eq!(report.nodes_sampled, 0);
        assert!(report.nodes_defaulted > 0);
        assert!(report.tiles_failed > 0);
        assert!(report.is_degraded());
        assert!(source.calls.load(Ordering::SeqCst) > 0);
        // Every node fell back to sea level.
        assert!(
            network
                .node_ids()
                .all(|id| network.node(id).unwrap().elevation == Some(0.0))
        );
    }

    #[test]
    fn strict_mode_rejects_degraded_runs() {
        let mut network = grid_network();
        let source = FailingSource {
            calls: AtomicUsize::new(0),
        };
        let mut config = HeightConfig::new("k");
        config.strict = true;
        assert!(matches!(
            add_heights(&mut network, &source, &config),
            Err(Error::HeightError(_))
        ));
    }

    #[test]
    fn centroids_are_pinned_to_zero_and_not_fetched() {
        struct Recorder {
            boxes: Mutex<Vec<BBox>>,
        }
        impl CoverageSource for Recorder {
            fn get_coverage(&self, bbox: BBox) -> Result<Coverage, Error> {
                self.boxes
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(bbox);
                Err(Error::NetworkError("stop".to_string()))
            }
        }

        let mut network = grid_network();
        // A far-away centroid must not stretch the request area.
        let centroid = node(999, 25_600_000.0, 6_800_000.0, true);
        let centroid_id = centroid.id;
        let mut nodes: Vec<_> = network
            .node_ids()
            .filter_map(|id| network.node(id).cloned())
            .collect();
        nodes.push(centroid);
        let mut links = network.links.clone();
        links.push(link(centroid_id, 0, 0.0));
        let mut network = Network::new(nodes, links, vec![], vec![], Crs::Gk25);

        let source = Recorder {
            boxes: Mutex::new(Vec::new()),
        };
        let config = HeightConfig::new("k");
        add_heights(&mut network, &source, &config).unwrap();
        assert_eq!(network.node(centroid_id).unwrap().elevation, Some(0.0));
        for bbox in source.boxes.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            assert!(bbox.max_x < 450_000.0, "centroid leaked into request");
        }
    }

    #[test]
    fn shard_count_is_two_or_four() {
        assert!(matches!(shard_count(1), 1 | 2));
        assert!(matches!(shard_count(2), 1 | 2));
        assert!(matches!(shard_count(8), 1 | 2 | 4));
    }
}
