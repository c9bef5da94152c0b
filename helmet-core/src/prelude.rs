pub use crate::error::Error;

// Re-export key components
pub use crate::export::export_scenario;
pub use crate::height::{
    CoverageSource, HeightConfig, HeightReport, WcsClient, add_height_data, add_heights,
};
pub use crate::loading::{ScenarioDir, read_scenario};
pub use crate::model::{Network, Scenario, ScenarioMeta};
pub use crate::zonedata::{
    RecalcMode, RecalcOptions, ZoneData, read_zonedata, recalculate_zonedata,
    split_zones_by_network,
};

// Core identifier types
pub use crate::model::NodeId;
pub use crate::zonedata::{Sij2019, Sij2023};
