//! Data model for the exchanged network and its scenario metadata.

pub mod attributes;
pub mod crs;
pub mod network;
pub mod scenario;
pub mod transit;

pub use attributes::{AttrValue, AttributeDef, OwnerKind, ValueKind};
pub use crs::Crs;
pub use network::{AttrMap, Link, Network, Node, NodeId, NodeView};
pub use scenario::{RawTable, Scenario, ScenarioMeta};
pub use transit::{Headways, SegmentFields, TransitLine, TransitNetwork, TransitSegment};
