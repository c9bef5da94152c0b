//! A full exported scenario: network, transit and auxiliary tables.

use super::network::Network;
use super::transit::TransitNetwork;

/// Header metadata of the scenario's transaction files.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMeta {
    pub project_name: String,
    pub scenario_number: String,
    pub scenario_name: String,
}

/// An auxiliary table carried through unparsed (link shapes, modes,
/// turns, vehicles). Rows are kept verbatim; only the header block is
/// regenerated on export.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Table marker without the leading `t `, e.g. `linkvertices`.
    pub marker: String,
    pub rows: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub network: Network,
    pub transit: TransitNetwork,
    pub meta: ScenarioMeta,
    pub link_shape: Option<RawTable>,
    pub modes: Option<RawTable>,
    pub turns: Option<RawTable>,
    pub vehicles: Option<RawTable>,
}
