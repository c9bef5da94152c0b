//! Readers for the scenario exchange files.

mod attributes;
mod base_network;
mod scenario;
mod section;
mod transit;

pub use scenario::{ScenarioDir, read_scenario};
