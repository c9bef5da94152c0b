//! Utilities for working with Helmet model scenarios.
//!
//! The crate reads an EMME scenario exported as text files, mutates the
//! network model in memory and writes it back in the same exchange
//! format. On top of that sit two batch jobs: fetching terrain heights
//! for every node from the national elevation model, and recalculating
//! a zone data folder after zones were split around new centroids.

pub mod error;
pub mod export;
pub mod height;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod zonedata;

pub use error::Error;
