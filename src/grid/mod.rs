//! Traversability grid storage and the map-provider container.

mod environment;
mod trav_grid;

pub use environment::Environment;
pub use trav_grid::TravGrid;
