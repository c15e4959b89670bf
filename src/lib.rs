// Library exports for the CLI and integration tests

pub mod config;
pub mod constants;
pub mod error;
pub mod graph;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use graph::{NodeId, RoadGraph, RoadNetwork};
pub use services::route_generator::RouteGenerator;
