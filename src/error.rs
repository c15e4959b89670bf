use crate::graph::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No edge-disjoint path for leg {leg} ({from} -> {to})")]
    DisjointPathUnavailable { leg: usize, from: NodeId, to: NodeId },

    #[error("No path between waypoints for leg {leg} ({from} -> {to})")]
    NoPathBetweenWaypoints { leg: usize, from: NodeId, to: NodeId },

    #[error("All {0} route candidates failed")]
    AllCandidatesFailed(usize),

    #[error("Road graph error: {0}")]
    Graph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Errors that end the evaluation of one candidate but not the whole sweep.
    pub fn is_candidate_fatal(&self) -> bool {
        matches!(
            self,
            AppError::NoPathBetweenWaypoints { .. }
                | AppError::DisjointPathUnavailable { .. }
                | AppError::InvalidParameter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
