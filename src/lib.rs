//! Council engine: parallel multi-model generation, pairwise peer review,
//! three independent rank aggregations, and chairman synthesis.

pub mod aggregate;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod generation;
pub mod model;
pub mod provider;
pub mod review;
pub mod synthesis;
pub mod verdict;

pub use coordinator::Coordinator;
pub use error::{CouncilError, Result};
pub use model::{Answer, CouncilOutput, Options, Role};
