pub mod arbiter;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod hazards;
pub mod heatmap;
pub mod keywords;
pub mod location;
pub mod refresh;
pub mod remote;
pub mod schema;
pub mod scoring;
pub mod similarity;
pub mod snapshot;
pub mod summary;

pub use error::{EngineError, Result};
