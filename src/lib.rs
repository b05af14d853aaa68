pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod seatgeek;
pub mod service;
pub mod sources;
pub mod store;

pub use config::ScoreboardConfig;
pub use error::PipelineError;
