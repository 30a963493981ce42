/// taskpulse library
///
/// Work-item recommendation engine: learns when and how someone works and
/// suggests what to do next.

pub mod cache;
pub mod clock;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod intelligence;

// Re-exports for convenience
pub use config::EngineConfig;
pub use db::Database;
pub use error::{EngineError, Result};
pub use intelligence::{Recommendation, RecommendationEngine};
