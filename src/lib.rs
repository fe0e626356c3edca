// Library interface for chicane
// This allows integration tests to access internal modules

pub mod config;
pub mod errors;
pub mod standings;
pub mod store;
pub mod submit;
pub mod timing;
pub mod writer;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::ChicaneError;
pub use timing::{
    CarResult, LapClassification, LapEvent, RoundConfig, RoundRecord, SensorSample, TimingOutput,
};
