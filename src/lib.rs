pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod models;

pub use config::{DetectorConfig, EdgeThresholds};
pub use detection::CardDetector;
pub use error::{DetectError, Result};
pub use models::{Detection, FrameDiagnostics, PolygonCandidate, Quadrilateral};
