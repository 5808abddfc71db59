mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from cardscan for tests
pub use cardscan::{CardDetector, Detection, DetectorConfig, EdgeThresholds, Quadrilateral};
