pub mod bar;
pub mod smooth;

pub use bar::{BarEstimator, BarPoint, BarSource, DetectionStats};
pub use smooth::PointSmoother;
