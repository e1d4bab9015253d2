pub mod calibrate;
pub mod measure;
pub mod score;
pub mod smooth;
pub mod solve;

pub use calibrate::{is_t_pose, CalibrationGate, CalibrationPhase, PollOutcome};
pub use measure::{extract, BodyMeasurements};
pub use score::{score, FitQuality};
pub use smooth::TransformSmoother;
pub use solve::solve;
