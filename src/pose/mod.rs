pub mod landmark;
pub mod stream;

pub use landmark::{merge_streams, point, Landmark, LandmarkIndex};
pub use stream::{OracleMessage, ThreadedLandmarkSource, TrackerMessage};
