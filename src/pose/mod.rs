pub mod adapter;
pub mod landmark;

pub use adapter::{
    bbox_iou, canonicalize, select_person, tracking_roi, PersonDetection, PoseBackend, RawLandmark,
};
pub use landmark::{FramePose, Landmark, LandmarkIndex};
