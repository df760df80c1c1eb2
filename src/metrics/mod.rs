pub mod aggregate;
pub mod angle;
pub mod reps;
pub mod velocity;

pub use aggregate::{summarize, TrackingStats, VelocityMetrics};
pub use angle::{elbow_angles, joint_angle, JointAngleSample};
pub use reps::count_reps;
pub use velocity::{compute_velocities, VelocitySample};
