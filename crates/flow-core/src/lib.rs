//! flow-core — Pose similarity scoring.
//!
//! Flattens detected poses into fixed-layout vectors, compares them with a
//! confidence-weighted distance and turns the distance into feedback.

pub mod encoder;
pub mod feedback;
pub mod scorer;
pub mod source;
pub mod types;

pub use encoder::{encode, EncodeError};
pub use feedback::{classify, Feedback, FeedbackError};
pub use scorer::{score, validate_reference, ScoreError, Scorer, WeightedDistance};
pub use source::{KeypointSource, SourceError};
pub use types::{BodyPart, Keypoint, Pose, PoseVector, BODY_PART_COUNT};
