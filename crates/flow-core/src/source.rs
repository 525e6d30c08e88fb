//! Keypoint source seam.
//!
//! Detection itself happens outside this workspace; anything that can hand
//! back a [`Pose`] on request (a camera-bound estimator, a replay file, a test
//! script) plugs in here.

use crate::types::Pose;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Model or stream not ready yet. Expected during startup.
    #[error("keypoint source not ready")]
    Unavailable,
    #[error("detection failed: {0}")]
    Failed(String),
}

/// A live source of detected poses.
pub trait KeypointSource {
    /// Detect one pose from the source's current frame.
    fn sample(&self) -> impl Future<Output = Result<Pose, SourceError>> + Send;
}
