//! Score → human-readable feedback bands.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedbackError {
    #[error("invalid match score {0}: scores are non-negative")]
    InvalidScore(f32),
}

/// Feedback shown next to the live score, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feedback {
    Immaculate,
    Incredible,
    ReallyGood,
    AlmostThere,
    NeedsWork,
    TryToMatch,
}

/// Exclusive upper bound of each band; scores at or above the last bound fall
/// through to [`Feedback::TryToMatch`].
const BANDS: [(f32, Feedback); 5] = [
    (100.0, Feedback::Immaculate),
    (250.0, Feedback::Incredible),
    (500.0, Feedback::ReallyGood),
    (1000.0, Feedback::AlmostThere),
    (2000.0, Feedback::NeedsWork),
];

impl Feedback {
    pub fn label(self) -> &'static str {
        match self {
            Feedback::Immaculate => "Immaculate!",
            Feedback::Incredible => "Incredible!",
            Feedback::ReallyGood => "Really good!",
            Feedback::AlmostThere => "Almost there!",
            Feedback::NeedsWork => "Needs a little work",
            Feedback::TryToMatch => "Try to match the pose in the photo",
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Feedback {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Classify a match score. The first band whose bound exceeds the score wins.
pub fn classify(score: f32) -> Result<Feedback, FeedbackError> {
    if score.is_nan() || score < 0.0 {
        return Err(FeedbackError::InvalidScore(score));
    }
    Ok(BANDS
        .iter()
        .find(|(bound, _)| score < *bound)
        .map(|&(_, feedback)| feedback)
        .unwrap_or(Feedback::TryToMatch))
}
