//! Confidence-weighted distance between two pose vectors.
//!
//! Only the reference's confidences weight the distance: a part the reference
//! photo barely saw (occluded limb, cropped foot) counts for little, while the
//! candidate's own confidences are never consulted.

use crate::types::PoseVector;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("pose vector has length {actual}, expected {expected}")]
    VectorShape { expected: usize, actual: usize },
    #[error("reference pose has no usable confidence (total {0})")]
    DegenerateReference(f32),
    #[error("reference confidence {value} at slot {index} is outside [0, 1]")]
    ConfidenceOutOfRange { index: usize, value: f32 },
}

/// Strategy for comparing a live candidate against a reference pose.
///
/// Lower scores mean closer poses; zero is a perfect match.
pub trait Scorer {
    fn score(&self, reference: &PoseVector, candidate: &PoseVector) -> Result<f32, ScoreError>;
}

/// Weighted L1 distance, normalised by the reference's confidence total.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedDistance;

impl Scorer for WeightedDistance {
    fn score(&self, reference: &PoseVector, candidate: &PoseVector) -> Result<f32, ScoreError> {
        score(reference, candidate)
    }
}

/// Check that a vector can serve as a reference, returning its confidence total.
pub fn validate_reference(reference: &PoseVector) -> Result<f32, ScoreError> {
    check_shape(reference)?;
    // NaN and infinities fall outside the range as well.
    if let Some((index, &value)) = reference
        .confidences()
        .iter()
        .enumerate()
        .find(|(_, c)| !(0.0..=1.0).contains(*c))
    {
        return Err(ScoreError::ConfidenceOutOfRange { index, value });
    }

    let total = reference.values[PoseVector::LEN - 1];
    // NaN fails this comparison too.
    if !(total > 0.0) {
        return Err(ScoreError::DegenerateReference(total));
    }
    Ok(total)
}

/// Weighted distance from `reference` to `candidate`.
pub fn score(reference: &PoseVector, candidate: &PoseVector) -> Result<f32, ScoreError> {
    check_shape(candidate)?;
    let total = validate_reference(reference)?;

    let weights = reference.confidences();
    let sum: f32 = reference
        .xy()
        .iter()
        .zip(candidate.xy())
        .enumerate()
        .map(|(i, (r, c))| weights[i / 2] * (r - c).abs())
        .sum();

    Ok(sum / total)
}

fn check_shape(vector: &PoseVector) -> Result<(), ScoreError> {
    if vector.len() != PoseVector::LEN {
        return Err(ScoreError::VectorShape {
            expected: PoseVector::LEN,
            actual: vector.len(),
        });
    }
    Ok(())
}
