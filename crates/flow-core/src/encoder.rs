//! Pose → fixed-layout vector encoding.
//!
//! Keypoints are ordered by case-insensitive part name so that every index of
//! the output carries the same body part for any two encoded poses.

use crate::types::{BodyPart, Keypoint, Pose, PoseVector, BODY_PART_COUNT};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("malformed pose: expected 17 keypoints, got {0}")]
    WrongKeypointCount(usize),
    #[error("malformed pose: duplicate keypoint for {0}")]
    DuplicatePart(BodyPart),
}

/// Flatten a complete pose into a [`PoseVector`].
///
/// Fails unless every body part appears exactly once.
pub fn encode(pose: &Pose) -> Result<PoseVector, EncodeError> {
    if pose.keypoints.len() != BODY_PART_COUNT {
        return Err(EncodeError::WrongKeypointCount(pose.keypoints.len()));
    }

    let mut seen = [false; BODY_PART_COUNT];
    for keypoint in &pose.keypoints {
        let slot = &mut seen[keypoint.part as usize];
        if *slot {
            return Err(EncodeError::DuplicatePart(keypoint.part));
        }
        *slot = true;
    }

    let mut sorted: Vec<&Keypoint> = pose.keypoints.iter().collect();
    sorted.sort_by_cached_key(|k| k.part.name().to_ascii_lowercase());

    let mut values = Vec::with_capacity(PoseVector::LEN);
    for keypoint in &sorted {
        values.push(keypoint.x);
        values.push(keypoint.y);
    }
    let mut confidence_sum = 0.0f32;
    for keypoint in &sorted {
        values.push(keypoint.confidence);
        confidence_sum += keypoint.confidence;
    }
    values.push(confidence_sum);

    Ok(PoseVector::new(values))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Complete pose with part `i` (detector order) at `(10 * i, 20 * i)`.
    pub(crate) fn make_pose(confidence: f32) -> Pose {
        Pose {
            confidence,
            keypoints: BodyPart::ALL
                .iter()
                .enumerate()
                .map(|(i, &part)| Keypoint {
                    part,
                    x: 10.0 * i as f32,
                    y: 20.0 * i as f32,
                    confidence,
                })
                .collect(),
        }
    }

    #[test]
    fn test_encode_length() {
        let v = encode(&make_pose(1.0)).unwrap();
        assert_eq!(v.len(), 52);
    }

    #[test]
    fn test_encode_deterministic() {
        let pose = make_pose(0.8);
        assert_eq!(encode(&pose).unwrap(), encode(&pose).unwrap());
    }

    #[test]
    fn test_encode_ignores_input_order() {
        let pose = make_pose(0.8);
        let mut shuffled = pose.clone();
        shuffled.keypoints.reverse();
        shuffled.keypoints.swap(3, 11);
        assert_eq!(encode(&pose).unwrap(), encode(&shuffled).unwrap());
    }

    #[test]
    fn test_encode_alphabetical_layout() {
        let pose = make_pose(1.0);
        let v = encode(&pose).unwrap();

        // "leftAnkle" sorts first; it is detector index 15.
        assert_eq!(v.values[0], 150.0);
        assert_eq!(v.values[1], 300.0);
        // "nose" sorts ninth (after the eight left* parts); detector index 0.
        assert_eq!(v.values[16], 0.0);
        assert_eq!(v.values[17], 0.0);
        // "rightWrist" sorts last; detector index 10.
        assert_eq!(v.values[32], 100.0);
        assert_eq!(v.values[33], 200.0);
    }

    #[test]
    fn test_encode_confidence_block() {
        let mut pose = make_pose(0.5);
        for kp in pose.keypoints.iter_mut() {
            if kp.part == BodyPart::LeftAnkle {
                kp.confidence = 0.25;
            }
        }
        let v = encode(&pose).unwrap();
        assert_eq!(v.values[34], 0.25);
        assert!(v.values[35..51].iter().all(|&c| c == 0.5));
        assert!((v.values[51] - (0.25 + 16.0 * 0.5)).abs() < 1e-5);
    }

    #[test]
    fn test_encode_does_not_mutate_input() {
        let pose = make_pose(0.9);
        let before = pose.clone();
        let _ = encode(&pose).unwrap();
        assert_eq!(pose, before);
    }

    #[test]
    fn test_encode_missing_part() {
        let mut pose = make_pose(1.0);
        pose.keypoints.pop();
        assert_eq!(encode(&pose), Err(EncodeError::WrongKeypointCount(16)));
    }

    #[test]
    fn test_encode_extra_part() {
        let mut pose = make_pose(1.0);
        let extra = pose.keypoints[0];
        pose.keypoints.push(extra);
        assert_eq!(encode(&pose), Err(EncodeError::WrongKeypointCount(18)));
    }

    #[test]
    fn test_encode_duplicate_part() {
        let mut pose = make_pose(1.0);
        pose.keypoints[16].part = BodyPart::Nose;
        assert_eq!(encode(&pose), Err(EncodeError::DuplicatePart(BodyPart::Nose)));
    }
}
