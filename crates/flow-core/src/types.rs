use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of body parts a complete pose carries.
pub const BODY_PART_COUNT: usize = 17;

/// Body parts recognised by the pose estimator, named as the detector emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    /// All parts in detector output order.
    pub const ALL: [BodyPart; BODY_PART_COUNT] = [
        BodyPart::Nose,
        BodyPart::LeftEye,
        BodyPart::RightEye,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightAnkle,
    ];

    /// Detector label for this part (e.g. "leftShoulder").
    pub fn name(self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftEye => "leftEye",
            BodyPart::RightEye => "rightEye",
            BodyPart::LeftEar => "leftEar",
            BodyPart::RightEar => "rightEar",
            BodyPart::LeftShoulder => "leftShoulder",
            BodyPart::RightShoulder => "rightShoulder",
            BodyPart::LeftElbow => "leftElbow",
            BodyPart::RightElbow => "rightElbow",
            BodyPart::LeftWrist => "leftWrist",
            BodyPart::RightWrist => "rightWrist",
            BodyPart::LeftHip => "leftHip",
            BodyPart::RightHip => "rightHip",
            BodyPart::LeftKnee => "leftKnee",
            BodyPart::RightKnee => "rightKnee",
            BodyPart::LeftAnkle => "leftAnkle",
            BodyPart::RightAnkle => "rightAnkle",
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single detected body part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "KeypointRecord", into = "KeypointRecord")]
pub struct Keypoint {
    pub part: BodyPart,
    pub x: f32,
    pub y: f32,
    /// Detection confidence in [0.0, 1.0].
    pub confidence: f32,
}

/// On-the-wire keypoint layout: `{ "part", "score", "position": { "x", "y" } }`.
#[derive(Serialize, Deserialize)]
struct KeypointRecord {
    part: BodyPart,
    score: f32,
    position: Position,
}

#[derive(Serialize, Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

impl From<KeypointRecord> for Keypoint {
    fn from(record: KeypointRecord) -> Self {
        Self {
            part: record.part,
            x: record.position.x,
            y: record.position.y,
            confidence: record.score,
        }
    }
}

impl From<Keypoint> for KeypointRecord {
    fn from(keypoint: Keypoint) -> Self {
        Self {
            part: keypoint.part,
            score: keypoint.confidence,
            position: Position {
                x: keypoint.x,
                y: keypoint.y,
            },
        }
    }
}

/// A detected person: one keypoint per body part plus an overall confidence.
///
/// Keypoint order is not significant. Completeness is checked by the encoder,
/// not at construction, so partial detections can still be inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Aggregate detection quality in [0.0, 1.0].
    #[serde(rename = "score")]
    pub confidence: f32,
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    /// Look up the keypoint for a body part, if detected.
    pub fn keypoint(&self, part: BodyPart) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.part == part)
    }
}

/// Fixed-layout flattening of a [`Pose`].
///
/// Layout for a vector produced by the encoder:
/// `[0, 34)` x/y pairs, `[34, 51)` per-part confidences, `[51]` confidence total,
/// all in case-insensitive alphabetical part order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseVector {
    pub values: Vec<f32>,
}

impl PoseVector {
    /// Number of interleaved coordinate slots.
    pub const XY_LEN: usize = BODY_PART_COUNT * 2;
    /// Total length of an encoded vector.
    pub const LEN: usize = Self::XY_LEN + BODY_PART_COUNT + 1;

    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Interleaved x/y coordinates.
    pub fn xy(&self) -> &[f32] {
        &self.values[..Self::XY_LEN.min(self.values.len())]
    }

    /// Per-part confidences.
    pub fn confidences(&self) -> &[f32] {
        let end = (Self::XY_LEN + BODY_PART_COUNT).min(self.values.len());
        &self.values[Self::XY_LEN.min(end)..end]
    }

    /// Confidence total stored in the final slot.
    pub fn confidence_sum(&self) -> Option<f32> {
        self.values.get(Self::LEN - 1).copied()
    }
}

impl AsRef<[f32]> for PoseVector {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}
