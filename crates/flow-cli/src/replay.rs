//! JSON-lines replay of recorded detector output.
//!
//! One pose per line in detector JSON shape. A `null` line stands for a frame
//! where the camera or model was not ready yet. Blank lines are ignored.

use anyhow::{Context, Result};
use flow_core::{encode, KeypointSource, Pose, SourceError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ReplaySource {
    frames: Vec<Option<Pose>>,
    cursor: AtomicUsize,
}

impl ReplaySource {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read samples {}", path.display()))?;
        Self::from_jsonl(&text).with_context(|| format!("invalid samples {}", path.display()))
    }

    pub fn from_jsonl(text: &str) -> Result<Self> {
        let mut frames = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame: Option<Pose> =
                serde_json::from_str(line).with_context(|| format!("line {}", n + 1))?;
            frames.push(frame);
        }
        Ok(Self {
            frames,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Frames in the file, including not-ready ones.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Frames that will make it through the encoder and be published.
    pub fn publishable(&self) -> usize {
        self.frames
            .iter()
            .flatten()
            .filter(|pose| encode(pose).is_ok())
            .count()
    }
}

impl KeypointSource for ReplaySource {
    async fn sample(&self) -> Result<Pose, SourceError> {
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        match self.frames.get(index) {
            Some(Some(pose)) => Ok(pose.clone()),
            Some(None) => Err(SourceError::Unavailable),
            None => {
                tracing::trace!(index, "replay exhausted");
                Err(SourceError::Unavailable)
            }
        }
    }
}
