use crate::config::LiveConfig;
use flow_core::{
    classify, encode, validate_reference, EncodeError, Feedback, KeypointSource, Pose, PoseVector,
    ScoreError, Scorer, SourceError, WeightedDistance,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("reference photo does not contain a complete pose: {0}")]
    Malformed(#[from] EncodeError),
    #[error("could not analyze reference photo, please retry")]
    Unusable(#[source] ScoreError),
}

/// One published tick result.
#[derive(Debug, Clone)]
pub struct LiveUpdate {
    /// Epoch of the `start()` that produced this update.
    pub epoch: u64,
    /// Index of this update within its epoch.
    pub sequence: u64,
    pub pose: Arc<Pose>,
    /// Absent while no reference is set.
    pub score: Option<f32>,
    pub feedback: Option<Feedback>,
}

/// State shared between the controller and its sampling task.
struct Shared {
    reference: watch::Sender<Option<Arc<PoseVector>>>,
    updates: watch::Sender<Option<LiveUpdate>>,
    epoch: AtomicU64,
    stalled: AtomicBool,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Live comparison loop: samples a [`KeypointSource`] on a fixed period and
/// scores every sample against the current reference pose.
///
/// Idle until [`start`](Self::start); [`stop`](Self::stop) returns it to Idle.
/// The reference can be replaced or cleared in either state.
pub struct LiveComparison<S, M = WeightedDistance> {
    source: Arc<S>,
    scorer: Arc<M>,
    config: LiveConfig,
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl<S> LiveComparison<S>
where
    S: KeypointSource + Send + Sync + 'static,
{
    pub fn new(source: Arc<S>, config: LiveConfig) -> Self {
        Self::with_scorer(source, WeightedDistance, config)
    }
}

impl<S, M> LiveComparison<S, M>
where
    S: KeypointSource + Send + Sync + 'static,
    M: Scorer + Send + Sync + 'static,
{
    pub fn with_scorer(source: Arc<S>, scorer: M, config: LiveConfig) -> Self {
        let (reference, _) = watch::channel(None);
        let (updates, _) = watch::channel(None);
        Self {
            source,
            scorer: Arc::new(scorer),
            config,
            shared: Arc::new(Shared {
                reference,
                updates,
                epoch: AtomicU64::new(0),
                stalled: AtomicBool::new(false),
            }),
            running: None,
        }
    }

    /// Begin sampling. Must be called from within a tokio runtime.
    ///
    /// No-op while already running.
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("live comparison already running");
            return;
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.stalled.store(false, Ordering::Release);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sample_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.scorer),
            Arc::clone(&self.shared),
            self.config.clone(),
            epoch,
            cancel.clone(),
        ));

        tracing::info!(
            epoch,
            interval_ms = self.config.sample_interval().as_millis() as u64,
            "live comparison started"
        );
        self.running = Some(Running { cancel, handle });
    }

    /// Stop sampling and clear the published result.
    ///
    /// Waits up to `stop_grace` for an in-flight tick, then aborts it. Once
    /// this returns, nothing more is published for the stopped epoch.
    pub async fn stop(&mut self) {
        let Some(Running { cancel, mut handle }) = self.running.take() else {
            return;
        };

        // Results tagged with the old epoch are now refused.
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        cancel.cancel();

        if tokio::time::timeout(self.config.stop_grace(), &mut handle)
            .await
            .is_err()
        {
            tracing::warn!(
                grace_ms = self.config.stop_grace_ms,
                "sampling task did not finish within grace period; aborting"
            );
            handle.abort();
            let _ = handle.await;
        }

        self.shared.updates.send_replace(None);
        self.shared.stalled.store(false, Ordering::Release);
        tracing::info!("live comparison stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Encode `pose` and install it as the reference.
    pub fn set_reference(&self, pose: &Pose) -> Result<(), ReferenceError> {
        let vector = encode(pose)?;
        self.set_reference_vector(vector)
    }

    /// Install an already encoded reference vector.
    pub fn set_reference_vector(&self, vector: PoseVector) -> Result<(), ReferenceError> {
        let confidence_total = validate_reference(&vector).map_err(ReferenceError::Unusable)?;
        self.shared.reference.send_replace(Some(Arc::new(vector)));
        tracing::info!(confidence_total, "reference pose set");
        Ok(())
    }

    /// Remove the reference. The latest update keeps its pose but loses its score.
    pub fn clear_reference(&self) {
        self.shared.reference.send_replace(None);
        self.shared.updates.send_modify(|latest| {
            if let Some(update) = latest {
                update.score = None;
                update.feedback = None;
            }
        });
        tracing::info!("reference pose cleared");
    }

    pub fn reference(&self) -> Option<Arc<PoseVector>> {
        self.shared.reference.borrow().clone()
    }

    /// Receiver that observes every published update (and the clear on stop).
    pub fn subscribe(&self) -> watch::Receiver<Option<LiveUpdate>> {
        self.shared.updates.subscribe()
    }

    pub fn latest(&self) -> Option<LiveUpdate> {
        self.shared.updates.borrow().clone()
    }

    /// True once the source has been not-ready for `unavailable_warn_after`
    /// consecutive ticks, until it produces a pose again.
    pub fn source_stalled(&self) -> bool {
        self.shared.stalled.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }
}

impl<S, M> Drop for LiveComparison<S, M> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

/// Sampling task body. Each tick awaits its detection inline, so at most one
/// detection is in flight; ticks missed meanwhile are skipped, not queued.
async fn sample_loop<S, M>(
    source: Arc<S>,
    scorer: Arc<M>,
    shared: Arc<Shared>,
    config: LiveConfig,
    epoch: u64,
    cancel: CancellationToken,
) where
    S: KeypointSource + Send + Sync + 'static,
    M: Scorer + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(config.sample_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sequence = 0u64;
    let mut not_ready = 0u32;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let sample = tokio::select! {
            _ = cancel.cancelled() => break,
            sample = source.sample() => sample,
        };

        let pose = match sample {
            Ok(pose) => {
                if shared.stalled.swap(false, Ordering::AcqRel) {
                    tracing::info!(epoch, skipped = not_ready, "keypoint source recovered");
                }
                not_ready = 0;
                pose
            }
            Err(SourceError::Unavailable) => {
                not_ready = not_ready.saturating_add(1);
                if config.unavailable_warn_after > 0 && not_ready == config.unavailable_warn_after {
                    tracing::warn!(epoch, ticks = not_ready, "keypoint source still not ready");
                    shared.stalled.store(true, Ordering::Release);
                } else {
                    tracing::trace!(
                        epoch,
                        ticks = not_ready,
                        "keypoint source not ready; tick skipped"
                    );
                }
                continue;
            }
            Err(err) => {
                tracing::warn!(epoch, error = %err, "sample failed; tick skipped");
                continue;
            }
        };

        let vector = match encode(&pose) {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!(epoch, error = %err, "malformed pose; tick skipped");
                continue;
            }
        };

        if !publish(&shared, &*scorer, epoch, sequence, pose, &vector) {
            break;
        }
        sequence += 1;
    }

    tracing::debug!(epoch, published = sequence, "sampling task exited");
}

/// Score `vector` against the current reference and publish the result.
///
/// Runs without an await point. `stop()` bumps the epoch and then joins or
/// aborts the task before clearing, so a publish either finishes before that
/// clear or sees the stale epoch and returns false. The reference stays
/// read-locked until the update is sent, so a concurrent `clear_reference`
/// either lands before scoring or strips the score afterwards.
fn publish<M: Scorer>(
    shared: &Shared,
    scorer: &M,
    epoch: u64,
    sequence: u64,
    pose: Pose,
    vector: &PoseVector,
) -> bool {
    let reference = shared.reference.borrow();
    if shared.epoch.load(Ordering::Acquire) != epoch {
        return false;
    }

    let (score, feedback) = match reference.as_deref() {
        None => (None, None),
        Some(reference) => match scorer.score(reference, vector) {
            Ok(score) => match classify(score) {
                Ok(feedback) => (Some(score), Some(feedback)),
                Err(err) => {
                    tracing::warn!(epoch, error = %err, "scorer produced an unclassifiable score");
                    (None, None)
                }
            },
            Err(err @ ScoreError::VectorShape { .. }) => {
                tracing::error!(epoch, error = %err, "pose vector shape mismatch");
                (None, None)
            }
            Err(err) => {
                tracing::warn!(epoch, error = %err, "reference rejected by scorer");
                (None, None)
            }
        },
    };

    tracing::trace!(epoch, sequence, score = ?score, "publishing live update");
    shared.updates.send_replace(Some(LiveUpdate {
        epoch,
        sequence,
        pose: Arc::new(pose),
        score,
        feedback,
    }));
    true
}
