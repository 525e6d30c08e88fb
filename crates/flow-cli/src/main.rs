use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flow_core::{classify, encode, score, validate_reference, Feedback, Pose};
use flow_live::{LiveComparison, LiveConfig, LiveUpdate, ReferenceError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod replay;

use replay::ReplaySource;

#[derive(Parser)]
#[command(name = "flow", about = "Score poses against a reference photo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the 52-element vector for a pose
    Encode {
        /// Pose JSON file (detector output)
        pose: PathBuf,
    },
    /// Score a candidate pose against a reference pose
    Score {
        #[arg(short, long)]
        reference: PathBuf,
        #[arg(short, long)]
        candidate: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Replay recorded poses through the live comparison loop
    Live {
        #[arg(short, long)]
        reference: PathBuf,
        /// JSON-lines file, one pose (or `null`) per line
        #[arg(short, long)]
        samples: PathBuf,
        /// TOML config file; FLOW_* environment variables still override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the sampling interval
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Print JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { pose } => {
            let pose = read_pose(&pose)?;
            let vector = encode(&pose)?;
            println!("{}", serde_json::to_string(&vector)?);
        }
        Commands::Score {
            reference,
            candidate,
            json,
        } => {
            let (score, feedback) = score_poses(&read_pose(&reference)?, &read_pose(&candidate)?)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "score": score, "feedback": feedback })
                );
            } else {
                println!("{score:.3}  {feedback}");
            }
        }
        Commands::Live {
            reference,
            samples,
            config,
            interval_ms,
            json,
        } => {
            let mut config = match config {
                Some(path) => LiveConfig::load(&path)?,
                None => LiveConfig::from_env(),
            };
            if let Some(ms) = interval_ms {
                config.sample_interval_ms = ms;
            }
            run_live(&reference, &samples, config, json).await?;
        }
    }

    Ok(())
}

/// One-shot comparison. Reference problems surface the same way as in the live loop.
fn score_poses(reference: &Pose, candidate: &Pose) -> Result<(f32, Feedback)> {
    let reference = encode(reference).map_err(ReferenceError::Malformed)?;
    validate_reference(&reference).map_err(ReferenceError::Unusable)?;
    let candidate = encode(candidate).context("candidate pose")?;
    let score = score(&reference, &candidate)?;
    Ok((score, classify(score)?))
}

async fn run_live(reference: &Path, samples: &Path, config: LiveConfig, json: bool) -> Result<()> {
    let reference = read_pose(reference)?;
    let source = Arc::new(ReplaySource::load(samples)?);
    let expected = source.publishable() as u64;
    if expected == 0 {
        bail!("{} contains no complete poses", samples.display());
    }
    tracing::info!(frames = source.len(), poses = expected, "replay loaded");

    let mut live = LiveComparison::new(Arc::clone(&source), config);
    live.set_reference(&reference)?;

    let mut rx = live.subscribe();
    live.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let update = rx.borrow_and_update().clone();
                let Some(update) = update else {
                    continue;
                };
                print_update(&update, json);
                if update.sequence + 1 >= expected {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    live.stop().await;
    Ok(())
}

fn print_update(update: &LiveUpdate, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "sequence": update.sequence,
                "score": update.score,
                "feedback": update.feedback,
            })
        );
        return;
    }
    match (update.score, update.feedback) {
        (Some(score), Some(feedback)) => {
            println!("#{:<4} {score:>9.3}  {feedback}", update.sequence)
        }
        _ => println!("#{:<4} no score yet", update.sequence),
    }
}

fn read_pose(path: &Path) -> Result<Pose> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pose {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid pose JSON {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{BodyPart, Keypoint};

    fn make_pose(confidence: f32) -> Pose {
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
    fn test_score_poses() {
        let (score, feedback) = score_poses(&make_pose(1.0), &make_pose(0.3)).unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(feedback, Feedback::Immaculate);
    }

    #[test]
    fn test_score_poses_unusable_reference_message() {
        let err = score_poses(&make_pose(0.0), &make_pose(1.0)).unwrap_err();
        assert_eq!(err.to_string(), "could not analyze reference photo, please retry");

        let mut negative = make_pose(1.0);
        negative.keypoints[0].confidence = -5.0;
        let err = score_poses(&negative, &make_pose(1.0)).unwrap_err();
        assert_eq!(err.to_string(), "could not analyze reference photo, please retry");
    }

    #[test]
    fn test_score_poses_incomplete_candidate() {
        let mut candidate = make_pose(1.0);
        candidate.keypoints.pop();
        let err = score_poses(&make_pose(1.0), &candidate).unwrap_err();
        assert_eq!(err.to_string(), "candidate pose");
    }
}
