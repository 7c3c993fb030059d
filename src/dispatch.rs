//! The dispatch loop: pre-flight gate, session lifecycle, and the
//! per-task state machine.
//!
//! Tasks run strictly sequentially, in input order. The transport is a
//! single exclusively-owned session; the outcome log is owned here and
//! written by nothing else.

use crate::config::Config;
use crate::model::{Batch, DispatchOutcome, MediaKind, SentPart, Task, TaskOutcome};
use crate::pacing::Pacer;
use crate::render::{self, Fields};
use crate::report::Reporter;
use crate::transport::Transport;
use crate::validate;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Failure of a single send step. Recorded in the task's outcome; the
/// run continues with the next task.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport send failed: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("timed out waiting for delivery ack after {0:?}")]
    AckTimeout(Duration),
}

/// Everything the run produced, in task order.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcomes: Vec<TaskOutcome>,
}

impl RunSummary {
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Delivered { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::RecipientNotFound))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::PartialFailure { .. }))
    }

    fn count(&self, pred: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|t| pred(&t.outcome)).count()
    }
}

/// Validate the batch, then drive every task through the transport.
///
/// Validation happens before the session is opened; a rejected batch
/// never touches the transport. After a successful `open`, `close` runs
/// on every exit path, and a close failure is downgraded to a warning
/// so it cannot mask the run result.
pub async fn run(
    transport: &dyn Transport,
    reporter: &dyn Reporter,
    cfg: &Config,
    batch: &Batch,
) -> Result<RunSummary> {
    validate::validate(
        batch,
        &cfg.videos_root(),
        cfg.limits.video_max_bytes,
        reporter,
    )?;

    transport
        .open()
        .await
        .context("failed to open transport session")?;

    let result = drive(transport, reporter, cfg, batch).await;

    if let Err(err) = transport.close().await {
        reporter.warning(&format!("failed to close transport session: {err:#}"));
    }

    result
}

async fn drive(
    transport: &dyn Transport,
    reporter: &dyn Reporter,
    cfg: &Config,
    batch: &Batch,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    let pacer = Pacer::new(&cfg.pacing);

    reporter.info(&format!(
        "run {} started: {} task(s), waiting for the transport to sync",
        run_id,
        batch.len()
    ));
    pacer.wait_initial().await;

    let mut outcomes = Vec::with_capacity(batch.len());
    for (index, task) in batch.tasks.iter().enumerate() {
        reporter.info(&format!(
            "task #{} ({}) started",
            index + 1,
            task.display_name
        ));

        let outcome = run_task(transport, reporter, &pacer, cfg, task).await?;
        pacer.wait_after_task().await;

        let entry = TaskOutcome {
            index,
            recipient: task.display_name.clone(),
            outcome,
            recorded_at: Utc::now(),
        };
        reporter.task_outcome(&entry);
        outcomes.push(entry);
    }

    let summary = RunSummary { run_id, outcomes };
    reporter.info(&format!(
        "all tasks completed: {} delivered, {} not found, {} failed",
        summary.delivered(),
        summary.not_found(),
        summary.failed()
    ));
    Ok(summary)
}

/// One task through the state machine:
/// resolve → [text?] → [image?] → [video?] → [file?] → done.
async fn run_task(
    transport: &dyn Transport,
    reporter: &dyn Reporter,
    pacer: &Pacer,
    cfg: &Config,
    task: &Task,
) -> Result<DispatchOutcome> {
    let found = transport
        .find_by_identifier(&task.contact_key)
        .await
        .with_context(|| format!("contact lookup failed for \"{}\"", task.contact_key))?;
    if !found {
        reporter.info(&format!(
            "unable to find \"{}\", skipping to next recipient",
            task.contact_key
        ));
        return Ok(DispatchOutcome::RecipientNotFound);
    }

    let fields = Fields::from([("name", task.display_name.as_str())]);
    let message = render::render(task.message_template.as_deref(), &fields);

    let mut sent = Vec::new();
    for (part, step) in plan_steps(task, message, cfg) {
        reporter.info(&format!(
            "sending {} to {}",
            part.as_str(),
            task.display_name
        ));
        match send_step(transport, &step, cfg.pacing.ack_timeout()).await {
            Ok(()) => {
                pacer.wait_after_action().await;
                sent.push(part);
            }
            Err(err) => {
                return Ok(DispatchOutcome::PartialFailure {
                    parts: sent,
                    failed: part,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(DispatchOutcome::Delivered { parts: sent })
}

enum Step {
    Text(String),
    Media {
        kind: MediaKind,
        path: PathBuf,
        caption: Option<String>,
    },
}

/// Expand a task into its send steps, in the fixed part order. Absent
/// parts simply produce no step.
fn plan_steps(task: &Task, message: Option<String>, cfg: &Config) -> Vec<(SentPart, Step)> {
    let mut steps = Vec::new();
    if let Some(body) = message {
        steps.push((SentPart::Text, Step::Text(body)));
    }
    if let Some(att) = &task.image {
        steps.push((
            SentPart::Image,
            Step::Media {
                kind: MediaKind::Image,
                path: att.resolve(&cfg.images_root()),
                caption: att.caption.clone(),
            },
        ));
    }
    if let Some(att) = &task.video {
        steps.push((
            SentPart::Video,
            Step::Media {
                kind: MediaKind::Video,
                path: att.resolve(&cfg.videos_root()),
                caption: att.caption.clone(),
            },
        ));
    }
    if let Some(att) = &task.file {
        steps.push((
            SentPart::File,
            Step::Media {
                kind: MediaKind::File,
                path: att.resolve(&cfg.files_root()),
                caption: att.caption.clone(),
            },
        ));
    }
    steps
}

async fn send_step(
    transport: &dyn Transport,
    step: &Step,
    ack_timeout: Duration,
) -> Result<(), SendError> {
    let sent = match step {
        Step::Text(body) => transport.send_text(body).await,
        Step::Media {
            kind,
            path,
            caption,
        } => match kind {
            MediaKind::Image => transport.send_image(path, caption.as_deref()).await,
            MediaKind::Video => transport.send_video(path, caption.as_deref()).await,
            MediaKind::File => transport.send_file(path, caption.as_deref()).await,
        },
    };
    sent.map_err(SendError::Transport)?;

    match tokio::time::timeout(ack_timeout, transport.wait_for_sent_ack()).await {
        Ok(acked) => acked.map_err(SendError::Transport),
        Err(_) => Err(SendError::AckTimeout(ack_timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attachment;

    fn full_task() -> Task {
        Task {
            display_name: "Alice".into(),
            contact_key: "Alice".into(),
            message_template: Some("Hi {name}".into()),
            image: Some(Attachment::new("pic.jpg", Some("cap".into()))),
            video: Some(Attachment::new("clip.mp4", None)),
            file: Some(Attachment::new("doc.pdf", None)),
        }
    }

    #[test]
    fn steps_follow_fixed_part_order() {
        let cfg = Config::default();
        let steps = plan_steps(&full_task(), Some("Hi Alice".into()), &cfg);
        let parts: Vec<SentPart> = steps.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            parts,
            vec![SentPart::Text, SentPart::Image, SentPart::Video, SentPart::File]
        );
    }

    #[test]
    fn absent_parts_produce_no_steps() {
        let cfg = Config::default();
        let mut task = full_task();
        task.message_template = None;
        task.image = None;
        task.file = None;
        let steps = plan_steps(&task, None, &cfg);
        let parts: Vec<SentPart> = steps.iter().map(|(p, _)| *p).collect();
        assert_eq!(parts, vec![SentPart::Video]);
    }

    #[test]
    fn media_paths_resolve_under_category_roots() {
        let cfg = Config::default();
        let steps = plan_steps(&full_task(), None, &cfg);
        let paths: Vec<&PathBuf> = steps
            .iter()
            .filter_map(|(_, s)| match s {
                Step::Media { path, .. } => Some(path),
                Step::Text(_) => None,
            })
            .collect();
        assert_eq!(paths[0], &PathBuf::from("Images/pic.jpg"));
        assert_eq!(paths[1], &PathBuf::from("Videos/clip.mp4"));
        assert_eq!(paths[2], &PathBuf::from("Files/doc.pdf"));
    }

    #[test]
    fn caption_travels_with_its_attachment() {
        let cfg = Config::default();
        let steps = plan_steps(&full_task(), None, &cfg);
        match &steps[0].1 {
            Step::Media { caption, .. } => assert_eq!(caption.as_deref(), Some("cap")),
            Step::Text(_) => panic!("expected media step"),
        }
        match &steps[1].1 {
            Step::Media { caption, .. } => assert!(caption.is_none()),
            Step::Text(_) => panic!("expected media step"),
        }
    }
}
