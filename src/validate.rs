//! Pre-flight payload validation.
//!
//! Runs over the whole batch before any session is opened. A single
//! oversized or unreadable video rejects the entire batch: a transfer
//! known to fail partway through delivery is worse than failing before
//! the first message goes out.

use crate::model::Batch;
use crate::report::Reporter;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("attachment {} is unreadable: {source}", path.display())]
    AttachmentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} video attachment(s) exceed the transport size limit: {}", names.len(), names.join(", "))]
    OversizeAttachments { names: Vec<String> },
}

/// Check every video attachment in the batch against the transport's
/// hard size limit. Warns once per distinct offending filename, then
/// fails with the aggregate list.
pub fn validate(
    batch: &Batch,
    videos_root: &Path,
    limit_bytes: u64,
    reporter: &dyn Reporter,
) -> Result<(), ValidationError> {
    let mut oversize: Vec<String> = Vec::new();

    for task in &batch.tasks {
        let Some(video) = &task.video else {
            continue;
        };
        let size =
            video
                .size_bytes(videos_root)
                .map_err(|source| ValidationError::AttachmentUnreadable {
                    path: video.resolve(videos_root),
                    source,
                })?;
        if size >= limit_bytes && !oversize.contains(&video.file_name) {
            reporter.warning(&format!(
                "video file {} is {} bytes, over the {} byte transport limit",
                video.file_name, size, limit_bytes
            ));
            oversize.push(video.file_name.clone());
        }
    }

    if oversize.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::OversizeAttachments { names: oversize })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attachment, Task, TaskOutcome};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingReporter {
        warnings: Mutex<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn info(&self, _message: &str) {}
        fn warning(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }
        fn task_outcome(&self, _outcome: &TaskOutcome) {}
    }

    fn video_task(file_name: &str) -> Task {
        Task {
            display_name: "Alice".into(),
            contact_key: "Alice".into(),
            message_template: None,
            image: None,
            video: Some(Attachment::new(file_name, None)),
            file: None,
        }
    }

    fn write_file(dir: &Path, name: &str, len: usize) {
        fs::write(dir.join(name), vec![0u8; len]).unwrap();
    }

    #[test]
    fn accepts_videos_under_limit() {
        let td = tempdir().unwrap();
        write_file(td.path(), "small.mp4", 100);
        let batch = Batch::new(vec![video_task("small.mp4")]);
        let reporter = RecordingReporter::default();

        validate(&batch, td.path(), 1024, &reporter).unwrap();
        assert!(reporter.warnings.lock().unwrap().is_empty());
    }

    #[test]
    fn rejects_oversize_video() {
        let td = tempdir().unwrap();
        write_file(td.path(), "big.mp4", 2048);
        let batch = Batch::new(vec![video_task("big.mp4")]);
        let reporter = RecordingReporter::default();

        let err = validate(&batch, td.path(), 1024, &reporter).unwrap_err();
        match err {
            ValidationError::OversizeAttachments { names } => {
                assert_eq!(names, vec!["big.mp4".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(reporter.warnings.lock().unwrap().len(), 1);
    }

    #[test]
    fn size_equal_to_limit_is_rejected() {
        let td = tempdir().unwrap();
        write_file(td.path(), "edge.mp4", 1024);
        let batch = Batch::new(vec![video_task("edge.mp4")]);
        let reporter = RecordingReporter::default();

        assert!(validate(&batch, td.path(), 1024, &reporter).is_err());
    }

    #[test]
    fn repeated_oversize_file_warns_once() {
        let td = tempdir().unwrap();
        write_file(td.path(), "big.mp4", 2048);
        write_file(td.path(), "huge.mp4", 4096);
        let batch = Batch::new(vec![
            video_task("big.mp4"),
            video_task("big.mp4"),
            video_task("huge.mp4"),
            video_task("big.mp4"),
        ]);
        let reporter = RecordingReporter::default();

        let err = validate(&batch, td.path(), 1024, &reporter).unwrap_err();
        match err {
            ValidationError::OversizeAttachments { names } => {
                assert_eq!(names, vec!["big.mp4".to_string(), "huge.mp4".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(reporter.warnings.lock().unwrap().len(), 2);
    }

    #[test]
    fn missing_video_file_is_unreadable() {
        let td = tempdir().unwrap();
        let batch = Batch::new(vec![video_task("gone.mp4")]);
        let reporter = RecordingReporter::default();

        let err = validate(&batch, td.path(), 1024, &reporter).unwrap_err();
        match err {
            ValidationError::AttachmentUnreadable { path, .. } => {
                assert!(path.ends_with("gone.mp4"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tasks_without_video_are_skipped() {
        let td = tempdir().unwrap();
        let mut task = video_task("ignored.mp4");
        task.video = None;
        task.image = Some(Attachment::new("pic.jpg", None));
        let batch = Batch::new(vec![task]);
        let reporter = RecordingReporter::default();

        // The image doesn't exist on disk; only videos are checked here.
        validate(&batch, td.path(), 1024, &reporter).unwrap();
    }
}
