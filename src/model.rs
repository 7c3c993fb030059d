use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Category a media attachment belongs to. Decides which root directory
/// the bare filename is resolved under and which send capability is used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    File,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::File => "file",
        }
    }
}

/// One payload part within a task, in the fixed send order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SentPart {
    Text,
    Image,
    Video,
    File,
}

impl SentPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentPart::Text => "text",
            SentPart::Image => "image",
            SentPart::Video => "video",
            SentPart::File => "file",
        }
    }
}

/// Reference to a media file to send, by bare filename.
///
/// The filename is resolved lazily against the category root (`Images/`,
/// `Videos/`, `Files/`); nothing is read from disk until validation or
/// sending needs it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub caption: Option<String>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            file_name: file_name.into(),
            caption,
        }
    }

    /// Full path of this attachment under the given category root.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.file_name)
    }

    /// Stat the attachment on disk and return its size in bytes.
    pub fn size_bytes(&self, root: &Path) -> std::io::Result<u64> {
        Ok(std::fs::metadata(self.resolve(root))?.len())
    }
}

/// One recipient's complete unit of work.
///
/// All four payload fields are optional; a task with none of them is a
/// no-op that still consumes the inter-task settle delay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Display name, used for templating and logging.
    pub display_name: String,
    /// Lookup key handed to the transport; may equal the display name.
    pub contact_key: String,
    pub message_template: Option<String>,
    pub image: Option<Attachment>,
    pub video: Option<Attachment>,
    pub file: Option<Attachment>,
}

impl Task {
    pub fn is_empty(&self) -> bool {
        self.message_template.is_none()
            && self.image.is_none()
            && self.video.is_none()
            && self.file.is_none()
    }
}

/// The full ordered set of tasks for one run. Insertion order is
/// dispatch order and is never changed after construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    pub tasks: Vec<Task>,
}

impl Batch {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Terminal result of dispatching one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every present part was sent and acknowledged.
    Delivered { parts: Vec<SentPart> },
    /// The transport could not locate the contact; nothing was sent.
    RecipientNotFound,
    /// A part failed mid-task; `parts` lists what had already been sent.
    PartialFailure {
        parts: Vec<SentPart>,
        failed: SentPart,
        error: String,
    },
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Delivered { .. } => "delivered",
            DispatchOutcome::RecipientNotFound => "recipient_not_found",
            DispatchOutcome::PartialFailure { .. } => "partial_failure",
        }
    }
}

/// Outcome log entry, produced exactly once per task, in task order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Zero-based position of the task in the batch.
    pub index: usize,
    /// Recipient display name, for audit logs.
    pub recipient: String,
    pub outcome: DispatchOutcome,
    pub recorded_at: DateTime<Utc>,
}
