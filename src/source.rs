//! Batch source: decodes tabular input rows into dispatch tasks.
//!
//! The input is a CSV file with a header row naming nine columns:
//! `name, contact, message, image, image_caption, video, video_caption,
//! file, file_caption`. Blank cells mean the field is absent. Row order
//! is preserved exactly; it is the dispatch order.

use crate::model::{Attachment, Batch, Task};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const EXPECTED_COLUMNS: [&str; 9] = [
    "name",
    "contact",
    "message",
    "image",
    "image_caption",
    "video",
    "video_caption",
    "file",
    "file_caption",
];

#[derive(Debug, Error)]
pub enum RowDecodeError {
    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse batch file: {0}")]
    Csv(#[from] csv::Error),
    #[error("batch file is missing required column(s): {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
    #[error("row {row}: required column '{column}' is empty")]
    MissingField { row: usize, column: &'static str },
    #[error("row {row}: '{caption_column}' given without a '{media_column}' attachment")]
    CaptionWithoutAttachment {
        row: usize,
        caption_column: &'static str,
        media_column: &'static str,
    },
}

/// Raw row exactly as it appears in the file, before normalization.
#[derive(Debug, Deserialize)]
struct RawRow {
    name: Option<String>,
    contact: Option<String>,
    message: Option<String>,
    image: Option<String>,
    image_caption: Option<String>,
    video: Option<String>,
    video_caption: Option<String>,
    file: Option<String>,
    file_caption: Option<String>,
}

/// Load and decode the batch file into dispatch order.
pub fn load_batch(path: &Path) -> Result<Batch, RowDecodeError> {
    let mut reader = csv::Reader::from_path(path)?;
    check_headers(reader.headers()?)?;

    let mut tasks = Vec::new();
    for (i, record) in reader.deserialize::<RawRow>().enumerate() {
        // Data rows are numbered from 1, not counting the header.
        let row = i + 1;
        tasks.push(decode_row(row, record?)?);
    }
    Ok(Batch::new(tasks))
}

fn check_headers(headers: &csv::StringRecord) -> Result<(), RowDecodeError> {
    let missing: Vec<String> = EXPECTED_COLUMNS
        .iter()
        .filter(|expected| !headers.iter().any(|h| h.trim() == **expected))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RowDecodeError::MissingColumns { columns: missing })
    }
}

fn decode_row(row: usize, raw: RawRow) -> Result<Task, RowDecodeError> {
    let name = normalize(raw.name)
        .ok_or(RowDecodeError::MissingField { row, column: "name" })?;
    let contact = normalize(raw.contact).ok_or(RowDecodeError::MissingField {
        row,
        column: "contact",
    })?;

    Ok(Task {
        display_name: name,
        contact_key: contact,
        message_template: normalize(raw.message),
        image: attachment(row, raw.image, raw.image_caption, "image", "image_caption")?,
        video: attachment(row, raw.video, raw.video_caption, "video", "video_caption")?,
        file: attachment(row, raw.file, raw.file_caption, "file", "file_caption")?,
    })
}

/// Blank or whitespace-only cells count as absent.
fn normalize(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn attachment(
    row: usize,
    path: Option<String>,
    caption: Option<String>,
    media_column: &'static str,
    caption_column: &'static str,
) -> Result<Option<Attachment>, RowDecodeError> {
    let path = normalize(path);
    let caption = normalize(caption);
    match (path, caption) {
        (Some(file_name), caption) => Ok(Some(Attachment::new(file_name, caption))),
        (None, Some(_)) => Err(RowDecodeError::CaptionWithoutAttachment {
            row,
            caption_column,
            media_column,
        }),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &str = "name,contact,message,image,image_caption,video,video_caption,file,file_caption";

    fn write_batch(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let td = tempdir().unwrap();
        let path = td.path().join("batch.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        (td, path)
    }

    #[test]
    fn decodes_full_row() {
        let (_td, path) = write_batch(&[
            HEADER,
            "Alice,Alice W,Hi {name},pic.jpg,look!,clip.mp4,,doc.pdf,the doc",
        ]);
        let batch = load_batch(&path).unwrap();
        assert_eq!(batch.len(), 1);
        let task = &batch.tasks[0];
        assert_eq!(task.display_name, "Alice");
        assert_eq!(task.contact_key, "Alice W");
        assert_eq!(task.message_template.as_deref(), Some("Hi {name}"));
        assert_eq!(
            task.image,
            Some(Attachment::new("pic.jpg", Some("look!".into())))
        );
        assert_eq!(task.video, Some(Attachment::new("clip.mp4", None)));
        assert_eq!(
            task.file,
            Some(Attachment::new("doc.pdf", Some("the doc".into())))
        );
    }

    #[test]
    fn blank_cells_are_absent() {
        let (_td, path) = write_batch(&[HEADER, "Bob,Bob,,,,,,,"]);
        let batch = load_batch(&path).unwrap();
        let task = &batch.tasks[0];
        assert!(task.is_empty());
    }

    #[test]
    fn preserves_row_order() {
        let (_td, path) = write_batch(&[
            HEADER,
            "First,c1,hi,,,,,,",
            "Second,c2,hi,,,,,,",
            "Third,c3,hi,,,,,,",
        ]);
        let batch = load_batch(&path).unwrap();
        let names: Vec<&str> = batch.tasks.iter().map(|t| t.display_name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn missing_columns_rejected() {
        let (_td, path) = write_batch(&["name,contact,message", "Alice,Alice,hi"]);
        let err = load_batch(&path).unwrap_err();
        match err {
            RowDecodeError::MissingColumns { columns } => {
                assert!(columns.contains(&"video".to_string()));
                assert!(columns.contains(&"file_caption".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_row_rejected() {
        let (_td, path) = write_batch(&[HEADER, "Alice,Alice,hi"]);
        assert!(matches!(
            load_batch(&path).unwrap_err(),
            RowDecodeError::Csv(_)
        ));
    }

    #[test]
    fn empty_contact_rejected() {
        let (_td, path) = write_batch(&[HEADER, "Alice, ,hi,,,,,,"]);
        let err = load_batch(&path).unwrap_err();
        match err {
            RowDecodeError::MissingField { row, column } => {
                assert_eq!(row, 1);
                assert_eq!(column, "contact");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn caption_without_attachment_rejected() {
        let (_td, path) = write_batch(&[HEADER, "Alice,Alice,,,,,orphan caption,,"]);
        let err = load_batch(&path).unwrap_err();
        match err {
            RowDecodeError::CaptionWithoutAttachment {
                row,
                caption_column,
                media_column,
            } => {
                assert_eq!(row, 1);
                assert_eq!(caption_column, "video_caption");
                assert_eq!(media_column, "video");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
