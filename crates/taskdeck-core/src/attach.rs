use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{debug, instrument};

use crate::error::Error;
use crate::task::Attachment;

/// Read every file into a data-URL attachment. One failed read fails the
/// whole batch; task creation only proceeds with the complete list.
#[instrument(skip(paths))]
pub fn read_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>, Error> {
    paths.iter().map(|path| read_one(path)).collect()
}

fn read_one(path: &Path) -> Result<Attachment, Error> {
    let bytes = fs::read(path)
        .map_err(|err| Error::io(format!("failed to read attachment {}", path.display()), err))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = guess_mime(path);
    let data = format!("data:{mime_type};base64,{}", B64.encode(&bytes));

    debug!(name = %name, mime = mime_type, bytes = bytes.len(), "attachment ingested");
    Ok(Attachment {
        name,
        mime_type: mime_type.to_string(),
        data,
    })
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::read_attachments;
    use crate::error::Error;

    #[test]
    fn builds_a_data_url_per_file() {
        let temp = tempdir().expect("tempdir");
        let note = temp.path().join("note.txt");
        fs::write(&note, b"remember the milk").expect("write note");

        let attachments = read_attachments(&[note]).expect("read");
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "note.txt");
        assert_eq!(attachments[0].mime_type, "text/plain");
        assert!(attachments[0].data.starts_with("data:text/plain;base64,"));
    }

    #[test]
    fn one_missing_file_fails_the_whole_batch() {
        let temp = tempdir().expect("tempdir");
        let present = temp.path().join("a.txt");
        fs::write(&present, b"ok").expect("write");
        let missing = temp.path().join("missing.txt");

        let err = read_attachments(&[present, missing]).expect_err("must fail");
        assert!(matches!(err, Error::Io { .. }));
    }
}
