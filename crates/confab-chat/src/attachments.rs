//! Attachment intake.
//!
//! Files are read concurrently, base64-encoded for storage regardless of
//! type, and text-typed payloads can be inlined into an outgoing prompt.

use std::path::Path;

use futures::future::try_join_all;

use confab_core::types::Attachment;

/// A file selected for attachment, before encoding.
#[derive(Clone, Debug)]
pub struct AttachmentInput {
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

impl AttachmentInput {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }

    /// Read one file, inferring its MIME type from the extension.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            mime: mime_for_path(path).to_string(),
            data,
        })
    }

    /// Encode for storage inside the conversation record.
    pub fn encode(&self) -> Attachment {
        Attachment::from_bytes(&self.name, &self.mime, &self.data)
    }
}

/// Read all files concurrently. Completion order does not matter; every read
/// must succeed before the send request is built.
pub async fn read_inputs(paths: &[impl AsRef<Path>]) -> std::io::Result<Vec<AttachmentInput>> {
    try_join_all(paths.iter().map(|p| AttachmentInput::read(p.as_ref()))).await
}

/// MIME type guess by file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.txt")), "text/plain");
        assert_eq!(mime_for_path(Path::new("a.MD")), "text/markdown");
        assert_eq!(mime_for_path(Path::new("a.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_encode_round_trips() {
        let input = AttachmentInput::new("notes.txt", "text/plain", b"hello".to_vec());
        let attachment = input.encode();
        assert!(attachment.is_text());
        assert_eq!(attachment.decode_text().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_read_infers_name_and_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        tokio::fs::write(&path, "# heading").await.unwrap();

        let input = AttachmentInput::read(&path).await.unwrap();
        assert_eq!(input.name, "report.md");
        assert_eq!(input.mime, "text/markdown");
        assert_eq!(input.data, b"# heading");
    }

    #[tokio::test]
    async fn test_read_inputs_reads_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.csv");
        tokio::fs::write(&a, "aaa").await.unwrap();
        tokio::fs::write(&b, "1,2").await.unwrap();

        let inputs = read_inputs(&[a, b]).await.unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].name, "a.txt");
        assert_eq!(inputs[1].mime, "text/csv");
    }

    #[tokio::test]
    async fn test_read_inputs_fails_when_any_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        tokio::fs::write(&a, "aaa").await.unwrap();
        let missing = dir.path().join("missing.txt");

        assert!(read_inputs(&[a, missing]).await.is_err());
    }
}
