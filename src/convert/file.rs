//! The user's file pick, as handed over by the presentation layer.

use std::path::Path;

/// A file chosen for conversion, fully loaded in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    /// File name including extension, without directories.
    pub name: String,
    /// MIME type as reported by the picker (may be empty).
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read `path` from disk, guessing the MIME type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = guess_mime(&name).to_string();
        Ok(Self { name, mime, bytes })
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Text content: a `text` MIME type or a `.txt` name.
    pub fn is_text_like(&self) -> bool {
        self.mime.contains("text") || self.name.to_lowercase().ends_with(".txt")
    }

    /// Image content: an `image/*` MIME type.
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// MIME type for a file name, by extension.
///
/// ```
/// use convert_easy::convert::guess_mime;
///
/// assert_eq!(guess_mime("notes.TXT"), "text/plain");
/// assert_eq!(guess_mime("photo.jpeg"), "image/jpeg");
/// assert_eq!(guess_mime("archive.zip"), "application/octet-stream");
/// ```
pub fn guess_mime(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "xml" => "text/xml",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
