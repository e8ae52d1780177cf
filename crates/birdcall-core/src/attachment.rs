//! Path-backed attachment used by the CLI.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use crate::ports::Attachment;

#[derive(Clone, Debug)]
pub struct FileAttachment {
    path: PathBuf,
    name: String,
    mime_type: String,
}

impl FileAttachment {
    /// MIME type is inferred from the file extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_from_extension(&path).to_string();
        Self::with_mime(path, mime_type)
    }

    pub fn with_mime(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            path,
            name,
            mime_type: mime_type.into(),
        }
    }
}

impl Attachment for FileAttachment {
    fn is_accessible(&self) -> bool {
        File::open(&self.path)
            .and_then(|f| f.metadata())
            .map(|md| md.is_file())
            .unwrap_or(false)
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
