// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Picked-content capability used to import a custom model file.

use std::io::Read;
use std::path::PathBuf;

/// An opaque reference to user-picked content.
pub trait ContentSource: Send + Sync + 'static {
    /// Name to give the local copy (usually the picked file's name).
    fn display_name(&self) -> String;

    /// Opens the content for reading.
    fn open(&self) -> std::io::Result<Box<dyn Read + Send>>;
}

/// A [`ContentSource`] backed by a plain filesystem path.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ContentSource for FileSource {
    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        let file = std::fs::File::open(&self.path)?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_file_name() {
        let source = FileSource::new("/models/custom/tiny.gguf");
        assert_eq!(source.display_name(), "tiny.gguf");
    }

    #[test]
    fn open_missing_file_fails() {
        let source = FileSource::new("/nonexistent/parlor/model.gguf");
        assert!(source.open().is_err());
    }
}
