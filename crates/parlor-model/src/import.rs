// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Copying a user-picked model file into the cache directory.

use std::io;
use std::path::{Path, PathBuf};

use parlor_core::{ContentSource, ParlorError};

const FALLBACK_NAME: &str = "custom-model.gguf";

/// Copies `source` into `cache_dir` and returns the destination path.
///
/// Blocking. The bytes land in a temp file in the same directory and are
/// renamed into place, so a failed copy never leaves a truncated model
/// under the final name.
pub fn copy_into_cache(source: &dyn ContentSource, cache_dir: &Path) -> Result<PathBuf, ParlorError> {
    std::fs::create_dir_all(cache_dir)?;
    let destination = cache_dir.join(file_name_for(&source.display_name()));

    let mut reader = source.open()?;
    let mut staged = tempfile::NamedTempFile::new_in(cache_dir)?;
    io::copy(&mut reader, &mut staged)?;
    staged.as_file().sync_all()?;
    staged
        .persist(&destination)
        .map_err(|e| ParlorError::Io(e.error))?;

    Ok(destination)
}

/// Keeps only the final path component of the picked name.
fn file_name_for(display_name: &str) -> PathBuf {
    Path::new(display_name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::FileSource;

    #[test]
    fn copies_bytes_under_picked_name() {
        let dir = tempfile::tempdir().unwrap();
        let picked = dir.path().join("picked.gguf");
        std::fs::write(&picked, b"GGUF-bytes").unwrap();
        let cache = dir.path().join("cache");

        let dest = copy_into_cache(&FileSource::new(&picked), &cache).unwrap();
        assert_eq!(dest, cache.join("picked.gguf"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"GGUF-bytes");
    }

    #[test]
    fn missing_source_leaves_cache_clean() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        let result = copy_into_cache(&FileSource::new(dir.path().join("gone.gguf")), &cache);
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(&cache).unwrap().count(), 0);
    }

    #[test]
    fn path_like_names_are_flattened() {
        assert_eq!(file_name_for("../../etc/model.gguf"), PathBuf::from("model.gguf"));
        assert_eq!(file_name_for(""), PathBuf::from(FALLBACK_NAME));
        assert_eq!(file_name_for(".."), PathBuf::from(FALLBACK_NAME));
    }
}
