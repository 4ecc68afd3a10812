//! Session folder scanning

use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use exiftool_bridge::RAW_EXTENSIONS;

/// Non-RAW formats accepted alongside the RAW set
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

pub fn is_supported(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    RAW_EXTENSIONS.contains(&ext.as_str()) || JPEG_EXTENSIONS.contains(&ext.as_str())
}

/// List the supported image files directly inside `folder`, sorted by path.
/// Subdirectories are not descended into.
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        bail!("Path is not a directory: {}", folder.display());
    }

    let mut image_paths = Vec::new();
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read directory {}", folder.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            image_paths.push(path);
        }
    }

    image_paths.sort();
    Ok(image_paths)
}
