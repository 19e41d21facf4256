//! Asset copying into the output tree.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use walkdir::WalkDir;

use crate::OutputError;

/// Remove a previous output tree.
///
/// A missing directory is not an error; repeated invocations are no-ops.
pub fn clean_output(dir: &Path) -> Result<(), OutputError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(OutputError::Clean {
            path: dir.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Mirror every non-HTML file from the input directory into the output
/// directory at the same relative path.
///
/// Returns the number of files copied.
pub fn copy_assets(input_dir: &Path, output_dir: &Path) -> Result<usize, OutputError> {
    let mut copied = 0;

    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        // Rendered HTML replaces the build's HTML entry points.
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext == "html" {
            continue;
        }

        let relative = path.strip_prefix(input_dir).unwrap_or(path);
        let dest = output_dir.join(relative);

        copy_file(path, &dest)?;
        copied += 1;
    }

    Ok(copied)
}

/// Copy the public directory wholesale into `<output_dir>/assets`.
///
/// Pre-existing destination files are left untouched; a missing public
/// directory is silently tolerated.
pub fn copy_public_dir(public_dir: &Path, output_dir: &Path) -> Result<usize, OutputError> {
    if !public_dir.exists() {
        tracing::debug!("Public directory {} not found, skipping", public_dir.display());
        return Ok(0);
    }

    let assets_dir = output_dir.join("assets");
    let mut copied = 0;

    for entry in WalkDir::new(public_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(public_dir).unwrap_or(path);
        let dest = assets_dir.join(relative);

        if dest.exists() {
            continue;
        }

        copy_file(path, &dest)?;
        copied += 1;
    }

    Ok(copied)
}

fn copy_file(source: &Path, dest: &Path) -> Result<(), OutputError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| OutputError::Copy {
            path: parent.to_path_buf(),
            message: e.to_string(),
        })?;
    }

    fs::copy(source, dest).map_err(|e| OutputError::Copy {
        path: source.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}
