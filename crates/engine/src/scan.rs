use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// List the regular files directly inside `dir`, sorted by name.
///
/// Subdirectories (including earlier output directories) are not entered.
/// Entries under `.` come back as bare file names.
pub fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let path = path.strip_prefix(".").unwrap_or(path);
                files.push(path.to_path_buf());
            }
            Err(e) => {
                warn!("Error accessing directory entry: {}", e);
                continue;
            }
        }
    }

    debug!("Found {} input files in {}", files.len(), dir.display());
    Ok(files)
}

/// Inputs from the command line, or every file in the working directory when none were given.
pub fn collect_inputs(args: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if !args.is_empty() {
        return Ok(args);
    }
    list_input_files(Path::new(".")).context("Failed to list the current directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lists_only_top_level_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.flac"), b"").unwrap();
        fs::write(temp.path().join("a.wav"), b"").unwrap();
        fs::create_dir(temp.path().join("_converted_")).unwrap();
        fs::write(temp.path().join("_converted_").join("a.mp3"), b"").unwrap();

        let files = list_input_files(temp.path()).unwrap();
        assert_eq!(
            files,
            vec![temp.path().join("a.wav"), temp.path().join("b.flac")]
        );
    }

    #[test]
    fn test_empty_directory() {
        let temp = TempDir::new().unwrap();
        assert!(list_input_files(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(list_input_files(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn test_explicit_arguments_are_kept_verbatim() {
        let args = vec![PathBuf::from("z.ogg"), PathBuf::from("missing/a.flac")];
        assert_eq!(collect_inputs(args.clone()).unwrap(), args);
    }
}
