//! Discovery of the test files that accompany a submitted source file.
//!
//! A problem directory holds the solution and its `<stem>.test_cases.json`;
//! the language-specific `test_runner.<ext>` lives in a shared directory one
//! level up:
//!
//! ```text
//! problems/
//! ├── two_sum/
//! │   ├── sol.py
//! │   └── sol.test_cases.json
//! └── test_shared/
//!     └── test_runner.py
//! ```

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::JumpError;

pub const DEFAULT_SHARED_DIR: &str = "test_shared";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionFiles {
    pub test_cases: PathBuf,
    pub test_runner: PathBuf,
}

pub fn test_cases_name(stem: &str) -> String {
    format!("{}.test_cases.json", stem)
}

pub fn test_runner_name(extension: &str) -> String {
    format!("test_runner.{}", extension)
}

/// First file named exactly `exact_name` under `root`, in sorted walk order.
pub fn locate_companion_file(root: &Path, exact_name: &str) -> Option<PathBuf> {
    log::debug!("Traversing directory {}", root.display());
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .find(|entry| entry.file_type().is_file() && entry.file_name() == exact_name)
        .map(|entry| entry.into_path())
}

/// Locate the test-cases and test-runner files for `source`.
pub fn locate_companions(source: &Path, shared_dir_name: &str) -> Result<CompanionFiles, JumpError> {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .ok_or_else(|| JumpError::Config(format!("{} has no file name", source.display())))?;
    let extension = source
        .extension()
        .map(|extension| extension.to_string_lossy().to_string())
        .unwrap_or_default();

    let source_dir = match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let source_dir = std::fs::canonicalize(&source_dir).map_err(JumpError::io(format!(
        "Failed to resolve directory {}",
        source_dir.display()
    )))?;
    let shared_root = source_dir
        .parent()
        .unwrap_or(&source_dir)
        .join(shared_dir_name);

    let cases_name = test_cases_name(&stem);
    let test_cases = locate_companion_file(&source_dir, &cases_name).ok_or_else(|| {
        JumpError::CompanionNotFound {
            name: cases_name.clone(),
            root: source_dir.clone(),
        }
    })?;
    log::info!("Test cases file found: {}", test_cases.display());

    let runner_name = test_runner_name(&extension);
    let test_runner = locate_companion_file(&shared_root, &runner_name).ok_or_else(|| {
        JumpError::CompanionNotFound {
            name: runner_name.clone(),
            root: shared_root.clone(),
        }
    })?;
    log::info!("Test runner file found: {}", test_runner.display());

    Ok(CompanionFiles {
        test_cases,
        test_runner,
    })
}

/// [`locate_companions`] on the blocking pool, for use from async code.
pub async fn find_companions(source: &Path, shared_dir_name: &str) -> Result<CompanionFiles, JumpError> {
    let source = source.to_path_buf();
    let shared_dir_name = shared_dir_name.to_string();
    tokio::task::spawn_blocking(move || locate_companions(&source, &shared_dir_name))
        .await
        .map_err(|e| JumpError::Io {
            context: "Companion file search did not complete".to_string(),
            source: std::io::Error::other(e),
        })?
}
