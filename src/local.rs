// Local file traversal for uploads.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Upper bound on files collected from a single upload source.
pub const MAX_FILE_LIMIT: usize = 10_000;

/// A local file to upload and its path relative to the upload root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub relative: PathBuf,
}

impl LocalFile {
    /// Relative path with `/` separators, as used for remote paths.
    pub fn remote_suffix(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Collect regular files below `root` in sorted order, at most `limit`.
/// A file root yields itself, relative to its parent.
pub fn collect_files(root: &Path, limit: usize) -> Result<Vec<LocalFile>> {
    let meta = std::fs::metadata(root)
        .with_context(|| format!("cannot access {}", root.display()))?;
    if meta.is_file() {
        let name = root
            .file_name()
            .map(PathBuf::from)
            .with_context(|| format!("{} has no file name", root.display()))?;
        return Ok(vec![LocalFile {
            path: root.to_path_buf(),
            relative: name,
        }]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if files.len() >= limit {
            log::warn!(
                "{} holds more than {} files; the rest are skipped",
                root.display(),
                limit
            );
            break;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?
            .to_path_buf();
        files.push(LocalFile {
            path: entry.path().to_path_buf(),
            relative,
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_suffix_uses_forward_slashes() {
        let f = LocalFile {
            path: PathBuf::from("/tmp/x/a/b.txt"),
            relative: Path::new("a").join("b.txt"),
        };
        assert_eq!(f.remote_suffix(), "a/b.txt");
    }
}
