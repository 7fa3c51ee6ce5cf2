//! Best-effort removal of empty directories after a run

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Remove every empty directory strictly below `root`, children first
///
/// Only directories are ever removed, never files; `root` itself and
/// anything above it are left alone. Symlinked directories are not followed.
/// Subtrees listed in `keep` are neither entered nor removed. Failures
/// (non-empty, permission denied, vanished) are ignored. Returns the number
/// of directories removed.
pub fn prune_empty_dirs(root: &Path, keep: &[PathBuf]) -> usize {
    // Pre-order walk so `filter_entry` can stop descent into kept subtrees
    let dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !keep.iter().any(|k| k == e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();

    let mut removed = 0;
    for dir in dirs.iter().rev() {
        match fs::remove_dir(dir) {
            Ok(()) => {
                trace!(path = ?dir, "Removed empty directory");
                removed += 1;
            }
            Err(_) => continue,
        }
    }

    debug!(?root, removed, "Pruned empty directories");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prunes_nested_empty_dirs_but_keeps_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("d")).unwrap();

        assert_eq!(prune_empty_dirs(&root, &[]), 4);
        assert!(root.is_dir());
        assert!(!root.join("a").exists());
    }

    #[test]
    fn test_keeps_files_and_their_ancestors() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("2023/June 2023/JPEG")).unwrap();
        fs::create_dir_all(root.join("2023/June 2023/PNG")).unwrap();
        fs::write(root.join("2023/June 2023/JPEG/a.jpg"), b"x").unwrap();

        assert_eq!(prune_empty_dirs(root, &[]), 1);
        assert!(root.join("2023/June 2023/JPEG/a.jpg").is_file());
        assert!(!root.join("2023/June 2023/PNG").exists());
    }

    #[test]
    fn test_missing_root_is_ignored() {
        let dir = tempdir().unwrap();
        assert_eq!(prune_empty_dirs(&dir.path().join("gone"), &[]), 0);
    }

    #[test]
    fn test_kept_subtree_survives() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sorted/2023")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();

        fs::create_dir_all(root.join("sorted/2024/March 2024")).unwrap();

        assert_eq!(prune_empty_dirs(root, &[root.join("sorted")]), 1);
        assert!(root.join("sorted/2023").is_dir());
        assert!(root.join("sorted/2024/March 2024").is_dir());
        assert!(!root.join("empty").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_does_not_follow_symlinked_dirs() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("outside");
        let root = dir.path().join("root");
        fs::create_dir_all(outside.join("empty")).unwrap();
        fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        prune_empty_dirs(&root, &[]);
        assert!(outside.join("empty").is_dir());
        assert!(root.join("link").exists());
    }
}
