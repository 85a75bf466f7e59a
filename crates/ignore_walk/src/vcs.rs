//! Locating the root of a repository by searching upwards for its metadata
//! directory.

use std::{
    io,
    path::{Path, PathBuf},
};

use fs_err as fs;
use thiserror::Error;

/// The metadata directory of a git repository.
pub const GIT_DIR: &str = ".git";

/// Errors that can occur when looking up a repository root.
#[derive(Debug, Error)]
pub enum VcsRootError {
    /// The path to start the search from does not exist.
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    /// The path to start the search from could not be inspected.
    #[error("failed to access {}", .0.display())]
    Io(PathBuf, #[source] io::Error),
}

/// Returns the nearest directory, starting at `path` itself and moving up
/// through its ancestors, that contains a subdirectory named `vcs_dir`.
///
/// If `path` is a file the search starts at its parent. `Ok(None)` means no
/// ancestor contains `vcs_dir`.
pub fn find_vcs_root(path: &Path, vcs_dir: &str) -> Result<Option<PathBuf>, VcsRootError> {
    let metadata = fs::metadata(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => VcsRootError::NotFound(path.to_path_buf()),
        _ => VcsRootError::Io(path.to_path_buf(), err),
    })?;
    let path =
        std::path::absolute(path).map_err(|err| VcsRootError::Io(path.to_path_buf(), err))?;

    let start = if metadata.is_dir() {
        path.as_path()
    } else {
        path.parent().unwrap_or(path.as_path())
    };

    let root = start
        .ancestors()
        .find(|dir| dir.join(vcs_dir).is_dir())
        .map(Path::to_path_buf);
    tracing::debug!(
        "repository root for {} is {:?}",
        path.display(),
        root.as_deref()
    );
    Ok(root)
}

/// [`find_vcs_root`] for git repositories.
pub fn find_git_root(path: &Path) -> Result<Option<PathBuf>, VcsRootError> {
    find_vcs_root(path, GIT_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_nearest_ancestor() {
        let dir = tempdir().unwrap();
        let repo = dir.path().join("repo");
        let nested = repo.join("sub").join("nested");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("file.txt"), "").unwrap();

        assert_eq!(find_git_root(&nested).unwrap(), Some(repo.clone()));
        assert_eq!(find_git_root(&repo).unwrap(), Some(repo.clone()));
        assert_eq!(find_git_root(&nested.join("file.txt")).unwrap(), Some(repo));
    }

    #[test]
    fn prefers_the_innermost_repository() {
        let dir = tempdir().unwrap();
        let outer = dir.path().join("outer");
        let inner = outer.join("vendor").join("inner");
        fs::create_dir_all(outer.join(".hg")).unwrap();
        fs::create_dir_all(inner.join(".hg")).unwrap();

        assert_eq!(find_vcs_root(&inner, ".hg").unwrap(), Some(inner.clone()));
        assert_eq!(
            find_vcs_root(&outer.join("vendor"), ".hg").unwrap(),
            Some(outer)
        );
    }

    #[test]
    fn metadata_file_is_not_a_repository() {
        let dir = tempdir().unwrap();
        let worktree = dir.path().join("worktree");
        fs::create_dir_all(&worktree).unwrap();
        // Only a directory with the metadata name marks a repository.
        fs::write(worktree.join(".ignore-walk-vcs"), "gitdir: elsewhere").unwrap();

        assert_eq!(find_vcs_root(&worktree, ".ignore-walk-vcs").unwrap(), None);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        let err = find_git_root(&dir.path().join("does-not-exist")).unwrap_err();
        assert!(matches!(err, VcsRootError::NotFound(_)));
    }
}
