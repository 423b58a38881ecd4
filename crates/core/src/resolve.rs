// Target directory resolution

use crate::error::{ScanError, ScanResult};
use std::path::{Component, Path, PathBuf};

/// Normalise `path` and make sure it names an existing directory.
///
/// Relative paths are resolved against the current working directory.
/// `.` and `..` segments are folded lexically, so symlinks in the path
/// are preserved rather than followed.
pub fn resolve_directory(path: &str) -> ScanResult<PathBuf> {
    if path.is_empty() {
        return Err(ScanError::invalid_argument("target path is empty"));
    }

    let candidate = Path::new(path);
    let absolute = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(candidate),
            Err(_) => candidate.to_path_buf(),
        }
    };
    let normalized = normalize(&absolute);

    let metadata = std::fs::metadata(&normalized).map_err(|source| ScanError::NotAccessible {
        path: normalized.clone(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(normalized));
    }

    Ok(normalized)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                // `..` at the root stays at the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                None | Some(Component::ParentDir) => out.push(".."),
                Some(_) => {
                    out.pop();
                }
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_absolute_directory_is_returned_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_str().unwrap();

        let resolved = resolve_directory(path).unwrap();
        assert_eq!(resolved, temp_dir.path());

        // idempotent
        let again = resolve_directory(resolved.to_str().unwrap()).unwrap();
        assert_eq!(again, resolved);
    }

    #[test]
    fn test_dot_segments_are_folded() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("src")).unwrap();
        let messy = format!("{}/src/./../src/", temp_dir.path().display());

        let resolved = resolve_directory(&messy).unwrap();
        assert_eq!(resolved, temp_dir.path().join("src"));
    }

    #[test]
    fn test_relative_path_becomes_absolute() {
        let resolved = resolve_directory(".").unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(
            std::fs::canonicalize(&resolved).unwrap(),
            std::fs::canonicalize(std::env::current_dir().unwrap()).unwrap()
        );
    }

    #[test]
    fn test_empty_path_is_invalid() {
        let err = resolve_directory("").unwrap_err();
        assert!(matches!(err, ScanError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "target path is empty");
    }

    #[test]
    fn test_missing_path_is_not_accessible() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let err = resolve_directory(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ScanError::NotAccessible { .. }));
    }

    #[test]
    fn test_regular_file_is_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("Cargo.lock");
        std::fs::write(&file, "").unwrap();

        let err = resolve_directory(file.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(ref p) if *p == file));
    }

    #[test]
    fn test_normalize_stops_at_root() {
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
    }
}
