//! Host path containment checks for bind mounts.
//!
//! A requested host path is refused when it equals a protected path, lies
//! inside one, or contains one. Both sides are resolved first so that
//! symlinks, `.` and `..` cannot be used to slip past a literal comparison.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument, trace};

use crate::error::{BlockReason, Rejection};

/// Resolves a host path to its canonical absolute form.
///
/// Relative paths are anchored at the current working directory. The longest
/// existing prefix is canonicalized (following symlinks) and the remaining,
/// not yet existing components are normalized lexically.
///
/// Returns `None` for empty paths, paths containing NUL bytes, or when the
/// working directory cannot be determined for a relative path.
#[must_use]
pub fn resolve_host_path(path: &Path) -> Option<PathBuf> {
    let raw = path.as_os_str();
    if raw.is_empty() || raw.as_encoded_bytes().contains(&0) {
        return None;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let components: Vec<Component<'_>> = absolute.components().collect();
    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        if let Ok(canonical) = fs::canonicalize(&prefix) {
            trace!(prefix = %prefix.display(), canonical = %canonical.display(), "Resolved existing prefix");
            return Some(append_lexically(canonical, &components[split..]));
        }
    }

    Some(append_lexically(PathBuf::new(), &components))
}

fn append_lexically(mut base: PathBuf, rest: &[Component<'_>]) -> PathBuf {
    for component in rest {
        match component {
            Component::ParentDir => {
                base.pop();
            }
            Component::CurDir => {}
            other => base.push(other.as_os_str()),
        }
    }
    base
}

/// Checks one requested host path against the protected paths.
///
/// Protected paths are visited in their set order, so the reported path is
/// deterministic.
///
/// # Errors
///
/// Returns `Rejection::VolumePathBlocked` naming the containment relation.
#[instrument(skip(blocked), fields(host_path = %host_path))]
pub fn check_host_path<'a, I>(host_path: &str, blocked: I) -> Result<(), Rejection>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let Some(requested) = resolve_host_path(Path::new(host_path)) else {
        return Err(Rejection::VolumePathBlocked {
            path: host_path.to_string(),
            blocked: None,
            reason: BlockReason::InvalidPath,
        });
    };
    debug!(resolved = %requested.display(), "Resolved volume source");

    for protected in blocked {
        let Some(protected_resolved) = resolve_host_path(protected) else {
            continue;
        };

        let reason = if requested == protected_resolved {
            Some(BlockReason::Protected)
        } else if requested.starts_with(&protected_resolved) {
            Some(BlockReason::InsideProtected)
        } else if protected_resolved.starts_with(&requested) {
            Some(BlockReason::ExposesProtected)
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(Rejection::VolumePathBlocked {
                path: host_path.to_string(),
                blocked: Some(protected.clone()),
                reason,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn blocked(paths: &[&str]) -> BTreeSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    fn reason_of(result: Result<(), Rejection>) -> Option<BlockReason> {
        match result {
            Err(Rejection::VolumePathBlocked { reason, .. }) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn test_resolve_normalizes_dots() {
        let resolved = resolve_host_path(Path::new("/definitely-missing-root/a/./b/../c"))
            .expect("absolute path should resolve");
        assert_eq!(resolved, PathBuf::from("/definitely-missing-root/a/c"));
    }

    #[test]
    fn test_resolve_rejects_empty_and_nul() {
        assert!(resolve_host_path(Path::new("")).is_none());
        assert!(resolve_host_path(Path::new("/tmp/a\0b")).is_none());
    }

    #[test]
    fn test_resolve_relative_is_absolute() {
        let resolved = resolve_host_path(Path::new("some-volume")).expect("relative path");
        assert!(resolved.is_absolute());
    }

    #[test]
    fn test_equal_path_blocked() {
        let set = blocked(&["/nonexistent-gda/etc"]);
        assert_eq!(
            reason_of(check_host_path("/nonexistent-gda/etc", &set)),
            Some(BlockReason::Protected)
        );
    }

    #[test]
    fn test_descendant_blocked() {
        let set = blocked(&["/nonexistent-gda/etc"]);
        assert_eq!(
            reason_of(check_host_path("/nonexistent-gda/etc/foo", &set)),
            Some(BlockReason::InsideProtected)
        );
    }

    #[test]
    fn test_ancestor_blocked() {
        let set = blocked(&["/nonexistent-gda/etc"]);
        assert_eq!(
            reason_of(check_host_path("/nonexistent-gda", &set)),
            Some(BlockReason::ExposesProtected)
        );
    }

    #[test]
    fn test_sibling_with_shared_prefix_allowed() {
        let set = blocked(&["/nonexistent-gda/etc"]);
        assert!(check_host_path("/nonexistent-gda/etc2", &set).is_ok());
    }

    #[test]
    fn test_dotdot_escape_is_resolved() {
        let set = blocked(&["/nonexistent-gda/etc"]);
        assert_eq!(
            reason_of(check_host_path("/nonexistent-gda/srv/../etc/passwd", &set)),
            Some(BlockReason::InsideProtected)
        );
    }

    #[test]
    fn test_invalid_path_blocked() {
        let set = blocked(&["/nonexistent-gda/etc"]);
        assert_eq!(
            reason_of(check_host_path("", &set)),
            Some(BlockReason::InvalidPath)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_into_protected_blocked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let protected = dir.path().join("protected");
        fs::create_dir(&protected).expect("create protected");
        let link = dir.path().join("innocent");
        std::os::unix::fs::symlink(&protected, &link).expect("symlink");

        let set: BTreeSet<PathBuf> = [protected].into_iter().collect();
        let result = check_host_path(&link.to_string_lossy(), &set);
        assert_eq!(reason_of(result), Some(BlockReason::Protected));
    }
}
