//! PathGuard — the single entry point for every externally-supplied path.
//! Pure: the only possible outcomes are "ok" or "rejected".
//!
//! Rule order is load-bearing: each rule is cheaper than the next and a
//! rejection short-circuits, so a NUL byte never reaches a filesystem call
//! and a `..` segment never reaches symlink resolution.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("path contains a NUL byte")]
    NulByte,
    #[error("path is absolute, has a drive letter, or starts with ~/ or //")]
    AbsoluteOrRooted,
    #[error("path contains a `..` segment or a hidden (dot) segment")]
    TraversalOrHidden,
    #[error("path targets the private vault prefix")]
    PrivatePrefix,
    #[error("path escapes the vault root")]
    OutsideVault,
    #[error("path escapes the vault root via a symlink")]
    SymlinkEscape,
}

pub type PathGuardResult = Result<PathBuf, RejectReason>;

/// Case-insensitive private-data prefix, used both by the path guard and the search privacy filter.
const PRIVATE_PREFIX: &str = "_PRIVATE";

/// Validates and resolves paths supplied by the outside world against a
/// canonicalized vault root.
pub struct PathGuard {
    vault_root: PathBuf,
}

impl PathGuard {
    /// `vault_root` must already be absolute and canonicalized by the caller
    /// (the config layer does this once at startup).
    pub fn new(vault_root: PathBuf) -> Self {
        Self { vault_root }
    }

    pub fn vault_root(&self) -> &Path {
        &self.vault_root
    }

    /// Run a raw string supplied by the outside world through all six
    /// rejection rules, in order, and return either a sanitized absolute
    /// path strictly within the vault, or the first rule that rejected it.
    pub fn resolve(&self, raw: &str) -> PathGuardResult {
        // Rule 1: NUL byte.
        if raw.as_bytes().contains(&0) {
            return Err(RejectReason::NulByte);
        }

        // Rule 2: drive letters, absolute roots, home-relative, UNC-style.
        let normalized = raw.replace('\\', "/");
        if has_drive_letter_prefix(&normalized)
            || normalized.starts_with('/')
            || normalized.starts_with("~/")
            || normalized.starts_with("//")
        {
            return Err(RejectReason::AbsoluteOrRooted);
        }

        // Rule 3: `..` or hidden segments after Clean-equivalent normalization.
        let cleaned = clean_relative(&normalized);
        for comp in cleaned.components() {
            match comp {
                Component::ParentDir => return Err(RejectReason::TraversalOrHidden),
                Component::Normal(seg) => {
                    if seg.to_string_lossy().starts_with('.') {
                        return Err(RejectReason::TraversalOrHidden);
                    }
                }
                _ => {}
            }
        }

        // Rule 4: _PRIVATE prefix, case-insensitive.
        if is_private(&cleaned.to_string_lossy()) {
            return Err(RejectReason::PrivatePrefix);
        }

        // Rule 5: join + absolute + must be vault root or strictly under it.
        let joined = self.vault_root.join(&cleaned);
        if !is_within(&self.vault_root, &joined) {
            return Err(RejectReason::OutsideVault);
        }

        // Rule 6: symlink resolution on both sides must still be contained.
        let resolved_root = self
            .vault_root
            .canonicalize()
            .unwrap_or_else(|_| self.vault_root.clone());
        let resolved_candidate = resolve_existing_ancestor(&joined);
        if !is_within(&resolved_root, &resolved_candidate) {
            return Err(RejectReason::SymlinkEscape);
        }

        Ok(joined)
    }

    /// Defense-in-depth result filter: case-insensitive `_PRIVATE/` prefix
    /// check on an already-known-relative path, independent of `resolve`.
    pub fn is_private(path: &str) -> bool {
        is_private(path)
    }

    /// Additional rejection for API-surfaced paths: any segment starting
    /// with `.` is unsafe, beyond what `resolve` already rejects.
    pub fn is_unsafe_api_path(path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        Path::new(&normalized)
            .components()
            .any(|c| matches!(c, Component::Normal(seg) if seg.to_string_lossy().starts_with('.')))
    }
}

fn has_drive_letter_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/')
}

/// `path.Clean`-equivalent: resolve `.` and collapse repeated separators,
/// but preserve (and thus let the caller reject) any `..` segment rather
/// than silently popping it — the vault-escape check must see it.
fn clean_relative(s: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in Path::new(s).components() {
        match comp {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => out.push(".."),
            Component::Normal(seg) => out.push(seg),
        }
    }
    out
}

fn is_private(cleaned: &str) -> bool {
    let upper = cleaned.to_uppercase().replace('\\', "/");
    upper == PRIVATE_PREFIX || upper.starts_with(&format!("{PRIVATE_PREFIX}/"))
}

fn is_within(root: &Path, candidate: &Path) -> bool {
    candidate == root || candidate.starts_with(root)
}

/// Resolve symlinks on `path`. If `path` does not exist yet, walk up to the
/// nearest existing ancestor, canonicalize that, and re-append the
/// non-existent suffix — this is how rule 6 handles "create a new file
/// under a symlinked directory".
fn resolve_existing_ancestor(path: &Path) -> PathBuf {
    let mut suffix = Vec::new();
    let mut current = path.to_path_buf();
    loop {
        match current.canonicalize() {
            Ok(resolved) => {
                let mut out = resolved;
                for seg in suffix.into_iter().rev() {
                    out.push(seg);
                }
                return out;
            }
            Err(_) => {
                let Some(file_name) = current.file_name() else {
                    return path.to_path_buf();
                };
                suffix.push(file_name.to_os_string());
                if !current.pop() {
                    return path.to_path_buf();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn guard_in(dir: &TempDir) -> PathGuard {
        PathGuard::new(dir.path().canonicalize().unwrap())
    }

    #[test]
    fn rejects_nul_byte() {
        let dir = TempDir::new().unwrap();
        let guard = guard_in(&dir);
        assert_eq!(
            guard.resolve("note\0.md").unwrap_err(),
            RejectReason::NulByte
        );
    }

    #[test]
    fn rejects_absolute_and_rooted_variants() {
        let dir = TempDir::new().unwrap();
        let guard = guard_in(&dir);
        for raw in ["/etc/passwd", "C:/Windows/win.ini", "~/secrets.md", "//host/share"] {
            assert_eq!(
                guard.resolve(raw).unwrap_err(),
                RejectReason::AbsoluteOrRooted,
                "expected rejection for {raw}"
            );
        }
    }

    #[test]
    fn rejects_traversal_and_hidden_segments() {
        let dir = TempDir::new().unwrap();
        let guard = guard_in(&dir);
        for raw in ["../outside.md", "notes/../../escape.md", ".git/config", ".same/data/vault.db", "notes/.hidden/x.md"] {
            assert_eq!(
                guard.resolve(raw).unwrap_err(),
                RejectReason::TraversalOrHidden,
                "expected rejection for {raw}"
            );
        }
    }

    #[test]
    fn rejects_private_prefix_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let guard = guard_in(&dir);
        for raw in ["_PRIVATE/secret.md", "_private/secret.md", "_Private", "_PRIVATE"] {
            assert_eq!(
                guard.resolve(raw).unwrap_err(),
                RejectReason::PrivatePrefix,
                "expected rejection for {raw}"
            );
        }
    }

    #[test]
    fn accepts_plain_relative_path() {
        let dir = TempDir::new().unwrap();
        let guard = guard_in(&dir);
        let resolved = guard.resolve("notes/today.md").unwrap();
        assert!(resolved.starts_with(guard.vault_root()));
        assert!(resolved.ends_with("notes/today.md"));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        symlink(outside.path(), dir.path().join("notes/escape")).unwrap();

        let guard = guard_in(&dir);
        let result = guard.resolve("notes/escape/pwned.md");
        assert_eq!(result.unwrap_err(), RejectReason::SymlinkEscape);
        assert!(!outside.path().join("pwned.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlinked_vault_root_escape_for_existing_file() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("real.md"), "x").unwrap();
        symlink(outside.path().join("real.md"), dir.path().join("alias.md")).unwrap();

        let guard = guard_in(&dir);
        // alias.md resolves (via symlink) outside the vault root entirely.
        let result = guard.resolve("alias.md");
        assert_eq!(result.unwrap_err(), RejectReason::SymlinkEscape);
    }

    #[test]
    fn is_private_standalone_check() {
        assert!(PathGuard::is_private("_PRIVATE/x.md"));
        assert!(PathGuard::is_private("_private/x.md"));
        assert!(!PathGuard::is_private("notes/_PRIVATE_ish.md"));
    }

    #[test]
    fn is_unsafe_api_path_rejects_any_dot_segment() {
        assert!(PathGuard::is_unsafe_api_path("notes/.hidden.md"));
        assert!(PathGuard::is_unsafe_api_path(".env"));
        assert!(!PathGuard::is_unsafe_api_path("notes/today.md"));
    }
}
