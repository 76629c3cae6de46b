//! Vault directory walk. Grounded in `crucible-cli`'s sync scanner: skip a
//! configured set of directory names, follow no symlinks, collect `.md`
//! files as vault-relative POSIX paths.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

/// Warn (not reject) when a single note body exceeds this size; oversized
/// notes still index, they just chunk more aggressively.
pub const LARGE_FILE_WARN_BYTES: u64 = 30_000;

pub fn walk_markdown_files(
    vault_root: &Path,
    skip_dirs: &[String],
    filename_denylist: &[String],
) -> Vec<String> {
    let mut out = Vec::new();
    for entry in WalkDir::new(vault_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e, vault_root, skip_dirs))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let file_name = path.file_name().and_then(|f| f.to_str()).unwrap_or("");
        if filename_denylist.iter().any(|d| d == file_name) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(vault_root) else {
            continue;
        };
        out.push(rel.to_string_lossy().replace('\\', "/"));
    }
    out.sort();
    out
}

fn is_skipped_dir(entry: &DirEntry, vault_root: &Path, skip_dirs: &[String]) -> bool {
    if entry.path() == vault_root {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    skip_dirs.iter().any(|d| d == name.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn walk_skips_configured_dirs_and_non_markdown() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("c.md"), "c").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("d.md"), "d").unwrap();

        let skip_dirs = vec![".git".to_string()];
        let files = walk_markdown_files(dir.path(), &skip_dirs, &[]);
        assert_eq!(files, vec!["a.md".to_string(), "sub/d.md".to_string()]);
    }

    #[test]
    fn walk_honors_filename_denylist() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("SCRATCH.md"), "s").unwrap();
        let denylist = vec!["SCRATCH.md".to_string()];
        let files = walk_markdown_files(dir.path(), &[], &denylist);
        assert_eq!(files, vec!["a.md".to_string()]);
    }
}
