use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting snapshot and config files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent. Returns true if it was created.
pub fn ensure_dir(path: &Path) -> Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}

/// Write a file only if it does not already exist. Returns true if written.
///
/// This is the one write rule every scaffolded artifact goes through: an existing
/// file is never truncated, replaced or reordered. The final rename refuses to
/// clobber, so a file that appears between the check and the rename also survives.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error.into()),
    }
}

/// Append `section` to `path` unless `marker` already occurs in the file.
///
/// Returns true if the section was appended. Prior content is left byte-for-byte
/// intact; a newline separator is inserted when the file does not end with one.
pub fn append_section_if_absent(path: &Path, marker: &str, section: &str) -> Result<bool> {
    let existing = std::fs::read_to_string(path)?;
    if existing.contains(marker) {
        return Ok(false);
    }
    let sep = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    let mut f = std::fs::OpenOptions::new().append(true).open(path)?;
    write!(f, "{sep}\n{section}")?;
    Ok(true)
}

/// Add `entry` to `root/.gitignore` if it isn't already present.
///
/// Checks for an exact line match. Appends with a leading newline separator
/// if the file doesn't already end with one. Returns true if the file changed.
pub fn ensure_gitignore_entry(root: &Path, entry: &str) -> Result<bool> {
    let gitignore = root.join(".gitignore");
    let existing = if gitignore.exists() {
        std::fs::read_to_string(&gitignore)?
    } else {
        String::new()
    };
    let bare = entry.trim_matches('/');
    if existing.lines().any(|l| l.trim().trim_matches('/') == bare) {
        return Ok(false);
    }
    let sep = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitignore)?;
    writeln!(f, "{sep}{entry}")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/snapshot.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn ensure_dir_reports_creation_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("specs/001-x");
        assert!(ensure_dir(&path).unwrap());
        assert!(!ensure_dir(&path).unwrap());
    }

    #[test]
    fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.txt");
        std::fs::write(&path, b"original").unwrap();
        let written = write_if_missing(&path, b"new").unwrap();
        assert!(!written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn write_if_missing_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan/overview.md");
        assert!(write_if_missing(&path, b"# Overview\n").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Overview\n");
    }

    #[test]
    fn write_if_missing_allows_empty_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reviews/code-review.md");
        assert!(write_if_missing(&path, b"").unwrap());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn append_section_only_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intake.md");
        std::fs::write(&path, "# Intake\nnotes").unwrap();
        assert!(append_section_if_absent(&path, "<!-- raw -->", "<!-- raw -->\nbody\n").unwrap());
        assert!(!append_section_if_absent(&path, "<!-- raw -->", "<!-- raw -->\nother\n").unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Intake\nnotes\n"));
        assert_eq!(content.matches("<!-- raw -->").count(), 1);
        assert!(!content.contains("other"));
    }

    #[test]
    fn ensure_gitignore_entry_idempotent() {
        let dir = TempDir::new().unwrap();
        assert!(ensure_gitignore_entry(dir.path(), ".worktrees/").unwrap());
        assert!(!ensure_gitignore_entry(dir.path(), ".worktrees/").unwrap());
        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content.lines().filter(|l| *l == ".worktrees/").count(), 1);
    }

    #[test]
    fn ensure_gitignore_entry_recognizes_slash_variants() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target\n/.worktrees").unwrap();
        assert!(!ensure_gitignore_entry(dir.path(), ".worktrees/").unwrap());
    }
}
