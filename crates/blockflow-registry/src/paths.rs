//! Platform-specific locations of block description files.
//!
//! # Directory Structure
//!
//! - **User blocks**: `~/.config/blockflow/blocks/` (Linux), `~/Library/Application Support/blockflow/blocks/` (macOS), `%APPDATA%\blockflow\blocks\` (Windows)
//! - **System blocks**: `/usr/share/blockflow/blocks/` (Linux), `/Library/Application Support/blockflow/blocks/` (macOS)
//!
//! The `BLOCKFLOW_BLOCKS_PATH` environment variable, a list of directories in
//! the platform's path-list syntax, is searched before both.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "blockflow";

/// Subdirectory holding description files.
const BLOCKS_SUBDIR: &str = "blocks";

/// Environment variable listing extra definition directories.
pub const BLOCKS_PATH_ENV: &str = "BLOCKFLOW_BLOCKS_PATH";

/// Suffix of block description files.
pub const DEFINITION_SUFFIX: &str = ".block.toml";

/// Suffix of category tree files.
pub const TREE_SUFFIX: &str = ".tree.toml";

/// Returns the user-specific block definitions directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_blocks_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(BLOCKS_SUBDIR)
}

/// Returns the system-wide block definitions directory.
pub fn system_blocks_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/usr/share").join(APP_NAME).join(BLOCKS_SUBDIR)
    }
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Library/Application Support")
            .join(APP_NAME)
            .join(BLOCKS_SUBDIR)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join(BLOCKS_SUBDIR)
    }
}

/// Splits a path-list value (as found in `BLOCKFLOW_BLOCKS_PATH`), dropping
/// empty entries.
pub fn split_path_list(value: &OsStr) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// The directories searched when no explicit path is given, in priority
/// order: `BLOCKFLOW_BLOCKS_PATH` entries, the user directory, then the system
/// directory.
pub fn default_search_path() -> Vec<PathBuf> {
    let mut path = std::env::var_os(BLOCKS_PATH_ENV)
        .map(|v| split_path_list(&v))
        .unwrap_or_default();
    path.push(user_blocks_dir());
    path.push(system_blocks_dir());
    path
}

/// Whether `path` names a block description file.
pub fn is_definition_file(path: &Path) -> bool {
    has_suffix(path, DEFINITION_SUFFIX)
}

/// Whether `path` names a category tree file.
pub fn is_tree_file(path: &Path) -> bool {
    has_suffix(path, TREE_SUFFIX)
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.len() > suffix.len() && n.ends_with(suffix))
}

/// Every description and tree file under `dir`, recursively, sorted by path.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn collect_block_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk(dir, &mut files);
    files.sort();
    files
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        if path.is_dir() {
            walk(&path, files);
        } else if is_definition_file(&path) || is_tree_file(&path) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_user_blocks_dir() {
        let dir = user_blocks_dir();
        assert!(dir.ends_with("blockflow/blocks"));
    }

    #[test]
    fn test_system_blocks_dir() {
        let dir = system_blocks_dir();
        assert!(dir.to_string_lossy().contains("blockflow"));
    }

    #[test]
    fn test_default_search_path_ends_with_user_then_system() {
        let path = default_search_path();
        assert!(path.len() >= 2);
        assert_eq!(path[path.len() - 2], user_blocks_dir());
        assert_eq!(path[path.len() - 1], system_blocks_dir());
    }

    #[test]
    fn test_split_path_list_drops_empty_entries() {
        let joined = std::env::join_paths(["/a", "", "/b"]).unwrap();
        assert_eq!(
            split_path_list(&joined),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_file_suffixes() {
        assert!(is_definition_file(Path::new("dir/gain.block.toml")));
        assert!(!is_definition_file(Path::new("dir/.block.toml")));
        assert!(!is_definition_file(Path::new("dir/gain.toml")));
        assert!(is_tree_file(Path::new("core.tree.toml")));
    }

    #[test]
    fn test_collect_block_files_recurses_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("filters");
        fs::create_dir(&nested).unwrap();
        fs::write(temp_dir.path().join("z.block.toml"), "").unwrap();
        fs::write(nested.join("a.block.toml"), "").unwrap();
        fs::write(temp_dir.path().join("core.tree.toml"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let files = collect_block_files(temp_dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp_dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("core.tree.toml"),
                PathBuf::from("filters/a.block.toml"),
                PathBuf::from("z.block.toml"),
            ]
        );
    }

    #[test]
    fn test_collect_block_files_nonexistent_dir() {
        assert!(collect_block_files(Path::new("/nonexistent/path/12345")).is_empty());
    }
}
