//! Store manager.
//!
//! Opens the SQLite store at a given path or at a platform-specific default
//! location.

use fremantle_data::{DataError, SqliteStore};
use std::path::{Path, PathBuf};

/// Get the default store directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/fremantle/`
/// - macOS: `~/Library/Caches/fremantle/`
/// - Windows: `%LOCALAPPDATA%\fremantle\`
pub(crate) fn default_store_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fremantle")
}

/// Get the default store database path.
pub(crate) fn default_store_path() -> PathBuf {
    default_store_dir().join("fremantle.db")
}

/// Open the store, creating its directory if needed.
pub(crate) fn open_store(path: Option<&Path>) -> Result<SqliteStore, DataError> {
    let path = path.map_or_else(default_store_path, Path::to_path_buf);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    SqliteStore::new(&path)
}
