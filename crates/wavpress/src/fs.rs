use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn directory_exists(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_dir()
}

pub fn file_exists(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_file()
}

/// Every regular file below `dir`, recursively, in path order.
///
/// Symlinks are followed. Entries below `dir` that can't be read, such as
/// dangling links or link loops, are skipped with a warning. Only a failure
/// to read `dir` itself is an error.
pub fn get_file_paths(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(io::Error::from(e)),
            Err(e) => {
                log::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn canonical_path(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    fs::canonicalize(path)
}

/// Creates `dir` and its parents. Fails if something other than a
/// directory is already there.
pub fn ensure_directory_exists(dir: &Path) -> io::Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", dir.display()),
        ));
    }
    fs::create_dir_all(dir)
}
