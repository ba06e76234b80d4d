use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::StorageError;

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Removes everything inside `path`, keeping the directory itself.
pub fn clear_directory(path: &Path) -> Result<(), StorageError> {
    for entry in read_dir_sorted(path)? {
        let result = if entry.is_dir() {
            std::fs::remove_dir_all(&entry)
        } else {
            std::fs::remove_file(&entry)
        };
        result.map_err(|e| StorageError::Remove {
            path: entry.clone(),
            source: e,
        })?;
    }
    Ok(())
}

/// Lists the immediate children of `path`, sorted by name.
pub fn read_dir_sorted(path: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let entries = std::fs::read_dir(path).map_err(|e| StorageError::ReadDirectory {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::ReadDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Lists regular files directly inside `dir` whose extension equals `extension`.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, StorageError> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter(|p| p.is_file() && has_extension(p, extension))
        .collect())
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == extension)
        .unwrap_or(false)
}

/// Moves a directory tree. Uses `rename` first (atomic on the same
/// filesystem) and falls back to copy + delete for cross-device moves.
pub fn move_directory(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    copy_tree(src, dst)?;
    std::fs::remove_dir_all(src).map_err(|e| StorageError::Move {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), StorageError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| StorageError::Move {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            ensure_directory(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

pub fn copy_file(from: &Path, to: &Path) -> Result<(), StorageError> {
    std::fs::copy(from, to).map_err(|e| StorageError::CopyFile {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Resolves filename conflicts inside a directory by appending `_2`, `_3`, ...
/// before the extension.
pub fn resolve_conflict(directory: &Path, filename: &str) -> Result<PathBuf, StorageError> {
    let path = directory.join(filename);

    // symlink_metadata also detects broken symlinks
    if std::fs::symlink_metadata(&path).is_err() {
        return Ok(path);
    }

    let (base, ext) = match filename.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
        _ => (filename, None),
    };

    for counter in 2..=1000 {
        let new_filename = match ext {
            Some(ext) => format!("{}_{}{}", base, counter, ext),
            None => format!("{}_{}", base, counter),
        };

        let new_path = directory.join(&new_filename);
        if std::fs::symlink_metadata(&new_path).is_err() {
            return Ok(new_path);
        }
    }

    Err(StorageError::NameExhausted(path))
}

/// Finds a free directory name inside `parent`: `name`, then `name (1)`,
/// `name (2)`, ... up to `max_suffix`.
pub fn unique_directory(
    parent: &Path,
    name: &str,
    max_suffix: usize,
) -> Result<PathBuf, StorageError> {
    let candidate = parent.join(name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    for n in 1..=max_suffix {
        let candidate = parent.join(format!("{} ({})", name, n));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(StorageError::NameExhausted(parent.join(name)))
}
