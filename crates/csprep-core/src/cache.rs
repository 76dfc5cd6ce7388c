//! Cache persistence for transformed imports

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Marker appended to every generated file.
const GENERATED_FOOTER: &str = "///////////////////////////////////////////\n\
                                // Compiler-generated file - DO NOT EDIT!\n\
                                ///////////////////////////////////////////\n";

/// Writes transformed imports into a cache directory.
///
/// Entry names are a pure function of the original file, so rewriting the
/// same import always lands on the same path. The cache directory may be
/// shared with other processes; a concurrently deleted entry is tolerated.
#[derive(Debug, Clone)]
pub struct CacheWriter {
    cache_root: PathBuf,
}

impl CacheWriter {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Cache location for `original`: `i_<stem>_<dirhash><ext>` under the
    /// cache root. The directory hash keeps same-named files from different
    /// directories apart.
    pub fn cache_path(&self, original: &Path) -> PathBuf {
        let stem = original.file_stem().unwrap_or_default().to_string_lossy();
        let ext = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let dir = original.parent().unwrap_or_else(|| Path::new(""));
        self.cache_root
            .join(format!("i_{stem}_{}{ext}", dir_hash(dir)))
    }

    /// Persist `text` as the cached copy of `original`, replacing any
    /// previous entry, and freeze the result.
    ///
    /// A stale entry is thawed and deleted before the new content is
    /// written, so a failed write never leaves a previously frozen file
    /// behind for silent reuse.
    pub fn write(&self, original: &Path, text: &str) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.cache_root).map_err(|source| CacheError::CreateDir {
            path: self.cache_root.clone(),
            source,
        })?;

        let path = self.cache_path(original);
        if path.exists() {
            thaw(&path).map_err(|source| CacheError::Write {
                path: path.clone(),
                source,
            })?;
            match fs::remove_file(&path) {
                Ok(()) => {}
                // Another writer got there first.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Write { path, source }),
            }
        }

        let mut content = String::with_capacity(text.len() + GENERATED_FOOTER.len() + 1);
        content.push_str(text);
        if !text.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(GENERATED_FOOTER);

        fs::write(&path, content).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        freeze(&path).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        log::debug!(
            "cached transformed copy of {} at {}",
            original.display(),
            path.display()
        );
        Ok(path)
    }
}

/// Mark `path` read-only to deter hand-editing of generated files.
pub fn freeze(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)
}

/// Clear the read-only marker. A file already deleted by a concurrent
/// writer is not an error.
pub fn thaw(path: &Path) -> io::Result<()> {
    let mut perms = match fs::metadata(path) {
        Ok(meta) => meta.permissions(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    match fs::set_permissions(path, perms) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Stable digest of a directory path, rendered as eight hex digits.
fn dir_hash(dir: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    dir.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}
