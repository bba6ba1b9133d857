use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::{layer::VectorFile, Error};

/// Error unless the directory already exists.
pub fn require_dir_exists(path: &Path) -> Result<(), Error> {
    if !path.exists() {
        return Err(Error::Configuration(format!("Directory does not exist: {}", path.display())));
    }
    if !path.is_dir() {
        return Err(Error::Configuration(format!("Path exists but is not a directory: {}", path.display())));
    }
    Ok(())
}

/// Recursively find every supported vector file under `root`, sorted by path.
///
/// Unreadable directory entries are skipped.
pub fn find_vector_files(root: &Path) -> Result<Vec<VectorFile>, Error> {
    require_dir_exists(root)?;

    let mut files: Vec<VectorFile> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| VectorFile::new(entry.into_path()))
        .collect();

    files.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(files)
}

/// Move files whose parent directory path contains `token` (case-insensitive) to the front.
/// The sort is stable, so relative order is otherwise preserved.
pub fn order_by_priority(mut files: Vec<VectorFile>, token: &str) -> Vec<VectorFile> {
    let token = token.to_lowercase();
    if token.is_empty() { return files }

    files.sort_by_key(|file| {
        let parent = file.path().parent()
            .map(|p| p.to_string_lossy().replace('\\', "/").to_lowercase())
            .unwrap_or_default();
        !parent.contains(&token)
    });
    files
}

/// Buffered write to a temporary file, moved over the target on `finish`.
pub(crate) struct PendingWrite {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl PendingWrite {
    /// Create the parent directory if needed and open a temporary file next to `target`.
    pub(crate) fn open(target: &Path) -> io::Result<Self> {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let tmp = NamedTempFile::new_in(parent)?;
        Ok(Self { target: target.to_path_buf(), writer: BufWriter::new(tmp) })
    }

    /// Flush, sync and move the temporary file over `target`.
    pub(crate) fn finish(self) -> io::Result<PathBuf> {
        let tmp = self.writer.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all().ok(); // best-effort fsync file
        tmp.persist(&self.target).map_err(|e| e.error)?;
        if let Some(dir) = self.target.parent().filter(|d| !d.as_os_str().is_empty()) {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(self.target)
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.writer.write(buf) }

    fn flush(&mut self) -> io::Result<()> { self.writer.flush() }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> { self.writer.write_all(buf) }
}
