use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// An accounting or mount-table file that could not be opened.
#[derive(Debug, thiserror::Error)]
#[error("cannot open `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens `path` for buffered reading.
///
/// Kernel-generated files are reopened on every poll, since their contents
/// are produced at `open` time.
///
/// # Errors
///
/// Returns a [`FileOpenError`] carrying `path` if the file cannot be opened.
///
/// ```no_run
/// let reader = autoprof::fsutil::open_buffered("/sys/fs/cgroup/cpu.max")?;
/// # Ok::<(), autoprof::fsutil::FileOpenError>(())
/// ```
pub fn open_buffered(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| FileOpenError {
            path: path.to_path_buf(),
            source,
        })
}
