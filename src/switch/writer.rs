use std::io;
use std::path::Path;
use std::sync::Arc;

/// How the coordinator puts bytes on disk for Store A and Store C.
///
/// Implementations must make `write` all-or-nothing for readers of `path`.
pub trait ConfigWriter: Send + Sync + 'static {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Remove `path`; a file that is already gone counts as success.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Temp file + fsync + rename, see [`switchyard_fs::write_atomic`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicFileWriter;

impl ConfigWriter for AtomicFileWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        switchyard_fs::write_atomic(path, contents)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Run a write on the blocking pool (fsync can take a while).
pub(crate) async fn write_off_thread(
    writer: &Arc<dyn ConfigWriter>,
    path: &Path,
    contents: Vec<u8>,
) -> io::Result<()> {
    let writer = writer.clone();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || writer.write(&path, &contents))
        .await
        .map_err(io::Error::other)?
}

pub(crate) async fn remove_off_thread(writer: &Arc<dyn ConfigWriter>, path: &Path) -> io::Result<()> {
    let writer = writer.clone();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || writer.remove(&path))
        .await
        .map_err(io::Error::other)?
}
