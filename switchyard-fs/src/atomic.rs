use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

const TEMP_PREFIX: &str = ".switchyard_";
const TEMP_SUFFIX: &str = ".tmp";

/// Replace `target` with `contents` without ever exposing a partial write.
///
/// The data goes to a temp file in the same directory (same filesystem, so the
/// final rename is atomic), is flushed and fsynced, then renamed over `target`.
/// If anything fails before the rename the temp file is removed and `target`
/// keeps its previous content.
pub fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    // NamedTempFile unlinks itself on drop, which covers every early return below.
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;

    sync_dir(dir);
    Ok(())
}

/// Serialized form of every JSON document we write: pretty, trailing newline.
pub fn json_bytes<T: Serialize + ?Sized>(value: &T) -> io::Result<Vec<u8>> {
    let mut buf = serde_json::to_vec_pretty(value).map_err(io::Error::from)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Best effort: persists the rename itself; some filesystems refuse directory fsync.
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
