//! Store C: the `currentProvider<AppType>` mirror read by the desktop app.

use super::writer::{ConfigWriter, write_off_thread};
use switchyard_fs::json_bytes;
use serde_json::{Map, Value};
use std::io;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MirrorUpdate {
    /// Key rewritten; carries the value it replaced.
    Written { previous: Option<Value> },
    Unchanged,
    /// No mirror file on this machine; nothing to keep in sync.
    Missing,
}

pub(crate) async fn read_mirror(path: &Path) -> io::Result<Option<Map<String, Value>>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    match serde_json::from_slice::<Value>(&raw)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "mirror settings is not a JSON object",
        )),
    }
}

/// Point `key` at `provider_id`, keeping every other field of the document.
pub(crate) async fn update_mirror(
    writer: &Arc<dyn ConfigWriter>,
    path: &Path,
    key: &str,
    provider_id: &str,
) -> io::Result<MirrorUpdate> {
    let Some(mut doc) = read_mirror(path).await? else {
        return Ok(MirrorUpdate::Missing);
    };

    if doc.get(key).and_then(Value::as_str) == Some(provider_id) {
        return Ok(MirrorUpdate::Unchanged);
    }

    let previous = doc.insert(key.to_string(), Value::String(provider_id.to_string()));
    write_off_thread(writer, path, json_bytes(&Value::Object(doc))?).await?;
    Ok(MirrorUpdate::Written { previous })
}
