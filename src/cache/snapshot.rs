use super::store::CommitCache;
use crate::error::Result;
use crate::model::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    cache: &'a CommitCache,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    cache: CommitCache,
}

/// Result of reading a snapshot file. Loading never fails: a missing or
/// unreadable snapshot yields an empty cache, with a warning for the latter.
#[derive(Debug)]
pub struct Loaded {
    pub cache: CommitCache,
    pub warning: Option<String>,
}

pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the snapshot to a sibling temp file and renames it over `path`.
pub fn save(cache: &CommitCache, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let bytes = bincode::serialize(&EnvelopeRef {
        version: SCHEMA_VERSION,
        cache,
    })?;

    let tmp = temp_path(path);
    let written = write_synced(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path));
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }

    log::debug!("saved snapshot ({} bytes) to {}", bytes.len(), path.display());
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

pub fn load(path: &Path) -> Loaded {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Loaded {
                cache: CommitCache::empty(),
                warning: None,
            }
        }
        Err(err) => return discard(path, format!("unreadable: {err}")),
    };

    match bincode::deserialize::<Envelope>(&bytes) {
        Ok(envelope) if envelope.version == SCHEMA_VERSION => Loaded {
            cache: envelope.cache,
            warning: None,
        },
        Ok(envelope) => discard(
            path,
            format!(
                "schema version {} does not match {}",
                envelope.version, SCHEMA_VERSION
            ),
        ),
        Err(err) => discard(path, format!("could not decode: {err}")),
    }
}

fn discard(path: &Path, reason: String) -> Loaded {
    let warning = format!("discarding snapshot {}: {reason}", path.display());
    log::warn!("{warning}");
    Loaded {
        cache: CommitCache::empty(),
        warning: Some(warning),
    }
}
