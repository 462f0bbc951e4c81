//! Versioned binary snapshots of analyzer state.
//!
//! Layout:
//!
//! ```text
//! magic "NAVSNAP\0" | version u32 LE | metadata section | table section | cache section
//! ```
//!
//! Each section is a u64 LE byte length followed by its bincode encoding, so
//! the three pieces can evolve independently behind the version tag.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use analytics_core::error::PersistenceErrorCode;
use analytics_core::limits::{MAX_SNAPSHOT_SECTION_BYTES, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use analytics_core::{Error, EventTable, Metadata, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use session_analyzer::KpiCache;
use tracing::debug;

/// Decoded snapshot contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub metadata: Metadata,
    pub table: EventTable,
    pub cache: KpiCache,
}

/// Writes a snapshot, replacing `path` only once the file is complete.
///
/// The temporary file is removed when any step fails.
pub fn write_snapshot(
    path: &Path,
    metadata: &Metadata,
    table: &EventTable,
    cache: &KpiCache,
) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    let result = write_file(tmp, metadata, table, cache)
        .and_then(|_| fs::rename(tmp, path).map_err(|e| io_error("rename", path, e)));
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

fn write_file(tmp: &Path, metadata: &Metadata, table: &EventTable, cache: &KpiCache) -> Result<()> {
    let file = File::create(tmp).map_err(|e| io_error("create", tmp, e))?;
    let mut writer = BufWriter::new(file);

    writer
        .write_all(SNAPSHOT_MAGIC)
        .and_then(|_| writer.write_all(&SNAPSHOT_VERSION.to_le_bytes()))
        .map_err(|e| io_error("write", tmp, e))?;

    write_section(&mut writer, "metadata", metadata, tmp)?;
    write_section(&mut writer, "table", table, tmp)?;
    write_section(&mut writer, "cache", cache, tmp)?;

    writer
        .into_inner()
        .map_err(|e| io_error("flush", tmp, e.into_error()))?
        .sync_all()
        .map_err(|e| io_error("sync", tmp, e))
}

/// Reads and decodes a snapshot written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Err(Error::persistence(
            PersistenceErrorCode::Missing,
            format!("no snapshot at {}", path.display()),
        ));
    }

    let file = File::open(path).map_err(|e| io_error("open", path, e))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 8];
    read_exact(&mut reader, &mut magic, "header", path)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(corrupt(path, "not an analyzer snapshot"));
    }

    let mut version = [0u8; 4];
    read_exact(&mut reader, &mut version, "header", path)?;
    let version = u32::from_le_bytes(version);
    if version != SNAPSHOT_VERSION {
        return Err(Error::persistence(
            PersistenceErrorCode::IncompatibleVersion,
            format!(
                "{} has format version {}, expected {}",
                path.display(),
                version,
                SNAPSHOT_VERSION
            ),
        ));
    }

    let metadata = read_section(&mut reader, "metadata", path)?;
    let table = read_section(&mut reader, "table", path)?;
    let cache = read_section(&mut reader, "cache", path)?;

    let mut trailing = [0u8; 1];
    match reader.read(&mut trailing) {
        Ok(0) => {}
        Ok(_) => return Err(corrupt(path, "trailing bytes after cache section")),
        Err(e) => return Err(io_error("read", path, e)),
    }

    Ok(Snapshot {
        metadata,
        table,
        cache,
    })
}

fn write_section<W: Write, T: Serialize>(
    writer: &mut W,
    name: &str,
    value: &T,
    path: &Path,
) -> Result<()> {
    let bytes = bincode::serialize(value).map_err(|e| {
        Error::persistence(
            PersistenceErrorCode::Io,
            format!("cannot encode {} section: {}", name, e),
        )
    })?;

    writer
        .write_all(&(bytes.len() as u64).to_le_bytes())
        .and_then(|_| writer.write_all(&bytes))
        .map_err(|e| io_error("write", path, e))?;

    debug!(section = name, bytes = bytes.len(), "Wrote snapshot section");
    Ok(())
}

fn read_section<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    name: &str,
    path: &Path,
) -> Result<T> {
    let mut len = [0u8; 8];
    read_exact(reader, &mut len, name, path)?;
    let len = u64::from_le_bytes(len);
    if len > MAX_SNAPSHOT_SECTION_BYTES {
        return Err(corrupt(path, &format!("{} section claims {} bytes", name, len)));
    }

    let mut bytes = vec![0u8; len as usize];
    read_exact(reader, &mut bytes, name, path)?;

    bincode::deserialize(&bytes)
        .map_err(|e| corrupt(path, &format!("cannot decode {} section: {}", name, e)))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], section: &str, path: &Path) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => corrupt(path, &format!("truncated in {} section", section)),
        _ => io_error("read", path, e),
    })
}

fn corrupt(path: &Path, detail: &str) -> Error {
    Error::persistence(
        PersistenceErrorCode::Corrupt,
        format!("corrupt snapshot {}: {}", path.display(), detail),
    )
}

fn io_error(op: &str, path: &Path, e: io::Error) -> Error {
    Error::persistence(
        PersistenceErrorCode::Io,
        format!("cannot {} {}: {}", op, path.display(), e),
    )
}
