//! Append-only log linkstore
//!
//! On-disk format, one entry per line:
//!
//! ```text
//! originalRef&canonicalParams:derivedRef\n
//! ```
//!
//! The whole log is replayed into a `HashMap` index on open (most recent line
//! wins), so lookups never touch the file. Writers are serialized by an async
//! mutex and the index is only updated after the bytes are written, so a
//! concurrent reader sees either the old entry or the new one.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{CacheKey, LinkStore, LinkStoreError};
use crate::content::ContentRef;
use crate::transform::CanonicalParams;

/// Index entry: current value plus where its bytes live in the log
#[derive(Debug, Clone)]
struct IndexedLink {
    derived: ContentRef,
    value_offset: u64,
}

struct LogWriter {
    file: File,
    len: u64,
    sync_writes: bool,
}

impl LogWriter {
    /// Append a full line, returning the offset where it starts
    async fn append(&mut self, line: &str) -> std::io::Result<u64> {
        let start = self.len;
        let result = self.write_at(start, line.as_bytes()).await;
        if let Err(e) = result {
            // Drop any partial line so the next append starts clean
            if let Err(truncate_err) = self.file.set_len(start).await {
                tracing::warn!(
                    offset = start,
                    error = %truncate_err,
                    "Failed to truncate partial linkstore entry"
                );
            }
            return Err(e);
        }
        self.len += line.len() as u64;
        Ok(start)
    }

    /// Overwrite bytes of an existing entry (same length only)
    async fn overwrite(&mut self, offset: u64, bytes: &[u8]) -> std::io::Result<()> {
        self.write_at(offset, bytes).await
    }

    async fn write_at(&mut self, offset: u64, bytes: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.write_all(bytes).await?;
        self.file.flush().await?;
        if self.sync_writes {
            self.file.sync_data().await?;
        }
        Ok(())
    }
}

/// Linkstore persisted as an append-only log file
pub struct LogLinkStore {
    path: PathBuf,
    index: RwLock<HashMap<CacheKey, IndexedLink>>,
    writer: Mutex<LogWriter>,
}

impl LogLinkStore {
    /// Open (or create) the log at `path` and replay it
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LinkStoreError> {
        Self::open_with(path, false).await
    }

    /// Open the log, optionally syncing every write to stable storage
    pub async fn open_with(
        path: impl Into<PathBuf>,
        sync_writes: bool,
    ) -> Result<Self, LinkStoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = match tokio::fs::read(&path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let replay = replay_log(&data);

        let file = open_log_file(&path).await?;
        if replay.valid_len < data.len() as u64 {
            tracing::warn!(
                path = %path.display(),
                discarded_bytes = data.len() as u64 - replay.valid_len,
                "Truncating torn final linkstore entry"
            );
            file.set_len(replay.valid_len).await?;
        }
        if replay.skipped > 0 {
            tracing::warn!(
                path = %path.display(),
                skipped = replay.skipped,
                "Skipped malformed linkstore entries during replay"
            );
        }

        tracing::info!(
            path = %path.display(),
            entries = replay.entries.len(),
            log_bytes = replay.valid_len,
            "Opened linkstore log"
        );

        Ok(Self {
            path,
            index: RwLock::new(replay.entries),
            writer: Mutex::new(LogWriter {
                file,
                len: replay.valid_len,
                sync_writes,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LinkStore for LogLinkStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<ContentRef>, LinkStoreError> {
        Ok(self.index.read().get(key).map(|link| link.derived.clone()))
    }

    async fn record(&self, key: CacheKey, derived: ContentRef) -> Result<(), LinkStoreError> {
        let mut writer = self.writer.lock().await;
        let existing = self.index.read().get(&key).cloned();

        let value_offset = match existing {
            Some(link) if link.derived == derived => return Ok(()),
            Some(link) if link.derived.as_str().len() == derived.as_str().len() => {
                if let Err(e) = writer
                    .overwrite(link.value_offset, derived.as_str().as_bytes())
                    .await
                {
                    tracing::warn!(
                        key = %key,
                        offset = link.value_offset,
                        error = %e,
                        "In-place linkstore correction failed, entry may be unreadable on replay"
                    );
                    return Err(e.into());
                }
                tracing::debug!(key = %key, derived = %derived, "Corrected linkstore entry in place");
                link.value_offset
            }
            _ => {
                let key_text = key.to_string();
                let line = format!("{}:{}\n", key_text, derived);
                let start = writer.append(&line).await?;
                tracing::debug!(key = %key, derived = %derived, "Appended linkstore entry");
                start + key_text.len() as u64 + 1
            }
        };

        self.index.write().insert(
            key,
            IndexedLink {
                derived,
                value_offset,
            },
        );
        Ok(())
    }

    async fn len(&self) -> usize {
        self.index.read().len()
    }

    async fn compact(&self) -> Result<(), LinkStoreError> {
        let mut writer = self.writer.lock().await;

        let mut entries: Vec<(CacheKey, ContentRef)> = self
            .index
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.derived.clone()))
            .collect();
        entries.sort();

        let mut buffer = String::new();
        let mut index = HashMap::with_capacity(entries.len());
        for (key, derived) in entries {
            let key_text = key.to_string();
            let value_offset = (buffer.len() + key_text.len() + 1) as u64;
            buffer.push_str(&key_text);
            buffer.push(':');
            buffer.push_str(derived.as_str());
            buffer.push('\n');
            index.insert(
                key,
                IndexedLink {
                    derived,
                    value_offset,
                },
            );
        }

        // Write to temp file, then atomically rename over the log
        let temp_path = self.path.with_extension("compact.tmp");
        tokio::fs::write(&temp_path, buffer.as_bytes()).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        writer.file = open_log_file(&self.path).await?;
        writer.len = buffer.len() as u64;
        *self.index.write() = index;

        tracing::info!(
            path = %self.path.display(),
            entries = self.index.read().len(),
            log_bytes = writer.len,
            "Compacted linkstore log"
        );
        Ok(())
    }
}

async fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .await
}

struct Replay {
    entries: HashMap<CacheKey, IndexedLink>,
    /// Length of the prefix made of complete lines
    valid_len: u64,
    skipped: usize,
}

fn replay_log(data: &[u8]) -> Replay {
    let valid_len = data
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut entries = HashMap::new();
    let mut skipped = 0;
    let mut start = 0;

    while start < valid_len {
        let end = match data[start..valid_len].iter().position(|b| *b == b'\n') {
            Some(pos) => start + pos,
            None => break,
        };
        let line = &data[start..end];
        match parse_line(line) {
            Some((key, derived, value_start)) => {
                entries.insert(
                    key,
                    IndexedLink {
                        derived,
                        value_offset: (start + value_start) as u64,
                    },
                );
            }
            None if line.is_empty() => {}
            None => {
                tracing::debug!(offset = start, "Malformed linkstore entry");
                skipped += 1;
            }
        }
        start = end + 1;
    }

    Replay {
        entries,
        valid_len: valid_len as u64,
        skipped,
    }
}

/// Parse `original&params:derived`, returning the offset of `derived` in the line
fn parse_line(line: &[u8]) -> Option<(CacheKey, ContentRef, usize)> {
    let text = std::str::from_utf8(line).ok()?;
    let (key_part, value) = text.rsplit_once(':')?;
    let (original, params) = key_part.split_once('&')?;

    let original = ContentRef::parse(original).ok()?;
    let params = CanonicalParams::parse(params).ok()?;
    let derived = ContentRef::parse(value).ok()?;

    Some((CacheKey::new(original, params), derived, key_part.len() + 1))
}
