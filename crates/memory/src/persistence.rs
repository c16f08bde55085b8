//! On-disk layout: one JSON document per scope under the memory root.
//!
//! Guild scopes live at `<root>/<guildId>/<channelId>.json`, DM scopes at
//! `<root>/dm/<channelId>.json`. Files directly at the root are the
//! pre-scoping layout and are migrated into place once at startup.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{MemoryError, Result};
use crate::scope::{ScopeKey, DM_DIR};
use crate::types::ConversationRecord;

/// Attempts per write before the failure is surfaced to the caller.
const WRITE_ATTEMPTS: u32 = 3;
/// Delay between write attempts; grows linearly per attempt.
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(50);
/// Upper bound per write attempt. A stuck write must fail, not hold the
/// scope's mutex forever.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes the full record to `path`, retrying transient failures with a
/// bounded backoff. The record on disk is always a complete document, never a
/// delta.
pub(crate) async fn write_record(path: &Path, record: &ConversationRecord) -> Result<()> {
    let json =
        serde_json::to_string_pretty(record).map_err(|source| MemoryError::Serialize {
            channel_id: record.channel_id.clone(),
            source,
        })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| MemoryError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match timed_write(path, &json).await {
            Ok(()) => {
                debug!(path = %path.display(), attempt, "persisted conversation record");
                return Ok(());
            }
            Err(error) if attempt < WRITE_ATTEMPTS => {
                warn!(
                    path = %path.display(),
                    attempt,
                    error = %error,
                    "memory file write failed, retrying"
                );
                tokio::time::sleep(WRITE_RETRY_DELAY * attempt).await;
            }
            Err(source) => {
                warn!(
                    path = %path.display(),
                    attempt,
                    error = %source,
                    "memory file write failed, giving up"
                );
                return Err(MemoryError::Write {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
}

async fn timed_write(path: &Path, json: &str) -> std::io::Result<()> {
    match tokio::time::timeout(WRITE_TIMEOUT, fs::write(path, json)).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            ErrorKind::TimedOut,
            format!("write did not finish within {WRITE_TIMEOUT:?}"),
        )),
    }
}

/// Deletes a scope file. A file that is already gone is a successful no-op.
pub(crate) async fn delete_record(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "deleted memory file");
            Ok(())
        }
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MemoryError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Full-tree load: migrates legacy root-level files, then reads every guild
/// subdirectory and the `dm` subdirectory into a scope-keyed map.
///
/// A file that fails to parse is logged and skipped; its scope starts empty
/// on the next write. Only directory-level I/O errors abort startup.
pub(crate) async fn load_all(root: &Path) -> Result<HashMap<ScopeKey, ConversationRecord>> {
    fs::create_dir_all(root)
        .await
        .map_err(|source| MemoryError::Init {
            path: root.to_path_buf(),
            source,
        })?;

    migrate_legacy_files(root).await;

    let mut records = HashMap::new();
    let mut entries = fs::read_dir(root).await.map_err(|source| MemoryError::Init {
        path: root.to_path_buf(),
        source,
    })?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| MemoryError::Init {
            path: root.to_path_buf(),
            source,
        })?
    {
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let guild_id = if dir_name == DM_DIR {
            None
        } else {
            Some(dir_name)
        };
        load_scope_dir(&entry.path(), guild_id.as_deref(), &mut records).await;
    }

    Ok(records)
}

/// Reads every `*.json` channel file in one guild (or the dm) directory.
async fn load_scope_dir(
    dir: &Path,
    guild_id: Option<&str>,
    records: &mut HashMap<ScopeKey, ConversationRecord>,
) {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) => {
            warn!(dir = %dir.display(), error = %error, "failed to read memory directory, skipping");
            return;
        }
    };
    while let Some(entry) = entries.next_entry().await.ok().flatten() {
        let path = entry.path();
        let Some(channel_id) = json_stem(&path) else {
            continue;
        };
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to read memory file, skipping");
                continue;
            }
        };
        match serde_json::from_str::<ConversationRecord>(&raw) {
            Ok(record) => {
                let key = ScopeKey::resolve(guild_id, &channel_id);
                debug!(scope = %key, messages = record.messages.len(), "loaded conversation record");
                records.insert(key, record);
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "corrupt memory file, skipping");
            }
        }
    }
}

/// One-time migration of the pre-scoping layout: each `<channelId>.json`
/// directly under the root is moved to its guild directory (embedded non-null
/// `guildId`) or to `dm/`. Moving deletes the original, so a rerun finds
/// nothing left. Corrupt files, and files whose target already exists, are
/// logged and left in place.
async fn migrate_legacy_files(root: &Path) {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(error) => {
            warn!(root = %root.display(), error = %error, "failed to scan for legacy memory files");
            return;
        }
    };
    while let Some(entry) = entries.next_entry().await.ok().flatten() {
        let path = entry.path();
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let Some(channel_id) = json_stem(&path) else {
            continue;
        };
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to read legacy memory file, leaving in place");
                continue;
            }
        };
        let record: ConversationRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "corrupt legacy memory file, leaving in place");
                continue;
            }
        };

        let key = ScopeKey::resolve(record.guild_id.as_deref(), &channel_id);
        let target = key.file_path(root);
        if fs::try_exists(&target).await.unwrap_or(false) {
            warn!(
                from = %path.display(),
                to = %target.display(),
                "migration target already exists, leaving legacy file in place"
            );
            continue;
        }
        if let Some(parent) = target.parent() {
            if let Err(error) = fs::create_dir_all(parent).await {
                warn!(dir = %parent.display(), error = %error, "failed to create scope directory, leaving legacy file in place");
                continue;
            }
        }
        match fs::rename(&path, &target).await {
            Ok(()) => {
                info!(from = %path.display(), to = %target.display(), "migrated legacy memory file");
            }
            Err(error) => {
                warn!(from = %path.display(), error = %error, "failed to move legacy memory file, leaving in place");
            }
        }
    }
}

/// Channel id for a `*.json` path; `None` for anything else.
fn json_stem(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
