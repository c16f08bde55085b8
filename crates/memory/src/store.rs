//! The memory store: owns every conversation record and sequences mutations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::config::MemoryConfig;
use crate::context::{select_window, ContextWindow};
use crate::error::Result;
use crate::persistence;
use crate::scope::ScopeKey;
use crate::types::{ConversationRecord, MemoryMessage, MemoryStats};

/// Each record sits behind its own mutex so append-then-persist is linearized
/// per scope while distinct scopes proceed in parallel.
type RecordCell = Arc<Mutex<ConversationRecord>>;

/// In-process store of conversation records, one per scope, each backed by
/// one JSON file.
///
/// Construct once at startup with [`MemoryStore::load`] and share by
/// reference; the store is the only component that mutates its records. The
/// load completes before the store serves any call, so every handler sees the
/// full persisted history.
pub struct MemoryStore {
    root: PathBuf,
    config: MemoryConfig,
    /// Outer lock guards the map shape only; per-record cells guard content.
    scopes: RwLock<HashMap<ScopeKey, RecordCell>>,
}

impl MemoryStore {
    /// Loads every persisted scope under `root`, migrating pre-scoping
    /// channel files into the guild/dm layout first.
    pub async fn load(root: impl Into<PathBuf>, config: MemoryConfig) -> Result<Self> {
        let root = root.into();
        let records = persistence::load_all(&root).await?;
        info!(
            scopes = records.len(),
            root = %root.display(),
            "loaded conversation memories"
        );
        let scopes = records
            .into_iter()
            .map(|(key, record)| (key, Arc::new(Mutex::new(record))))
            .collect();
        Ok(Self {
            root,
            config,
            scopes: RwLock::new(scopes),
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Appends `message` to its scope, creating the record on first sight.
    ///
    /// After the append the scope is trimmed oldest-first down to the
    /// configured cap and the full record is persisted. Append, eviction and
    /// write happen under the scope's mutex, so concurrent writers to the
    /// same scope cannot lose each other's messages on disk. A write that
    /// still fails after retries surfaces as [`crate::MemoryError::Write`];
    /// the in-memory append stands either way.
    #[instrument(skip(self, message), fields(channel_id = %message.channel_id, guild_id = ?message.guild_id))]
    pub async fn add_message(&self, message: MemoryMessage) -> Result<()> {
        let key = ScopeKey::resolve(message.guild_id.as_deref(), &message.channel_id);
        let cell = self.cell_for(&key, &message).await;
        let mut record = cell.lock().await;

        record.messages.push(message);
        record.last_updated = Utc::now();

        let cap = self.config.max_messages_per_channel;
        if record.messages.len() > cap {
            let excess = record.messages.len() - cap;
            record.messages.drain(..excess);
            debug!(scope = %key, evicted = excess, "evicted oldest messages past channel cap");
        }

        persistence::write_record(&key.file_path(&self.root), &record).await
    }

    /// Token-budget context for a scope, in chronological order.
    ///
    /// When no guild id is given and the DM scope has no record, the legacy
    /// channel-only key is consulted so pre-migration callers keep working.
    /// Unknown scopes yield an empty window; `token_budget` of `None` uses
    /// the configured default.
    #[instrument(skip(self))]
    pub async fn select_context(
        &self,
        channel_id: &str,
        guild_id: Option<&str>,
        token_budget: Option<usize>,
    ) -> ContextWindow {
        let budget = token_budget.unwrap_or(self.config.max_tokens_in_context);
        let cell = {
            let scopes = self.scopes.read().await;
            let key = ScopeKey::resolve(guild_id, channel_id);
            match scopes.get(&key) {
                Some(cell) => Some(cell.clone()),
                None if guild_id.is_none() => scopes.get(&ScopeKey::legacy(channel_id)).cloned(),
                None => None,
            }
        };
        let Some(cell) = cell else {
            return ContextWindow::default();
        };

        let record = cell.lock().await;
        let window = select_window(&record.messages, budget);
        debug!(
            selected = window.messages.len(),
            estimated_tokens = window.estimated_tokens,
            budget,
            "selected context window"
        );
        window
    }

    /// Removes the scope's record and backing file.
    ///
    /// DM-style calls (no guild id) also drop the channel's legacy record and
    /// file, so callers of the old addressing scheme lose access too.
    /// Clearing a scope that holds nothing is a successful no-op.
    #[instrument(skip(self))]
    pub async fn clear(&self, channel_id: &str, guild_id: Option<&str>) -> Result<()> {
        let key = ScopeKey::resolve(guild_id, channel_id);
        self.remove_scope(&key).await?;
        if guild_id.is_none() {
            self.remove_scope(&ScopeKey::legacy(channel_id)).await?;
        }
        info!(channel_id, "cleared memory for channel");
        Ok(())
    }

    /// Counters over every in-memory scope in a single pass; never touches
    /// disk.
    pub async fn stats(&self) -> MemoryStats {
        let scopes = self.scopes.read().await;
        let mut stats = MemoryStats {
            scope_count: scopes.len(),
            ..MemoryStats::default()
        };
        for cell in scopes.values() {
            let record = cell.lock().await;
            stats.total_messages += record.messages.len();
            for message in &record.messages {
                if stats
                    .oldest_timestamp
                    .is_none_or(|oldest| message.timestamp < oldest)
                {
                    stats.oldest_timestamp = Some(message.timestamp);
                }
                if stats
                    .newest_timestamp
                    .is_none_or(|newest| message.timestamp > newest)
                {
                    stats.newest_timestamp = Some(message.timestamp);
                }
            }
        }
        stats
    }

    /// Existing cell for `key`, or a fresh empty record inserted under it.
    async fn cell_for(&self, key: &ScopeKey, message: &MemoryMessage) -> RecordCell {
        {
            let scopes = self.scopes.read().await;
            if let Some(cell) = scopes.get(key) {
                return cell.clone();
            }
        }
        let mut scopes = self.scopes.write().await;
        scopes
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(scope = %key, "created conversation record");
                Arc::new(Mutex::new(ConversationRecord::new(
                    message.channel_id.clone(),
                    message.guild_id.clone(),
                )))
            })
            .clone()
    }

    async fn remove_scope(&self, key: &ScopeKey) -> Result<()> {
        let cell = self.scopes.write().await.remove(key);
        // Wait out any in-flight writer so the file delete lands last.
        let _guard = match cell.as_ref() {
            Some(cell) => Some(cell.lock().await),
            None => None,
        };
        persistence::delete_record(&key.file_path(&self.root)).await
    }
}
