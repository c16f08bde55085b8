//! # Conversation memory
//!
//! Scoped, capacity-bounded, disk-durable store of recent chat messages, plus
//! token-budget context selection for generation prompts.
//!
//! One [`ConversationRecord`] per scope (a (guild, channel) pair or a DM
//! channel), persisted as one JSON document under a memory root directory.
//! The [`MemoryStore`] owns every record: it appends, evicts oldest-first past
//! the configured cap, and serializes each scope's append-then-persist so two
//! writers can never interleave on the same file. [`MemoryStore::select_context`]
//! packs the most recent messages that fit a token budget, estimated at four
//! characters per token.
//!
//! Construct the store once at startup with [`MemoryStore::load`] (which also
//! migrates any pre-scoping channel files into the guild/dm layout) and share
//! it by reference with every event handler and command.

mod config;
mod context;
mod error;
mod persistence;
mod scope;
mod store;
mod types;

pub use config::MemoryConfig;
pub use context::{estimate_tokens, ContextWindow};
pub use error::{MemoryError, Result};
pub use scope::ScopeKey;
pub use store::MemoryStore;
pub use types::{ConversationRecord, MemoryMessage, MemoryStats};
