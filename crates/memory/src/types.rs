//! Core types for conversation memory.
//!
//! All persisted types serialize with camelCase field names and ISO-8601
//! timestamps, the format the pre-existing channel files were written in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message held in conversation memory. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMessage {
    /// Message id as assigned by the chat platform.
    pub id: String,
    pub channel_id: String,
    /// `None` for direct messages.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Display name of the sender.
    pub author: String,
    pub author_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_bot: bool,
}

/// Every remembered message for one scope, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub channel_id: String,
    /// `None` for direct messages. Pre-scoping files may omit the field.
    #[serde(default)]
    pub guild_id: Option<String>,
    pub messages: Vec<MemoryMessage>,
    pub last_updated: DateTime<Utc>,
}

impl ConversationRecord {
    /// Empty record for a scope seen for the first time.
    pub fn new(channel_id: impl Into<String>, guild_id: Option<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id,
            messages: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

/// Aggregate counters across every loaded scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryStats {
    pub scope_count: usize,
    pub total_messages: usize,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub newest_timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_json() {
        let record = ConversationRecord {
            channel_id: "c1".to_string(),
            guild_id: Some("g1".to_string()),
            messages: vec![MemoryMessage {
                id: "1".to_string(),
                channel_id: "c1".to_string(),
                guild_id: Some("g1".to_string()),
                author: "alice".to_string(),
                author_id: "100".to_string(),
                content: "hello".to_string(),
                timestamp: Utc::now(),
                is_bot: false,
            }],
            last_updated: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ConversationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let record = ConversationRecord::new("c1", None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"channelId\""));
        assert!(json.contains("\"lastUpdated\""));
        assert!(json.contains("\"guildId\":null"));
    }

    #[test]
    fn missing_guild_id_parses_as_none() {
        // Shape written by pre-scoping installs: no guildId, extra fields.
        let json = r#"{
            "channelId": "42",
            "messages": [],
            "lastUpdated": "2024-03-01T12:00:00.000Z",
            "keyTopics": []
        }"#;
        let parsed: ConversationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.guild_id, None);
        assert!(parsed.messages.is_empty());
    }
}
