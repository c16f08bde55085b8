//! Scope resolution: which (guild, channel) pair owns a record and where its
//! file lives under the memory root.

use std::fmt;
use std::path::{Path, PathBuf};

/// Subdirectory holding direct-message scopes.
pub(crate) const DM_DIR: &str = "dm";

/// The unit of memory isolation.
///
/// Guild and DM scopes are distinct variants, so a DM channel can never alias
/// a guild channel that happens to share its id string; there is no sentinel
/// value a real guild id could collide with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Guild {
        guild_id: String,
        channel_id: String,
    },
    Dm {
        channel_id: String,
    },
    /// Pre-scoping layout: one file per channel directly at the memory root.
    Legacy {
        channel_id: String,
    },
}

impl ScopeKey {
    /// Resolves the scope for a message or command addressed by (guild, channel).
    pub fn resolve(guild_id: Option<&str>, channel_id: &str) -> Self {
        match guild_id {
            Some(guild_id) => ScopeKey::Guild {
                guild_id: guild_id.to_string(),
                channel_id: channel_id.to_string(),
            },
            None => ScopeKey::Dm {
                channel_id: channel_id.to_string(),
            },
        }
    }

    /// Channel-only key of the pre-scoping layout.
    pub fn legacy(channel_id: &str) -> Self {
        ScopeKey::Legacy {
            channel_id: channel_id.to_string(),
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            ScopeKey::Guild { channel_id, .. }
            | ScopeKey::Dm { channel_id }
            | ScopeKey::Legacy { channel_id } => channel_id,
        }
    }

    /// The file backing this scope under `root`.
    pub fn file_path(&self, root: &Path) -> PathBuf {
        match self {
            ScopeKey::Guild {
                guild_id,
                channel_id,
            } => root.join(guild_id).join(format!("{channel_id}.json")),
            ScopeKey::Dm { channel_id } => root.join(DM_DIR).join(format!("{channel_id}.json")),
            ScopeKey::Legacy { channel_id } => root.join(format!("{channel_id}.json")),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Guild {
                guild_id,
                channel_id,
            } => write!(f, "{guild_id}/{channel_id}"),
            ScopeKey::Dm { channel_id } => write!(f, "dm/{channel_id}"),
            ScopeKey::Legacy { channel_id } => write!(f, "{channel_id} (legacy)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_and_guild_scopes_never_collide() {
        let dm = ScopeKey::resolve(None, "42");
        let guild = ScopeKey::resolve(Some("g9"), "42");
        assert_ne!(dm, guild);
        // A guild whose id happens to spell the DM marker is still distinct.
        let odd_guild = ScopeKey::resolve(Some("dm"), "42");
        assert_ne!(dm, odd_guild);
    }

    #[test]
    fn legacy_key_is_its_own_namespace() {
        assert_ne!(ScopeKey::legacy("42"), ScopeKey::resolve(None, "42"));
        assert_ne!(ScopeKey::legacy("42"), ScopeKey::resolve(Some("42"), "42"));
    }

    #[test]
    fn file_paths_follow_the_scoped_layout() {
        let root = Path::new("/mem");
        assert_eq!(
            ScopeKey::resolve(Some("g1"), "c1").file_path(root),
            Path::new("/mem/g1/c1.json")
        );
        assert_eq!(
            ScopeKey::resolve(None, "c1").file_path(root),
            Path::new("/mem/dm/c1.json")
        );
        assert_eq!(
            ScopeKey::legacy("c1").file_path(root),
            Path::new("/mem/c1.json")
        );
    }
}
