use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Project assigned when no taxonomy entry matches
pub const DEFAULT_PROJECT: &str = "general";

/// Placeholder duration; no timestamp-delta computation exists
pub const UNKNOWN_DURATION: &str = "Unknown";

// ============================================================================
// ULID and ID Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Timestamps
// ============================================================================

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const SQLITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// An instant as stored in the archive.
///
/// `Raw` keeps a stored value that could not be parsed, verbatim, so that a
/// malformed row never fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Parsed(NaiveDateTime),
    Raw(String),
}

impl Timestamp {
    pub fn now() -> Self {
        Timestamp::Parsed(chrono::Local::now().naive_local())
    }

    /// Parse ISO-8601 (with or without fractional seconds), RFC 3339 or
    /// SQLite's `CURRENT_TIMESTAMP` layout. Anything else is kept as `Raw`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();

        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, ISO_FORMAT) {
            return Timestamp::Parsed(dt);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Timestamp::Parsed(dt.naive_local());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, SQLITE_FORMAT) {
            return Timestamp::Parsed(dt);
        }

        Timestamp::Raw(value.to_string())
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Timestamp::Parsed(_))
    }

    /// ISO-8601 form written to the store
    pub fn to_iso(&self) -> String {
        match self {
            Timestamp::Parsed(dt) => dt.format(ISO_FORMAT).to_string(),
            Timestamp::Raw(raw) => raw.clone(),
        }
    }

    /// `YYYY-MM-DD`, or the raw value when unparsed
    pub fn date_label(&self) -> String {
        self.format_or_raw("%Y-%m-%d")
    }

    /// `YYYY-MM-DD HH:MM:SS`, or the raw value when unparsed
    pub fn datetime_label(&self) -> String {
        self.format_or_raw("%Y-%m-%d %H:%M:%S")
    }

    pub fn format_or_raw(&self, pattern: &str) -> String {
        match self {
            Timestamp::Parsed(dt) => dt.format(pattern).to_string(),
            Timestamp::Raw(raw) => raw.clone(),
        }
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::Parsed(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_iso())
    }
}

// ============================================================================
// Conversation Schema
// ============================================================================

/// A conversation as observed by a collector, before enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConversation {
    pub id: ConversationId,
    pub platform: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A stored conversation row. Unprocessed rows carry empty enrichment fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub platform: String,
    pub timestamp: Timestamp,
    pub title: String,
    pub raw_content: String,
    pub source_file: Option<String>,
    pub url: Option<String>,

    pub summary: String,
    pub key_points: Vec<String>,
    pub project: String,
    pub topic: String,
    pub tags: BTreeSet<String>,
    pub resources: Vec<String>,
    pub duration: String,

    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    pub created_at: Option<Timestamp>,

    /// Render the full transcript when exported. Not persisted.
    #[serde(default, skip_serializing)]
    pub include_full_conversation: bool,
}

impl From<RawConversation> for Conversation {
    fn from(raw: RawConversation) -> Self {
        Self {
            id: raw.id,
            platform: raw.platform,
            timestamp: raw.timestamp,
            title: raw.title.unwrap_or_default(),
            raw_content: raw.raw_content.unwrap_or_default(),
            source_file: raw.source_file,
            url: raw.url,
            summary: String::new(),
            key_points: Vec::new(),
            project: String::new(),
            topic: String::new(),
            tags: BTreeSet::new(),
            resources: Vec::new(),
            duration: String::new(),
            processed: false,
            processed_at: None,
            created_at: None,
            include_full_conversation: false,
        }
    }
}

impl Conversation {
    /// Convenience constructor used by collectors and tests
    pub fn raw(
        id: impl Into<String>,
        platform: impl Into<String>,
        timestamp: Timestamp,
        title: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Self {
        RawConversation {
            id: ConversationId(id.into()),
            platform: platform.into(),
            timestamp,
            title: Some(title.into()),
            raw_content: Some(raw_content.into()),
            source_file: None,
            url: None,
        }
        .into()
    }
}

// ============================================================================
// Storage Statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total: usize,
    pub processed: usize,
    pub unprocessed: usize,
    pub by_platform: BTreeMap<String, usize>,
    pub by_project: BTreeMap<String, usize>,
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn generate_conversation_id(prefix: &str) -> ConversationId {
    ConversationId(format!("{}_{}", prefix, ulid::Ulid::new()))
}
