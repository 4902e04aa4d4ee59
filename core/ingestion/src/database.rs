use anyhow::{Context, Result};
use gpt_gulp_schemas::{Conversation, ConversationId, StorageStats, Timestamp};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::GulpError;

const SELECT_COLUMNS: &str = "SELECT id, platform, timestamp, title, summary, project, topic, tags,
            resources, key_points, raw_content, processed, processed_at,
            source_file, url, duration, created_at
     FROM conversations";

/// SQL form of `truthy`: NULL, zero, empty text and empty blobs are false
const PROCESSED_TRUE: &str = "(processed IS NOT NULL AND processed NOT IN (0, '', X''))";

/// Durable conversation archive backed by a single SQLite table
pub struct ConversationStore {
    conn: Connection,
}

impl ConversationStore {
    /// Open (or create) the archive at `path`, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create storage directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(path).map_err(GulpError::Store)?;
        let store = Self { conn };
        store.init_schema()?;

        info!("Conversation store initialized at {}", path.display());
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(GulpError::Store)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS conversations (
                    id TEXT PRIMARY KEY NOT NULL,
                    platform TEXT,
                    timestamp TEXT,
                    title TEXT,
                    summary TEXT,
                    project TEXT,
                    topic TEXT,
                    tags TEXT,
                    resources TEXT,
                    key_points TEXT,
                    raw_content TEXT,
                    processed BOOLEAN DEFAULT FALSE,
                    processed_at TEXT,
                    source_file TEXT,
                    url TEXT,
                    duration TEXT,
                    created_at TEXT DEFAULT CURRENT_TIMESTAMP
                )",
                [],
            )
            .map_err(GulpError::Store)?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_conversations_timestamp ON conversations(timestamp DESC)",
            "CREATE INDEX IF NOT EXISTS idx_conversations_processed ON conversations(processed)",
            "CREATE INDEX IF NOT EXISTS idx_conversations_project ON conversations(project)",
        ] {
            self.conn.execute(index, []).map_err(GulpError::Store)?;
        }

        debug!("Conversation schema initialized");
        Ok(())
    }

    /// Insert or fully replace the row keyed by `conversation.id`
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let tags_json = serde_json::to_string(&conversation.tags).map_err(GulpError::Encode)?;
        let resources_json =
            serde_json::to_string(&conversation.resources).map_err(GulpError::Encode)?;
        let key_points_json =
            serde_json::to_string(&conversation.key_points).map_err(GulpError::Encode)?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO conversations
                    (id, platform, timestamp, title, summary, project, topic, tags,
                     resources, key_points, raw_content, processed, processed_at,
                     source_file, url, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    conversation.id.0.as_str(),
                    conversation.platform.as_str(),
                    conversation.timestamp.to_iso(),
                    conversation.title.as_str(),
                    conversation.summary.as_str(),
                    conversation.project.as_str(),
                    conversation.topic.as_str(),
                    tags_json,
                    resources_json,
                    key_points_json,
                    conversation.raw_content.as_str(),
                    conversation.processed,
                    conversation.processed_at.as_ref().map(Timestamp::to_iso),
                    conversation.source_file.as_deref().unwrap_or(""),
                    conversation.url.as_deref().unwrap_or(""),
                    conversation.duration.as_str(),
                ],
            )
            .map_err(GulpError::Store)?;

        debug!(
            "Saved conversation: {} (processed: {})",
            conversation.id, conversation.processed
        );
        Ok(())
    }

    /// Get a conversation by ID
    pub fn get(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let conversation = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id.0],
                row_to_conversation,
            )
            .optional()
            .map_err(GulpError::Store)?;

        Ok(conversation)
    }

    /// Conversations not yet enriched, newest first
    pub fn get_unprocessed(&self) -> Result<Vec<Conversation>> {
        self.query_conversations(
            &format!(
                "{} WHERE NOT {} ORDER BY timestamp DESC",
                SELECT_COLUMNS, PROCESSED_TRUE
            ),
            [],
        )
    }

    /// Conversations assigned to `project`, newest first
    pub fn get_by_project(&self, project: &str) -> Result<Vec<Conversation>> {
        self.query_conversations(
            &format!("{} WHERE project = ?1 ORDER BY timestamp DESC", SELECT_COLUMNS),
            params![project],
        )
    }

    /// Most recent conversations regardless of state
    pub fn get_recent(&self, limit: usize) -> Result<Vec<Conversation>> {
        self.query_conversations(
            &format!("{} ORDER BY timestamp DESC LIMIT ?1", SELECT_COLUMNS),
            params![limit as i64],
        )
    }

    /// Count total conversations
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
            .map_err(GulpError::Store)?;
        Ok(count as usize)
    }

    pub fn get_stats(&self) -> Result<StorageStats> {
        let total = self.count()?;

        let processed: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM conversations WHERE {}", PROCESSED_TRUE),
                [],
                |row| row.get(0),
            )
            .map_err(GulpError::Store)?;
        let processed = processed as usize;

        Ok(StorageStats {
            total,
            processed,
            unprocessed: total.saturating_sub(processed),
            by_platform: self.count_grouped_by("platform")?,
            by_project: self.count_grouped_by("project")?,
        })
    }

    fn count_grouped_by(&self, column: &str) -> Result<BTreeMap<String, usize>> {
        let query = format!(
            "SELECT COALESCE({col}, ''), COUNT(*) FROM conversations GROUP BY COALESCE({col}, '')",
            col = column
        );
        let mut stmt = self.conn.prepare(&query).map_err(GulpError::Store)?;

        let groups = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .map_err(GulpError::Store)?
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map_err(GulpError::Store)?;

        Ok(groups)
    }

    fn query_conversations<P: rusqlite::Params>(
        &self,
        query: &str,
        params: P,
    ) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn.prepare(query).map_err(GulpError::Store)?;

        let conversations = stmt
            .query_map(params, row_to_conversation)
            .map_err(GulpError::Store)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(GulpError::Store)?;

        Ok(conversations)
    }
}

/// The one place stored columns become a `Conversation`.
///
/// Fallbacks: JSON list columns that fail to parse decode as empty, instants
/// that fail to parse are kept as `Timestamp::Raw`, `processed` decodes by
/// truthiness. Only a missing `id` is an error.
fn row_to_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    let id: String = row.get("id")?;

    let conversation = Conversation {
        platform: text_column(row, "platform")?,
        timestamp: Timestamp::parse(&text_column(row, "timestamp")?),
        title: text_column(row, "title")?,
        summary: text_column(row, "summary")?,
        project: text_column(row, "project")?,
        topic: text_column(row, "topic")?,
        tags: json_list_column(row, "tags", &id)?,
        resources: json_list_column(row, "resources", &id)?,
        key_points: json_list_column(row, "key_points", &id)?,
        raw_content: text_column(row, "raw_content")?,
        processed: truthy(&row.get::<_, Value>("processed")?),
        processed_at: optional_timestamp_column(row, "processed_at")?,
        source_file: optional_text_column(row, "source_file")?,
        url: optional_text_column(row, "url")?,
        duration: text_column(row, "duration")?,
        created_at: optional_timestamp_column(row, "created_at")?,
        include_full_conversation: false,
        id: ConversationId(id),
    };

    Ok(conversation)
}

fn text_column(row: &Row, column: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(column)?.unwrap_or_default())
}

/// Empty strings are how the row stores "absent" for optional text
fn optional_text_column(row: &Row, column: &str) -> rusqlite::Result<Option<String>> {
    Ok(row
        .get::<_, Option<String>>(column)?
        .filter(|value| !value.is_empty()))
}

fn optional_timestamp_column(row: &Row, column: &str) -> rusqlite::Result<Option<Timestamp>> {
    Ok(optional_text_column(row, column)?.map(|value| Timestamp::parse(&value)))
}

fn json_list_column<T>(row: &Row, column: &str, id: &str) -> rusqlite::Result<T>
where
    T: DeserializeOwned + Default,
{
    let raw = match row.get::<_, Option<String>>(column)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(T::default()),
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(
                "Conversation {} has malformed {} column, decoding as empty: {}",
                id, column, e
            );
            Ok(T::default())
        }
    }
}

/// Keep in step with `PROCESSED_TRUE`
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Integer(i) => *i != 0,
        Value::Real(f) => *f != 0.0,
        Value::Text(s) => !s.is_empty(),
        Value::Blob(b) => !b.is_empty(),
    }
}
