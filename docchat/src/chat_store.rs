use crate::models::ChatRecord;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Append-only store of finished turns.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append(&self, record: &ChatRecord) -> Result<()>;

    /// Most recently appended record for `session_id`, if any.
    async fn latest_for_session(&self, session_id: &str) -> Result<Option<ChatRecord>>;
}

#[derive(Clone)]
pub struct SqliteChatStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChatStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                user_text TEXT NOT NULL,
                user_id TEXT NOT NULL,
                file_name TEXT,
                model TEXT NOT NULL,
                ai_response TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chats_session ON chats (session_id);
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub async fn count_for_session(&self, session_id: &str) -> Result<usize> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chats WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn with_conn<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| anyhow!("chat store connection poisoned"))?;
            job(&conn)
        })
        .await
        .map_err(|err| anyhow!(err.to_string()))?
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn append(&self, record: &ChatRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO chats (session_id, timestamp, user_text, user_id, file_name, model, ai_response)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.session_id,
                    record.timestamp.to_rfc3339(),
                    record.user_text,
                    record.user_id,
                    record.file_name,
                    record.model_name,
                    record.ai_response,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<ChatRecord>> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT session_id, timestamp, user_text, user_id, file_name, model, ai_response
                     FROM chats WHERE session_id = ?1 ORDER BY id DESC LIMIT 1",
                    params![session_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    },
                )
                .optional()?;

            let Some((session_id, timestamp, user_text, user_id, file_name, model_name, ai_response)) =
                row
            else {
                return Ok(None);
            };
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)?.with_timezone(&Utc);
            Ok(Some(ChatRecord {
                session_id,
                timestamp,
                user_text,
                user_id,
                file_name,
                model_name,
                ai_response,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session_id: &str, ai_response: &str) -> ChatRecord {
        ChatRecord {
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            user_text: "User query: hi".to_string(),
            user_id: "u1".to_string(),
            file_name: Some("notes.txt".to_string()),
            model_name: "gemini".to_string(),
            ai_response: ai_response.to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_and_lookup() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let original = record("s1", "R");
        store.append(&original).await.unwrap();

        let found = store.latest_for_session("s1").await.unwrap().unwrap();
        assert_eq!(found.ai_response, "R");
        assert_eq!(found.file_name.as_deref(), Some("notes.txt"));
        assert_eq!(found.timestamp.timestamp_millis(), original.timestamp.timestamp_millis());
        assert!(store.latest_for_session("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_record_wins() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        store.append(&record("s1", "first")).await.unwrap();
        store.append(&record("s1", "second")).await.unwrap();
        store.append(&record("s2", "elsewhere")).await.unwrap();

        let found = store.latest_for_session("s1").await.unwrap().unwrap();
        assert_eq!(found.ai_response, "second");
        assert_eq!(store.count_for_session("s1").await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(&record("shared", &format!("answer {i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.count_for_session("shared").await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("chats.db");
        let store = SqliteChatStore::open(&path).unwrap();
        store.append(&record("s1", "R")).await.unwrap();
        assert!(path.exists());
    }
}
