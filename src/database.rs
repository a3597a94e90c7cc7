//! SQLite store layer for chat history.
//!
//! Implements the `ChatStore` capability over a normalized schema:
//! `contacts` + `messages` + `attachments`. Uses r2d2 connection pooling so
//! worker-thread queries don't block each other; WAL mode lets readers
//! proceed concurrently.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::interface::{ChatStore, ContactFilter, MessageQuery, StoreResult};
use crate::models::{Attachment, Contact, Message, MessageId};

/// Timestamp storage format. Lexicographic order on this format matches
/// chronological order, so SQL range predicates compare the raw TEXT.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn format_db_timestamp(date: DateTime<Utc>) -> String {
    date.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp string from the database to DateTime<Utc>.
fn parse_db_timestamp(timestamp_str: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(timestamp_str, TIMESTAMP_FORMAT)
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(|_| Utc::now())
}

/// Thread-safe chat archive database using connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA foreign_keys=ON;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests, benches, demos).
    pub fn open_in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA foreign_keys=ON;
            ",
            )?;
            Ok(())
        });

        // In-memory needs a single connection to maintain state.
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> StoreResult<()> {
        let conn = self.get_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL,
                name TEXT NOT NULL UNIQUE,
                known INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                contactId INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                content TEXT,
                isFromMe INTEGER NOT NULL DEFAULT 0,
                UNIQUE(contactId, seq)
            );

            CREATE TABLE IF NOT EXISTS attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                contactId INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                fileName TEXT,
                isFromMe INTEGER NOT NULL DEFAULT 0,
                UNIQUE(contactId, seq)
            );

            CREATE INDEX IF NOT EXISTS idx_messages_contact ON messages(contactId, seq);
            CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
            CREATE INDEX IF NOT EXISTS idx_attachments_contact ON attachments(contactId, seq);
        "#,
        )?;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Contact CRUD
    // ─────────────────────────────────────────────────────────────────────

    /// Look up a contact by its unique name.
    pub fn contact_named(&self, name: &str) -> StoreResult<Option<Contact>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT id, identifier, name, known FROM contacts WHERE name = ?1",
            [name],
            Self::row_to_contact,
        );

        match result {
            Ok(contact) => Ok(Some(contact)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Find a contact by name, creating it with the given identifier when
    /// absent. A lookup miss is not an error.
    pub fn find_or_create_contact(&self, name: &str, identifier: &str) -> StoreResult<Contact> {
        if let Some(contact) = self.contact_named(name)? {
            return Ok(contact);
        }

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO contacts (identifier, name, known) VALUES (?1, ?2, 0)",
            params![identifier, name],
        )?;

        Ok(Contact {
            id: conn.last_insert_rowid(),
            identifier: identifier.to_string(),
            name: name.to_string(),
            known: false,
        })
    }

    /// Move a contact between the known/unknown browsing buckets.
    pub fn set_contact_known(&self, contact_id: i64, known: bool) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE contacts SET known = ?1 WHERE id = ?2",
            params![known, contact_id],
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────

    /// Insert a message, assigning the next sequence index for its contact.
    /// Sequence indices are assigned once at ingestion and never reassigned.
    pub fn insert_message(
        &self,
        contact_id: i64,
        date: DateTime<Utc>,
        content: Option<&str>,
        is_from_me: bool,
    ) -> StoreResult<MessageId> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM messages WHERE contactId = ?1",
            [contact_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO messages (contactId, seq, timestamp, content, isFromMe)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                contact_id,
                seq,
                format_db_timestamp(date),
                content,
                is_from_me
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(MessageId(id))
    }

    /// Insert an attachment, assigning the next sequence index for its
    /// contact (attachments carry their own per-contact sequence).
    pub fn insert_attachment(
        &self,
        contact_id: i64,
        date: DateTime<Utc>,
        file_name: Option<&str>,
        is_from_me: bool,
    ) -> StoreResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM attachments WHERE contactId = ?1",
            [contact_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO attachments (contactId, seq, timestamp, fileName, isFromMe)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                contact_id,
                seq,
                format_db_timestamp(date),
                file_name,
                is_from_me
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Row mapping
    // ─────────────────────────────────────────────────────────────────────

    fn row_to_contact(row: &rusqlite::Row) -> rusqlite::Result<Contact> {
        Ok(Contact {
            id: row.get(0)?,
            identifier: row.get(1)?,
            name: row.get(2)?,
            known: row.get(3)?,
        })
    }

    /// Column order: m.id, m.seq, m.timestamp, m.content, m.isFromMe,
    /// then the four contact columns.
    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        let timestamp_str: String = row.get(2)?;
        Ok(Message {
            id: MessageId(row.get(0)?),
            index: row.get(1)?,
            date: parse_db_timestamp(&timestamp_str),
            content: row.get(3)?,
            is_from_me: row.get(4)?,
            contact: Contact {
                id: row.get(5)?,
                identifier: row.get(6)?,
                name: row.get(7)?,
                known: row.get(8)?,
            },
        })
    }

    fn row_to_attachment(row: &rusqlite::Row) -> rusqlite::Result<Attachment> {
        let timestamp_str: String = row.get(2)?;
        Ok(Attachment {
            id: row.get(0)?,
            index: row.get(1)?,
            date: parse_db_timestamp(&timestamp_str),
            file_name: row.get(3)?,
            is_from_me: row.get(4)?,
            contact: Contact {
                id: row.get(5)?,
                identifier: row.get(6)?,
                name: row.get(7)?,
                known: row.get(8)?,
            },
        })
    }

    const MESSAGE_COLUMNS: &'static str = "m.id, m.seq, m.timestamp, m.content, m.isFromMe, \
         c.id, c.identifier, c.name, c.known";

    const ATTACHMENT_COLUMNS: &'static str = "a.id, a.seq, a.timestamp, a.fileName, a.isFromMe, \
         c.id, c.identifier, c.name, c.known";
}

impl ChatStore for Database {
    /// List contacts ordered by name. The known/unknown buckets exclude
    /// contacts with zero messages.
    fn fetch_contacts(&self, filter: ContactFilter) -> StoreResult<Vec<Contact>> {
        let conn = self.get_conn()?;

        let sql = match filter {
            ContactFilter::All => {
                "SELECT id, identifier, name, known FROM contacts ORDER BY name ASC".to_string()
            }
            ContactFilter::Known | ContactFilter::Unknown => {
                let known = matches!(filter, ContactFilter::Known) as i64;
                format!(
                    "SELECT id, identifier, name, known FROM contacts c
                     WHERE known = {known}
                       AND EXISTS (SELECT 1 FROM messages m WHERE m.contactId = c.id)
                     ORDER BY name ASC"
                )
            }
        };

        let mut stmt = conn.prepare(&sql)?;
        let contacts = stmt
            .query_map([], Self::row_to_contact)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contacts)
    }

    /// Substring search over message content. `instr` gives case-sensitive
    /// CONTAINS semantics; NULL content never matches.
    /// Date bounds here are inclusive, unlike the in-memory interval filter.
    fn fetch_messages(&self, query: &MessageQuery) -> StoreResult<Vec<Message>> {
        let conn = self.get_conn()?;

        let mut sql = format!(
            "SELECT {} FROM messages m JOIN contacts c ON c.id = m.contactId
             WHERE instr(m.content, ?1) > 0",
            Self::MESSAGE_COLUMNS
        );
        let mut bindings: Vec<rusqlite::types::Value> = vec![query.term.clone().into()];

        if let Some(after) = query.after_date {
            bindings.push(format_db_timestamp(after).into());
            sql.push_str(&format!(" AND m.timestamp >= ?{}", bindings.len()));
        }
        if let Some(before) = query.before_date {
            bindings.push(format_db_timestamp(before).into());
            sql.push_str(&format!(" AND m.timestamp <= ?{}", bindings.len()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let messages = stmt
            .query_map(rusqlite::params_from_iter(bindings), Self::row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Rematerialize messages by identity, preserving the input ID order.
    /// Unknown ids are skipped.
    fn resolve_messages(&self, ids: &[MessageId]) -> StoreResult<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT {} FROM messages m JOIN contacts c ON c.id = m.contactId
             WHERE m.id IN ({placeholders})",
            Self::MESSAGE_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let bindings: Vec<rusqlite::types::Value> = ids.iter().map(|id| id.0.into()).collect();
        let messages = stmt
            .query_map(rusqlite::params_from_iter(bindings), Self::row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;

        // Re-sort to match input ID order.
        let mut by_id: HashMap<MessageId, Message> =
            messages.into_iter().map(|m| (m.id, m)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// A contact's full message sequence, sorted by stable index.
    fn messages_for_contact(&self, contact_id: i64) -> StoreResult<Vec<Message>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM messages m JOIN contacts c ON c.id = m.contactId
             WHERE m.contactId = ?1 ORDER BY m.seq ASC",
            Self::MESSAGE_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let messages = stmt
            .query_map([contact_id], Self::row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn attachments_for_contact(&self, contact_id: i64) -> StoreResult<Vec<Attachment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM attachments a JOIN contacts c ON c.id = a.contactId
             WHERE a.contactId = ?1 ORDER BY a.seq ASC",
            Self::ATTACHMENT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let attachments = stmt
            .query_map([contact_id], Self::row_to_attachment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attachments)
    }
}
