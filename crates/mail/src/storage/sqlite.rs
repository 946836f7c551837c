//! SQLite-based mail storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::MailStore;
use crate::models::{
    Account, Category, Credential, Draft, EmailAddress, Message, MessageId, StoredMessage,
    ThreadId,
};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- One linked mailbox per user
            CREATE TABLE accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                provider TEXT NOT NULL DEFAULT 'gmail',
                credential TEXT,  -- JSON
                last_synced_at TEXT,
                created_at TEXT NOT NULL
            );

            -- Caller bearer tokens
            CREATE TABLE sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Imported messages with zstd-compressed bodies
            CREATE TABLE messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                provider_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                from_name TEXT NOT NULL,
                from_email TEXT NOT NULL,
                subject TEXT NOT NULL,
                snippet TEXT NOT NULL,
                body BLOB NOT NULL,  -- zstd compressed
                labels TEXT NOT NULL DEFAULT '[]',  -- JSON array
                category TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                is_starred INTEGER NOT NULL DEFAULT 0,
                has_attachments INTEGER NOT NULL DEFAULT 0,
                received_at INTEGER NOT NULL,  -- millis since epoch
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (account_id, provider_id),
                FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_messages_account_received
                ON messages(account_id, received_at DESC);
            "#,
        ),
        // Migration 2: Drafts
        M::up(
            r#"
            CREATE TABLE drafts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                to_email TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL,
                generated_by_ai INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_drafts_account ON drafts(account_id, created_at DESC);
            "#,
        ),
    ])
}

const MESSAGE_COLUMNS: &str = "id, account_id, provider_id, thread_id, from_name, from_email,
     subject, snippet, body, labels, category, is_read, is_starred,
     has_attachments, received_at";

const ACCOUNT_COLUMNS: &str =
    "id, user_id, email, provider, credential, last_synced_at, created_at";

/// Raw message row before body decompression and JSON decoding
struct MessageRow {
    id: i64,
    account_id: i64,
    provider_id: String,
    thread_id: String,
    from_name: String,
    from_email: String,
    subject: String,
    snippet: String,
    body: Vec<u8>,
    labels: String,
    category: String,
    is_read: bool,
    is_starred: bool,
    has_attachments: bool,
    received_at: i64,
}

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            provider_id: row.get(2)?,
            thread_id: row.get(3)?,
            from_name: row.get(4)?,
            from_email: row.get(5)?,
            subject: row.get(6)?,
            snippet: row.get(7)?,
            body: row.get(8)?,
            labels: row.get(9)?,
            category: row.get(10)?,
            is_read: row.get(11)?,
            is_starred: row.get(12)?,
            has_attachments: row.get(13)?,
            received_at: row.get(14)?,
        })
    }

    fn into_stored(self) -> Result<StoredMessage> {
        let body = zstd::decode_all(self.body.as_slice()).context("Failed to decompress body")?;
        let label_ids: Vec<String> =
            serde_json::from_str(&self.labels).context("Failed to parse stored labels")?;
        let received_at = DateTime::from_timestamp_millis(self.received_at)
            .with_context(|| format!("Invalid received_at {}", self.received_at))?;

        let message = Message::builder(MessageId::new(self.provider_id), ThreadId::new(self.thread_id))
            .from(EmailAddress::new(self.from_name, self.from_email))
            .subject(self.subject)
            .snippet(self.snippet)
            .body(String::from_utf8_lossy(&body).into_owned())
            .label_ids(label_ids)
            .category(self.category.parse::<Category>()?)
            .read(self.is_read)
            .starred(self.is_starred)
            .has_attachments(self.has_attachments)
            .received_at(received_at)
            .build();

        Ok(StoredMessage {
            id: self.id,
            account_id: self.account_id,
            message,
        })
    }
}

/// Raw account row
struct AccountRow {
    id: i64,
    user_id: String,
    email: String,
    provider: String,
    credential: Option<String>,
    last_synced_at: Option<String>,
    created_at: String,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            provider: row.get(3)?,
            credential: row.get(4)?,
            last_synced_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        let credential = self
            .credential
            .map(|json| serde_json::from_str::<Credential>(&json))
            .transpose()
            .context("Failed to parse stored credential")?;

        Ok(Account {
            id: self.id,
            user_id: self.user_id,
            email: self.email,
            provider: self.provider,
            credential,
            last_synced_at: self.last_synced_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp {:?}", value))
}

/// SQLite-based mail storage
///
/// A single connection guarded by a mutex. Separate stores (or processes)
/// opened on the same file are safe against duplicate imports because the
/// messages table carries `UNIQUE (account_id, provider_id)`.
pub struct SqliteMailStore {
    conn: Mutex<Connection>,
}

impl SqliteMailStore {
    /// Open (or create) a SQLite mail store at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // Other connections may hold the write lock while this one starts up
        conn.busy_timeout(Duration::from_secs(5))?;

        // WAL lets concurrent sync runs read while another writes; foreign_keys
        // is required for ON DELETE CASCADE.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database lock poisoned"))
    }
}

impl MailStore for SqliteMailStore {
    fn create_account(&self, mut account: Account) -> Result<Account> {
        let credential = account
            .credential
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (user_id, email, provider, credential, last_synced_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                account.user_id,
                account.email,
                account.provider,
                credential,
                account.last_synced_at.map(|t| t.to_rfc3339()),
                account.created_at.to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to link account for user {}", account.user_id))?;

        account.id = conn.last_insert_rowid();
        Ok(account)
    }

    fn find_account_for_user(&self, user_id: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM accounts WHERE user_id = ?", ACCOUNT_COLUMNS);
        let row = conn
            .query_row(&sql, [user_id], AccountRow::from_row)
            .optional()?;
        row.map(AccountRow::into_account).transpose()
    }

    fn update_account_credential(&self, account_id: i64, credential: &Credential) -> Result<()> {
        let json = serde_json::to_string(credential)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE accounts SET credential = ? WHERE id = ?",
            params![json, account_id],
        )?;
        if changed == 0 {
            anyhow::bail!("Account {} not found", account_id);
        }
        Ok(())
    }

    fn update_last_synced(&self, account_id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE accounts SET last_synced_at = ? WHERE id = ?",
            params![at.to_rfc3339(), account_id],
        )?;
        if changed == 0 {
            anyhow::bail!("Account {} not found", account_id);
        }
        Ok(())
    }

    fn create_session(&self, user_id: &str, token: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (token, user_id) VALUES (?, ?)
             ON CONFLICT(token) DO UPDATE SET user_id = excluded.user_id",
            params![token, user_id],
        )?;
        Ok(())
    }

    fn user_for_session(&self, token: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?",
                [token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user)
    }

    fn has_message(&self, account_id: i64, id: &MessageId) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE account_id = ? AND provider_id = ?",
            params![account_id, id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_message(&self, account_id: i64, message: &Message) -> Result<bool> {
        // Compress body with zstd (level 3 = good balance of speed vs compression)
        let body = zstd::encode_all(message.body.as_bytes(), 3).context("Failed to compress body")?;
        let labels = serde_json::to_string(&message.label_ids)?;

        let conn = self.conn()?;
        // DO NOTHING keeps existing rows (and their local flags) untouched
        let inserted = conn.execute(
            "INSERT INTO messages
             (account_id, provider_id, thread_id, from_name, from_email, subject, snippet,
              body, labels, category, is_read, is_starred, has_attachments, received_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(account_id, provider_id) DO NOTHING",
            params![
                account_id,
                message.id.as_str(),
                message.thread_id.as_str(),
                message.from.name,
                message.from.email,
                message.subject,
                message.snippet,
                body,
                labels,
                message.category.as_str(),
                message.is_read,
                message.is_starred,
                message.has_attachments,
                message.received_at.timestamp_millis(),
            ],
        )?;

        Ok(inserted > 0)
    }

    fn get_message(&self, id: i64) -> Result<Option<StoredMessage>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS);
        let row = conn.query_row(&sql, [id], MessageRow::from_row).optional()?;
        row.map(MessageRow::into_stored).transpose()
    }

    fn list_messages(&self, account_id: i64) -> Result<Vec<StoredMessage>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM messages WHERE account_id = ?
             ORDER BY received_at DESC, id ASC",
            MESSAGE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id], MessageRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(MessageRow::into_stored).collect()
    }

    fn count_messages(&self, account_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE account_id = ?",
            [account_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn set_starred(&self, id: i64, starred: bool) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE messages SET is_starred = ? WHERE id = ?",
            params![starred, id],
        )?;
        Ok(changed > 0)
    }

    fn set_read(&self, id: i64, read: bool) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE messages SET is_read = ? WHERE id = ?",
            params![read, id],
        )?;
        Ok(changed > 0)
    }

    fn save_draft(&self, mut draft: Draft) -> Result<Draft> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO drafts (account_id, to_email, subject, body, generated_by_ai, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                draft.account_id,
                draft.to,
                draft.subject,
                draft.body,
                draft.generated_by_ai,
                draft.created_at.to_rfc3339(),
            ],
        )?;
        draft.id = conn.last_insert_rowid();
        Ok(draft)
    }

    fn list_drafts(&self, account_id: i64) -> Result<Vec<Draft>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, to_email, subject, body, generated_by_ai, created_at
             FROM drafts WHERE account_id = ?
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt
            .query_map([account_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, account_id, to, subject, body, generated_by_ai, created_at)| {
                Ok(Draft {
                    id,
                    account_id,
                    to,
                    subject,
                    body,
                    generated_by_ai,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}
