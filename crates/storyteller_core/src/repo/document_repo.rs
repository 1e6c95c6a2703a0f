//! Document store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist whole story records keyed by id.
//! - List stories most-recently-modified first.
//!
//! # Invariants
//! - `save` overwrites the full record: last writer wins, no merge and no
//!   version check. Concurrent saves of one id race only on which lands last.
//! - `last_modified` is stamped on every save and never moves backwards.
//! - Stored titles are never blank.

use crate::clock::{Clock, SystemClock};
use crate::frontmatter;
use crate::model::document::{normalize_title, Document, DocumentId};
use crate::repo::{ensure_table, StoreError, StoreResult};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::Instant;
use uuid::Uuid;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    body,
    story_intent,
    chapter_intent,
    last_modified
FROM documents";

/// Storage contract consumed by autosave and session services.
pub trait DocumentStore {
    /// Creates and persists an empty document.
    fn create(&self, title: &str) -> StoreResult<Document>;
    fn get(&self, id: DocumentId) -> StoreResult<Option<Document>>;
    /// All documents, `last_modified` descending.
    fn list(&self) -> StoreResult<Vec<Document>>;
    /// Stamps `last_modified`, normalizes the title and writes the record.
    fn save(&self, doc: &mut Document) -> StoreResult<()>;
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore<'conn, C: Clock = SystemClock> {
    conn: &'conn Connection,
    clock: C,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Constructs a store over a migrated connection using the system clock.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        Self::with_clock(conn, SystemClock)
    }
}

impl<'conn, C: Clock> SqliteDocumentStore<'conn, C> {
    /// Constructs a store that stamps writes with `clock`.
    pub fn with_clock(conn: &'conn Connection, clock: C) -> StoreResult<Self> {
        ensure_table(conn, "documents")?;
        Ok(Self { conn, clock })
    }

    /// Frontmatter-encoded text persisted with the last save.
    pub fn content_markdown(&self, id: DocumentId) -> StoreResult<Option<String>> {
        let markdown = self
            .conn
            .query_row(
                "SELECT content_markdown FROM documents WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(markdown)
    }

    fn write(&self, doc: &Document) -> StoreResult<i64> {
        let id = doc.id.to_string();
        let markdown = frontmatter::encode(&doc.body, &doc.story_intent, &doc.chapter_intent);
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO documents (
                id,
                title,
                body,
                content_markdown,
                story_intent,
                chapter_intent,
                last_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                content_markdown = excluded.content_markdown,
                story_intent = excluded.story_intent,
                chapter_intent = excluded.chapter_intent,
                last_modified = MAX(documents.last_modified, excluded.last_modified);",
            params![
                id.as_str(),
                doc.title.as_str(),
                doc.body.as_str(),
                markdown.as_str(),
                doc.story_intent.as_str(),
                doc.chapter_intent.as_str(),
                doc.last_modified,
            ],
        )?;
        let stamped: i64 = tx.query_row(
            "SELECT last_modified FROM documents WHERE id = ?1;",
            [id.as_str()],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(stamped)
    }
}

impl<C: Clock> DocumentStore for SqliteDocumentStore<'_, C> {
    fn create(&self, title: &str) -> StoreResult<Document> {
        let mut doc = Document::new(title, self.clock.now_ms());
        self.save(&mut doc)?;
        info!("event=document_create module=repo status=ok id={}", doc.id);
        Ok(doc)
    }

    fn get(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_document_row(row)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL} ORDER BY last_modified DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn save(&self, doc: &mut Document) -> StoreResult<()> {
        let started_at = Instant::now();
        let mut stamped = doc.clone();
        stamped.title = normalize_title(&doc.title);
        stamped.last_modified = self.clock.now_ms();

        match self.write(&stamped) {
            Ok(last_modified) => {
                stamped.last_modified = last_modified;
                *doc = stamped;
                info!(
                    "event=document_save module=repo status=ok id={} body_chars={} duration_ms={}",
                    doc.id,
                    doc.body.chars().count(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=document_save module=repo status=error id={} duration_ms={} error={}",
                    doc.id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn parse_document_row(row: &Row<'_>) -> StoreResult<Document> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{id_text}` in documents.id"))
    })?;
    let title: String = row.get("title")?;
    if title.trim().is_empty() {
        return Err(StoreError::InvalidData(format!(
            "blank title stored for document {id}"
        )));
    }

    Ok(Document {
        id,
        title,
        body: row.get("body")?,
        story_intent: row.get("story_intent")?,
        chapter_intent: row.get("chapter_intent")?,
        last_modified: row.get("last_modified")?,
    })
}
