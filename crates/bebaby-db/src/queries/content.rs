use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use bebaby_types::models::{ContentStatus, ContentType, PendingContent};
use bebaby_types::moderation::{ContentAction, transition_content};

use super::now;
use crate::models::{photo_from_row, text_from_row};
use crate::{Database, DbError, Result};

const PHOTO_COLUMNS: &str = "id, user_id, url, status, moderated_by, moderated_at, created_at";
const TEXT_COLUMNS: &str =
    "id, user_id, content, status, moderated_by, moderated_at, created_at, field";

/// Profile fields a pending text may target.
pub const TEXT_FIELDS: &[&str] = &["about"];

impl Database {
    // -- Pending content --

    pub fn create_photo(&self, user_id: Uuid, url: &str) -> Result<PendingContent> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO photos (id, user_id, url, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    user_id.to_string(),
                    url,
                    ContentStatus::Pending.as_str(),
                    now()
                ],
            )?;
            query_content(conn, ContentType::Photo, &id)?.ok_or(DbError::NotFound("content"))
        })
    }

    /// Queue a profile text edit. It only reaches the profile once approved.
    pub fn create_pending_text(
        &self,
        user_id: Uuid,
        field: &str,
        content: &str,
    ) -> Result<PendingContent> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pending_texts (id, user_id, field, content, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    user_id.to_string(),
                    field,
                    content,
                    ContentStatus::Pending.as_str(),
                    now()
                ],
            )?;
            query_content(conn, ContentType::Text, &id)?.ok_or(DbError::NotFound("content"))
        })
    }

    pub fn get_content(&self, content_type: ContentType, id: &str) -> Result<Option<PendingContent>> {
        self.with_conn(|conn| query_content(conn, content_type, id))
    }

    /// Everything still awaiting a decision, photos and texts together,
    /// oldest first.
    pub fn list_pending_content(&self, limit: u32) -> Result<Vec<PendingContent>> {
        self.with_conn(|conn| {
            let pending = ContentStatus::Pending.as_str();

            let photo_sql = format!(
                "SELECT {PHOTO_COLUMNS} FROM photos WHERE status = ?1 ORDER BY created_at LIMIT ?2"
            );
            let mut items = conn
                .prepare(&photo_sql)?
                .query_map(params![pending, limit], photo_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let text_sql = format!(
                "SELECT {TEXT_COLUMNS} FROM pending_texts WHERE status = ?1 ORDER BY created_at LIMIT ?2"
            );
            items.extend(
                conn.prepare(&text_sql)?
                    .query_map(params![pending, limit], text_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?,
            );

            items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            items.truncate(limit as usize);
            Ok(items)
        })
    }

    /// Approve or reject a pending item.
    ///
    /// Approval also applies the content to the owner's profile: a photo
    /// becomes `photo_url`, a text overwrites its target field. Both writes
    /// share one transaction. The status update is conditional on the row
    /// still being PENDING.
    pub fn moderate_content(
        &self,
        content_type: ContentType,
        id: &str,
        action: ContentAction,
        admin_id: Uuid,
    ) -> Result<PendingContent> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let item = query_content(&tx, content_type, id)?.ok_or(DbError::NotFound("content"))?;
            let next = transition_content(item.status, action)?;
            let ts = now();

            let table = table_for(content_type);
            let changed = tx.execute(
                &format!(
                    "UPDATE {table} SET status = ?1, moderated_by = ?2, moderated_at = ?3
                     WHERE id = ?4 AND status = ?5"
                ),
                params![
                    next.as_str(),
                    admin_id.to_string(),
                    ts,
                    id,
                    ContentStatus::Pending.as_str()
                ],
            )?;
            if changed == 0 {
                return Err(DbError::StaleWrite("content"));
            }

            if next == ContentStatus::Approved {
                apply_to_profile(&tx, &item)?;
            }

            let updated = query_content(&tx, content_type, id)?.ok_or(DbError::NotFound("content"))?;
            tx.commit()?;

            info!(
                content_id = %updated.id,
                content_type = %content_type,
                admin_id = %admin_id,
                status = %updated.status,
                "content moderated"
            );
            Ok(updated)
        })
    }
}

fn table_for(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Photo => "photos",
        ContentType::Text => "pending_texts",
    }
}

fn query_content(
    conn: &Connection,
    content_type: ContentType,
    id: &str,
) -> Result<Option<PendingContent>> {
    let item = match content_type {
        ContentType::Photo => conn
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"),
                [id],
                photo_from_row,
            )
            .optional()?,
        ContentType::Text => conn
            .query_row(
                &format!("SELECT {TEXT_COLUMNS} FROM pending_texts WHERE id = ?1"),
                [id],
                text_from_row,
            )
            .optional()?,
    };
    Ok(item)
}

fn apply_to_profile(conn: &Connection, item: &PendingContent) -> Result<()> {
    let column = match (item.content_type, item.field.as_deref()) {
        (ContentType::Photo, _) => "photo_url",
        (ContentType::Text, Some(field)) if TEXT_FIELDS.contains(&field) => "about",
        // Unknown target fields are approved without touching the profile.
        (ContentType::Text, _) => return Ok(()),
    };
    let changed = conn.execute(
        &format!("UPDATE users SET {column} = ?1, updated_at = ?2 WHERE id = ?3"),
        params![item.body, now(), item.user_id.to_string()],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound("user"));
    }
    Ok(())
}
