use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use bebaby_types::models::{
    Conversation, Message, NotificationKind, conversation_id, conversation_participants,
};

use super::notifications::insert_notification;
use super::now;
use super::users::query_user;
use crate::models::{MESSAGE_COLUMNS, conversation_from_row, message_from_row};
use crate::{Database, DbError, Result};

const CONVERSATION_COLUMNS: &str = "id, user_a, user_b, created_at, updated_at";

impl Database {
    // -- Conversations --

    /// Find or open the conversation between two users. The id is derived
    /// from the sorted pair and inserted with `OR IGNORE`, so concurrent
    /// callers converge on one row. The flag is true when this call created
    /// it.
    pub fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> Result<(Conversation, bool)> {
        let id = conversation_id(a, b);
        let (lo, hi) = conversation_participants(&id).ok_or(DbError::NotFound("conversation"))?;
        let ts = now();
        self.with_conn(|conn| {
            if query_user(conn, &b.to_string())?.is_none() {
                return Err(DbError::NotFound("user"));
            }
            let changed = conn.execute(
                "INSERT OR IGNORE INTO conversations (id, user_a, user_b, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id, lo.to_string(), hi.to_string(), ts],
            )?;
            let conversation =
                query_conversation(conn, &id)?.ok_or(DbError::NotFound("conversation"))?;
            Ok((conversation, changed == 1))
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        self.with_conn(|conn| query_conversation(conn, id))
    }

    /// Store a message from `sender` and notify the other participant. The
    /// sender must belong to the conversation.
    pub fn insert_message(&self, conversation: &str, sender: Uuid, content: &str) -> Result<Message> {
        let id = Uuid::new_v4().to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let conv = query_conversation(&tx, conversation)?
                .filter(|c| c.participants.contains(&sender))
                .ok_or(DbError::NotFound("conversation"))?;
            let receiver = if conv.participants[0] == sender {
                conv.participants[1]
            } else {
                conv.participants[0]
            };
            let ts = now();

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    id,
                    conversation,
                    sender.to_string(),
                    receiver.to_string(),
                    content,
                    ts
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![ts, conversation],
            )?;

            let sender_name = query_user(&tx, &sender.to_string())?
                .map(|u| u.username)
                .ok_or(DbError::NotFound("user"))?;
            insert_notification(
                &tx,
                receiver,
                "New message",
                &format!("{sender_name} sent you a message."),
                NotificationKind::Message,
                None,
            )?;

            let message = query_message(&tx, &id)?.ok_or(DbError::NotFound("message"))?;
            tx.commit()?;
            debug!(conversation_id = conversation, sender_id = %sender, "message stored");
            Ok(message)
        })
    }

    /// One page of history in chronological order: the newest `limit`
    /// messages, or with `before` the newest `limit` older than that message.
    /// An unknown cursor yields an empty page.
    pub fn list_messages(
        &self,
        conversation: &str,
        before: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                   AND (?2 IS NULL OR (created_at, id) <
                        (SELECT created_at, id FROM messages
                         WHERE id = ?2 AND conversation_id = ?1))
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(params![conversation, before, limit], message_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    /// Mark the given messages read where `reader` is their receiver.
    /// Returns how many changed.
    pub fn mark_messages_read(
        &self,
        conversation: &str,
        reader: Uuid,
        ids: &[Uuid],
    ) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut changed = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE messages SET read = 1
                     WHERE id = ?1 AND conversation_id = ?2 AND receiver_id = ?3 AND read = 0",
                )?;
                for id in ids {
                    changed +=
                        stmt.execute(params![id.to_string(), conversation, reader.to_string()])?;
                }
            }
            tx.commit()?;
            Ok(changed)
        })
    }
}

fn query_conversation(conn: &Connection, id: &str) -> Result<Option<Conversation>> {
    let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], conversation_from_row).optional()?)
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<Message>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], message_from_row).optional()?)
}
