use rusqlite::{Connection, params};
use tracing::{debug, info};
use uuid::Uuid;

use bebaby_types::models::{Notification, NotificationKind, TripNotice};

use super::now;
use crate::models::{NOTIFICATION_COLUMNS, notification_from_row};
use crate::{Database, DbError, Result};

/// Recipients are read this many at a time during trip fan-out.
pub const TRIP_FANOUT_PAGE: u32 = 500;

impl Database {
    // -- Notifications --

    /// Notify every user whose `state` matches the trip, sender excluded.
    ///
    /// Returns `(recipients, created)`. Each row carries the trip's dedupe
    /// key and is inserted with `OR IGNORE`, so replaying the same trip
    /// yields `created == 0`. Recipients are walked in keyset pages of
    /// [`TRIP_FANOUT_PAGE`]; each page commits on its own.
    pub fn fan_out_trip(&self, trip: &TripNotice) -> Result<(usize, usize)> {
        let title = trip.title();
        let message = trip.message();
        let sender = trip.sender_id.to_string();

        let mut recipients = 0;
        let mut created = 0;
        let mut cursor = String::new();

        loop {
            let page = self.with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let ids: Vec<String> = {
                    let mut stmt = tx.prepare(
                        "SELECT id FROM users
                         WHERE state = ?1 AND id != ?2 AND id > ?3
                         ORDER BY id
                         LIMIT ?4",
                    )?;
                    stmt.query_map(
                        params![trip.state, sender, cursor, TRIP_FANOUT_PAGE],
                        |row| row.get(0),
                    )?
                    .collect::<rusqlite::Result<_>>()?
                };

                let mut inserted = 0;
                for id in &ids {
                    let recipient: Uuid = id.parse().map_err(|_| DbError::NotFound("user"))?;
                    if insert_notification(
                        &tx,
                        recipient,
                        &title,
                        &message,
                        NotificationKind::Trip,
                        Some(&trip.dedupe_key(recipient)),
                    )? {
                        inserted += 1;
                    }
                }
                tx.commit()?;
                Ok((ids, inserted))
            })?;

            let (ids, inserted) = page;
            recipients += ids.len();
            created += inserted;
            debug!(page = ids.len(), inserted, "trip fan-out page");

            match ids.last() {
                Some(last) if ids.len() as u32 == TRIP_FANOUT_PAGE => cursor = last.clone(),
                _ => break,
            }
        }

        info!(
            sender_id = %trip.sender_id,
            state = %trip.state,
            recipients,
            created,
            "trip notifications fanned out"
        );
        Ok((recipients, created))
    }

    /// The user's notifications, newest first.
    pub fn list_notifications(&self, user_id: Uuid, limit: u32) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id.to_string(), limit], notification_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Mark one notification read. Someone else's notification is reported
    /// as not found.
    pub fn mark_notification_read(&self, id: &str, user_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("notification"));
            }
            Ok(())
        })
    }
}

/// Insert one notification. Returns false when `dedupe_key` was already
/// taken and nothing was written.
pub(crate) fn insert_notification(
    conn: &Connection,
    user_id: Uuid,
    title: &str,
    message: &str,
    kind: NotificationKind,
    dedupe_key: Option<&str>,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO notifications (id, user_id, title, message, kind, read, dedupe_key, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
        params![
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            title,
            message,
            kind.as_str(),
            dedupe_key,
            now()
        ],
    )?;
    Ok(changed == 1)
}
