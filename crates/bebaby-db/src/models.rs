//! Row mapping. Ids are stored as hyphenated TEXT, enums by their wire
//! spelling, timestamps through rusqlite's chrono support.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use bebaby_types::models::{
    ContentType, Conversation, Message, Notification, PendingContent, Report, User,
};

pub(crate) const USER_COLUMNS: &str = "id, email, username, birthdate, gender, user_type, \
     looking_for, state, city, about, photo_url, education, profession, email_verified, \
     verified, is_admin, premium, premium_expiry, status, created_at, updated_at";

pub(crate) const REPORT_COLUMNS: &str = "id, reporter_id, reported_id, reason, status, \
     admin_notes, handled_by, version, created_at, updated_at";

pub(crate) const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, kind, read, created_at";

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, receiver_id, content, read, created_at";

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parsed::<Uuid>(row, 0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        birthdate: row.get(3)?,
        gender: row.get(4)?,
        user_type: parsed(row, 5)?,
        looking_for: row.get(6)?,
        state: row.get(7)?,
        city: row.get(8)?,
        about: row.get(9)?,
        photo_url: row.get(10)?,
        education: row.get(11)?,
        profession: row.get(12)?,
        email_verified: row.get(13)?,
        verified: row.get(14)?,
        is_admin: row.get(15)?,
        premium: row.get(16)?,
        premium_expiry: row.get(17)?,
        status: parsed(row, 18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

pub(crate) fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: parsed(row, 0)?,
        reporter_id: parsed(row, 1)?,
        reported_id: parsed(row, 2)?,
        reason: row.get(3)?,
        status: parsed(row, 4)?,
        admin_notes: row.get(5)?,
        handled_by: parsed_opt(row, 6)?,
        version: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Photos: `id, user_id, url, status, moderated_by, moderated_at, created_at`.
pub(crate) fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<PendingContent> {
    Ok(PendingContent {
        id: parsed(row, 0)?,
        user_id: parsed(row, 1)?,
        content_type: ContentType::Photo,
        body: row.get(2)?,
        field: None,
        status: parsed(row, 3)?,
        moderated_by: parsed_opt(row, 4)?,
        moderated_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Texts: `id, user_id, content, status, moderated_by, moderated_at,
/// created_at, field`.
pub(crate) fn text_from_row(row: &Row<'_>) -> rusqlite::Result<PendingContent> {
    Ok(PendingContent {
        id: parsed(row, 0)?,
        user_id: parsed(row, 1)?,
        content_type: ContentType::Text,
        body: row.get(2)?,
        status: parsed(row, 3)?,
        moderated_by: parsed_opt(row, 4)?,
        moderated_at: row.get(5)?,
        created_at: row.get(6)?,
        field: Some(row.get(7)?),
    })
}

pub(crate) fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: parsed(row, 0)?,
        user_id: parsed(row, 1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: parsed(row, 4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Conversations: `id, user_a, user_b, created_at, updated_at`.
pub(crate) fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        participants: [parsed(row, 1)?, parsed(row, 2)?],
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: parsed(row, 0)?,
        conversation_id: row.get(1)?,
        sender_id: parsed(row, 2)?,
        receiver_id: parsed(row, 3)?,
        content: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}
