use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                username        TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                birthdate       TEXT,
                gender          TEXT,
                user_type       TEXT NOT NULL,
                looking_for     TEXT,
                state           TEXT,
                city            TEXT,
                about           TEXT,
                photo_url       TEXT,
                education       TEXT,
                profession      TEXT,
                email_verified  INTEGER NOT NULL DEFAULT 0,
                verified        INTEGER NOT NULL DEFAULT 0,
                is_admin        INTEGER NOT NULL DEFAULT 0,
                premium         INTEGER NOT NULL DEFAULT 0,
                premium_expiry  TEXT,
                status          TEXT NOT NULL DEFAULT 'ACTIVE',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_users_state ON users(state, id);

            CREATE TABLE reports (
                id           TEXT PRIMARY KEY,
                reporter_id  TEXT NOT NULL REFERENCES users(id),
                reported_id  TEXT NOT NULL REFERENCES users(id),
                reason       TEXT NOT NULL,
                status       TEXT NOT NULL DEFAULT 'PENDING',
                admin_notes  TEXT,
                handled_by   TEXT REFERENCES users(id),
                version      INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );

            CREATE INDEX idx_reports_status ON reports(status, created_at);

            CREATE TABLE photos (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL REFERENCES users(id),
                url           TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'PENDING',
                moderated_by  TEXT REFERENCES users(id),
                moderated_at  TEXT,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE pending_texts (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL REFERENCES users(id),
                field         TEXT NOT NULL,
                content       TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'PENDING',
                moderated_by  TEXT REFERENCES users(id),
                moderated_at  TEXT,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                title       TEXT NOT NULL,
                message     TEXT NOT NULL,
                kind        TEXT NOT NULL,
                read        INTEGER NOT NULL DEFAULT 0,
                dedupe_key  TEXT UNIQUE,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

            CREATE TABLE conversations (
                id          TEXT PRIMARY KEY,
                user_a      TEXT NOT NULL REFERENCES users(id),
                user_b      TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                CHECK (user_a < user_b)
            );

            CREATE TABLE messages (
                id               TEXT PRIMARY KEY,
                conversation_id  TEXT NOT NULL REFERENCES conversations(id),
                sender_id        TEXT NOT NULL REFERENCES users(id),
                receiver_id      TEXT NOT NULL REFERENCES users(id),
                content          TEXT NOT NULL,
                read             INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation ON messages(conversation_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
