use bebaby_types::moderation::TransitionError;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A UNIQUE or PRIMARY KEY constraint rejected the write. Carries the
    /// offending column.
    #[error("{0} already exists")]
    Conflict(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// A conditional update matched no row: someone else wrote first.
    #[error("{0} was modified concurrently")]
    StaleWrite(&'static str),

    #[error("database lock poisoned")]
    Poisoned,

    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match unique_violation_column(&err) {
            Some(column) => DbError::Conflict(column),
            None => DbError::Sqlite(err),
        }
    }
}

/// Extracts `email` from "UNIQUE constraint failed: users.email".
fn unique_violation_column(err: &rusqlite::Error) -> Option<String> {
    let rusqlite::Error::SqliteFailure(code, Some(msg)) = err else {
        return None;
    };
    if code.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        && code.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    {
        return None;
    }
    let columns = msg.rsplit(": ").next()?;
    let first = columns.split(", ").next()?;
    Some(first.rsplit('.').next().unwrap_or(first).to_string())
}
