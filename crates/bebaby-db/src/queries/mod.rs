mod content;
mod conversations;
mod notifications;
mod reports;
mod users;

pub use notifications::TRIP_FANOUT_PAGE;
pub use users::NewUser;

use chrono::{DateTime, Utc};

/// Timestamps are written from Rust (not `datetime('now')`) so every column
/// shares one format and sorts lexically.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
