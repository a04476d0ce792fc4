use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a string-backed enum with `as_str`, `FromStr` and `Display`.
/// The wire spelling doubles as the database spelling.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Lifecycle status of an account.
    UserStatus, "user status", {
        Active => "ACTIVE",
        Pending => "PENDING",
        Banned => "BANNED",
        Inactive => "INACTIVE",
    }
);

string_enum!(UserType, "user type", {
    SugarBaby => "SUGAR_BABY",
    SugarDaddy => "SUGAR_DADDY",
    SugarMommy => "SUGAR_MOMMY",
});

string_enum!(ReportStatus, "report status", {
    Pending => "PENDING",
    Resolved => "RESOLVED",
});

string_enum!(
    /// Moderation status shared by photos and pending texts.
    ContentStatus, "content status", {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
);

string_enum!(ContentType, "content type", {
    Photo => "photo",
    Text => "text",
});

string_enum!(NotificationKind, "notification kind", {
    Trip => "trip",
    Message => "message",
    Report => "report",
});

impl UserStatus {
    /// Banned and soft-deleted accounts may not open conversations, send
    /// messages or file reports.
    pub fn can_interact(&self) -> bool {
        !matches!(self, Self::Banned | Self::Inactive)
    }

    /// Soft-deleted accounts are locked out entirely.
    pub fn can_log_in(&self) -> bool {
        !matches!(self, Self::Inactive)
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Deterministic conversation id for an unordered pair of users:
/// the two ids sorted and joined with `_`.
pub fn conversation_id(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}_{}", lo, hi)
}

/// Splits a conversation id back into its participants, rejecting ids
/// that are not in canonical sorted form.
pub fn conversation_participants(id: &str) -> Option<(Uuid, Uuid)> {
    let (a, b) = id.split_once('_')?;
    let a: Uuid = a.parse().ok()?;
    let b: Uuid = b.parse().ok()?;
    (a < b).then_some((a, b))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub birthdate: Option<String>,
    pub gender: Option<String>,
    pub user_type: UserType,
    pub looking_for: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub about: Option<String>,
    pub photo_url: Option<String>,
    pub education: Option<String>,
    pub profession: Option<String>,
    pub email_verified: bool,
    pub verified: bool,
    pub is_admin: bool,
    pub premium: bool,
    pub premium_expiry: Option<DateTime<Utc>>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub handled_by: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A photo or a profile text awaiting (or past) moderation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingContent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_type: ContentType,
    /// Public URL for photos, the submitted text for texts.
    pub body: String,
    /// Profile field a text applies to; `None` for photos.
    pub field: Option<String>,
    pub status: ContentStatus,
    pub moderated_by: Option<Uuid>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participants: [Uuid; 2],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A user's announced trip, fanned out to everyone living in `state`.
#[derive(Debug, Clone)]
pub struct TripNotice {
    pub sender_id: Uuid,
    pub sender_username: String,
    pub state: String,
    pub city: String,
    pub start: String,
    pub end: String,
}

impl TripNotice {
    pub fn title(&self) -> String {
        format!("{} is traveling to {}", self.sender_username, self.state)
    }

    pub fn message(&self) -> String {
        format!(
            "{} will be in {}, {} from {} to {}.",
            self.sender_username, self.city, self.state, self.start, self.end
        )
    }

    /// Key that makes one recipient receive a given trip at most once.
    pub fn dedupe_key(&self, recipient: Uuid) -> String {
        format!(
            "trip:{}:{}:{}:{}:{}",
            recipient, self.sender_id, self.state, self.start, self.end
        )
    }
}
