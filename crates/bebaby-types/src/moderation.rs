//! Report and content moderation state machines.
//!
//! These functions decide transitions only; persisting them (and doing so
//! atomically) is the storage layer's job.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{ContentStatus, ParseEnumError, ReportStatus, UserStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Review,
    BlockUser,
    DeleteUser,
}

impl FromStr for ReportAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" => Ok(Self::Review),
            "block_user" => Ok(Self::BlockUser),
            "delete_user" => Ok(Self::DeleteUser),
            other => Err(ParseEnumError {
                kind: "action",
                value: other.to_string(),
            }),
        }
    }
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::BlockUser => "block_user",
            Self::DeleteUser => "delete_user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentAction {
    Approve,
    Reject,
}

impl FromStr for ContentAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(ParseEnumError {
                kind: "action",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("report already resolved")]
    ReportResolved,
    #[error("content already moderated")]
    ContentModerated,
}

/// Outcome of applying a [`ReportAction`] to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTransition {
    pub report_status: ReportStatus,
    /// New status for the reported user, if the action touches them.
    pub user_status: Option<UserStatus>,
}

impl ReportTransition {
    pub fn resolves(&self) -> bool {
        self.report_status == ReportStatus::Resolved
    }
}

/// PENDING is the only state that accepts actions. `review` re-affirms
/// PENDING, which the admin UI shows as "under review".
pub fn transition_report(
    current: ReportStatus,
    action: ReportAction,
) -> Result<ReportTransition, TransitionError> {
    if current == ReportStatus::Resolved {
        return Err(TransitionError::ReportResolved);
    }
    Ok(match action {
        ReportAction::Review => ReportTransition {
            report_status: ReportStatus::Pending,
            user_status: None,
        },
        ReportAction::BlockUser => ReportTransition {
            report_status: ReportStatus::Resolved,
            user_status: Some(UserStatus::Banned),
        },
        // Soft delete: the account row stays so messages and photos keep
        // their owner.
        ReportAction::DeleteUser => ReportTransition {
            report_status: ReportStatus::Resolved,
            user_status: Some(UserStatus::Inactive),
        },
    })
}

/// APPROVED and REJECTED are terminal.
pub fn transition_content(
    current: ContentStatus,
    action: ContentAction,
) -> Result<ContentStatus, TransitionError> {
    match current {
        ContentStatus::Pending => Ok(match action {
            ContentAction::Approve => ContentStatus::Approved,
            ContentAction::Reject => ContentStatus::Rejected,
        }),
        ContentStatus::Approved | ContentStatus::Rejected => {
            Err(TransitionError::ContentModerated)
        }
    }
}
