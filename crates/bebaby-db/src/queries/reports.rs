use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use bebaby_types::models::{NotificationKind, Report, ReportStatus, UserStatus};
use bebaby_types::moderation::{ReportAction, transition_report};

use super::notifications::insert_notification;
use super::now;
use super::users::{query_user, update_user_status};
use crate::models::{REPORT_COLUMNS, report_from_row};
use crate::{Database, DbError, Result};

impl Database {
    // -- Reports --

    /// File a report. The reported user must exist.
    pub fn create_report(&self, reporter_id: Uuid, reported_id: &str, reason: &str) -> Result<Report> {
        let id = Uuid::new_v4().to_string();
        let ts = now();
        self.with_conn(|conn| {
            if query_user(conn, reported_id)?.is_none() {
                return Err(DbError::NotFound("user"));
            }
            conn.execute(
                "INSERT INTO reports (id, reporter_id, reported_id, reason, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    id,
                    reporter_id.to_string(),
                    reported_id,
                    reason,
                    ReportStatus::Pending.as_str(),
                    ts
                ],
            )?;
            query_report(conn, &id)?.ok_or(DbError::NotFound("report"))
        })
    }

    pub fn get_report(&self, id: &str) -> Result<Option<Report>> {
        self.with_conn(|conn| query_report(conn, id))
    }

    pub fn list_reports(&self, status: Option<ReportStatus>, limit: u32) -> Result<Vec<Report>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM reports
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC, id
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![status.map(|s| s.as_str()), limit], report_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Apply an admin action to a report.
    ///
    /// The report update, the reported user's status change and the
    /// reporter's notification commit together or not at all. The report
    /// row is updated conditionally on the version read inside the same
    /// transaction, so two racing actions cannot both apply.
    pub fn apply_report_action(
        &self,
        report_id: &str,
        action: ReportAction,
        admin_notes: Option<&str>,
        admin_id: Uuid,
    ) -> Result<(Report, Option<UserStatus>)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let report = query_report(&tx, report_id)?.ok_or(DbError::NotFound("report"))?;
            let transition = transition_report(report.status, action)?;
            let ts = now();

            let changed = tx.execute(
                "UPDATE reports
                    SET status = ?1,
                        admin_notes = COALESCE(?2, admin_notes),
                        handled_by = ?3,
                        version = version + 1,
                        updated_at = ?4
                  WHERE id = ?5 AND version = ?6",
                params![
                    transition.report_status.as_str(),
                    admin_notes,
                    admin_id.to_string(),
                    ts,
                    report_id,
                    report.version
                ],
            )?;
            if changed == 0 {
                return Err(DbError::StaleWrite("report"));
            }

            if let Some(user_status) = transition.user_status {
                update_user_status(&tx, &report.reported_id.to_string(), user_status)?;
            }

            if transition.resolves() {
                insert_notification(
                    &tx,
                    report.reporter_id,
                    "Report reviewed",
                    "Thanks for your report. Our moderators have taken action.",
                    NotificationKind::Report,
                    None,
                )?;
            }

            let updated = query_report(&tx, report_id)?.ok_or(DbError::NotFound("report"))?;
            tx.commit()?;

            info!(
                report_id = %updated.id,
                admin_id = %admin_id,
                action = action.as_str(),
                status = %updated.status,
                "report action applied"
            );
            Ok((updated, transition.user_status))
        })
    }

    /// Physically remove a report row. The reported user is untouched.
    pub fn delete_report(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM reports WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(DbError::NotFound("report"));
            }
            Ok(())
        })
    }
}

fn query_report(conn: &Connection, id: &str) -> Result<Option<Report>> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], report_from_row).optional()?)
}
