use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use bebaby_types::models::{User, UserStatus, UserType};

use super::now;
use crate::models::{USER_COLUMNS, user_from_row};
use crate::{Database, DbError, Result};

/// Fields for a new account. `password_hash` is already argon2-hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub birthdate: Option<String>,
    pub gender: Option<String>,
    pub looking_for: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub education: Option<String>,
    pub profession: Option<String>,
    pub is_admin: bool,
    pub verified: bool,
}

impl NewUser {
    pub fn new(email: &str, username: &str, password_hash: &str, user_type: UserType) -> Self {
        Self {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            user_type,
            birthdate: None,
            gender: None,
            looking_for: None,
            state: None,
            city: None,
            education: None,
            profession: None,
            is_admin: false,
            verified: false,
        }
    }
}

impl Database {
    // -- Users --

    /// Insert a user. Duplicate email or username surfaces as
    /// [`DbError::Conflict`] from the UNIQUE constraints; there is no
    /// read-before-write check.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let ts = now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, password, user_type, birthdate, gender,
                                    looking_for, state, city, education, profession, is_admin,
                                    verified, email_verified, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14, ?15, ?16, ?16)",
                params![
                    id,
                    new.email,
                    new.username,
                    new.password_hash,
                    new.user_type.as_str(),
                    new.birthdate,
                    new.gender,
                    new.looking_for,
                    new.state,
                    new.city,
                    new.education,
                    new.profession,
                    new.is_admin,
                    new.verified,
                    UserStatus::Active.as_str(),
                    ts,
                ],
            )?;
            query_user(conn, &id)?.ok_or(DbError::NotFound("user"))
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// User plus password hash, for login by email.
    pub fn get_credentials_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        self.with_conn(|conn| query_credentials(conn, "email", email))
    }

    /// Admin plus password hash, for admin login by username. Non-admin
    /// accounts are not returned.
    pub fn get_admin_credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        self.with_conn(|conn| {
            Ok(query_credentials(conn, "username", username)?
                .filter(|(user, _)| user.is_admin))
        })
    }

    pub fn get_user_status(&self, id: &str) -> Result<Option<UserStatus>> {
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row("SELECT status FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            raw.map(|s| {
                s.parse::<UserStatus>().map_err(|e| {
                    DbError::Sqlite(rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    ))
                })
            })
            .transpose()
        })
    }

    pub fn list_users(
        &self,
        status: Option<UserStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC, id
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![status.map(|s| s.as_str()), limit, offset],
                    user_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Overwrite the premium flag. No payment state is consulted.
    pub fn set_premium(&self, id: &str, premium: bool) -> Result<User> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET premium = ?1, updated_at = ?2 WHERE id = ?3",
                params![premium, now(), id],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("user"));
            }
            query_user(conn, id)?.ok_or(DbError::NotFound("user"))
        })
    }

    /// Change lifecycle status. Users are never physically deleted; "delete"
    /// is `INACTIVE`.
    pub fn set_user_status(&self, id: &str, status: UserStatus) -> Result<User> {
        self.with_conn(|conn| {
            update_user_status(conn, id, status)?;
            query_user(conn, id)?.ok_or(DbError::NotFound("user"))
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

fn query_credentials(
    conn: &Connection,
    column: &'static str,
    value: &str,
) -> Result<Option<(User, String)>> {
    let sql = format!("SELECT {USER_COLUMNS}, password FROM users WHERE {column} = ?1");
    let row = conn
        .query_row(&sql, [value], |row| Ok((user_from_row(row)?, row.get(21)?)))
        .optional()?;
    Ok(row)
}

pub(crate) fn update_user_status(conn: &Connection, id: &str, status: UserStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE users SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now(), id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound("user"));
    }
    Ok(())
}
