use anyhow::{Context, anyhow};
use tracing::info;

use bebaby_api::auth::hash_password;
use bebaby_db::{Database, DbError, NewUser};
use bebaby_types::models::UserType;

use crate::config::AdminBootstrap;

/// Create the configured admin account unless one with that username
/// already exists. An existing account's password is left alone.
pub fn ensure_admin(db: &Database, admin: &AdminBootstrap) -> anyhow::Result<()> {
    if db.get_admin_credentials(&admin.username)?.is_some() {
        info!(username = %admin.username, "admin account present");
        return Ok(());
    }

    let hash = hash_password(&admin.password).map_err(|e| anyhow!("{e}"))?;
    let mut new = NewUser::new(
        &admin.email.trim().to_lowercase(),
        &admin.username,
        &hash,
        UserType::SugarDaddy,
    );
    new.is_admin = true;
    new.verified = true;

    match db.create_user(&new) {
        Ok(user) => {
            info!(admin_id = %user.id, username = %user.username, "admin account created");
            Ok(())
        }
        Err(DbError::Conflict(field)) => Err(anyhow!(
            "cannot bootstrap admin {:?}: {field} belongs to a non-admin account",
            admin.username
        )),
        Err(e) => Err(e).context("creating admin account"),
    }
}
