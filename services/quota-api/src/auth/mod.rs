mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::{hash_password, verify_password};
pub use token::{Claims, IssuedToken, TokenIssuer};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::storage::{format_timestamp, QuotaDatabase, UserRecord};

pub const TOKEN_TYPE: &str = "bearer";

/// Checks credentials and stamps `last_login` on success.
pub fn authenticate(
    db: &QuotaDatabase,
    username: &str,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let user = db.find_user(username)?.ok_or_else(|| {
        warn!(username, "login attempt for unknown user");
        AuthError::UnknownUser
    })?;

    if !verify_password(password, &user.hashed_password)? {
        warn!(username, "login attempt with wrong password");
        return Err(AuthError::WrongPassword);
    }

    let now = Utc::now();
    db.touch_last_login(&user.username, now)?;
    let last_login = format_timestamp(now);
    info!(username = %user.username, at = %last_login, "user authenticated");

    Ok(UserRecord {
        last_login: Some(last_login),
        ..user
    })
}

/// Maps a bearer token to the active user it was issued for.
pub fn resolve_user(
    db: &QuotaDatabase,
    issuer: &TokenIssuer,
    token: &str,
) -> Result<UserRecord, AuthError> {
    let claims = issuer.validate(token)?;
    let user = db
        .find_user(&claims.sub)?
        .ok_or(AuthError::UnknownSubject)?;

    if user.disabled {
        debug!(username = %user.username, "rejected token for disabled user");
        return Err(AuthError::InactiveUser);
    }

    Ok(user)
}
