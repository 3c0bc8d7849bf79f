use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username")]
    UnknownUser,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token subject does not exist")]
    UnknownSubject,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken(err.to_string())
    }
}
