//! One-way password hashing behind a single seam so the scheme can be
//! swapped without touching the stores.

use crate::error::AppError;

pub fn hash(plaintext: &str) -> Result<String, AppError> {
    Ok(bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)?)
}

pub fn verify(plaintext: &str, digest: &str) -> bool {
    bcrypt::verify(plaintext, digest).unwrap_or(false)
}
