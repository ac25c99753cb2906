use std::fmt;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use sea_orm::{
    ColIdx, QueryResult, TryGetError, TryGetable, Value,
    sea_query::{ArrayType, ColumnType, Nullable, ValueType, ValueTypeErr},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] argon2::password_hash::Error),
    #[error("password must not be empty")]
    Empty,
}

/// Salted one-way hash stored in place of a password.
///
/// Writing always hashes; reading hands back the stored PHC string untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn new(plain: &str) -> Result<Self, PasswordError> {
        if plain.is_empty() {
            return Err(PasswordError::Empty);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
        Ok(Self(hash.to_string()))
    }

    /// Wraps a hash produced elsewhere, rejecting anything that is not a PHC string.
    pub fn from_stored(hash: impl Into<String>) -> Result<Self, PasswordError> {
        let hash = hash.into();
        PasswordHash::new(&hash)?;
        Ok(Self(hash))
    }

    pub fn verify(&self, plain: &str) -> bool {
        let parsed = match PasswordHash::new(&self.0) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is unreadable");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

impl From<HashedPassword> for Value {
    fn from(hash: HashedPassword) -> Self {
        Value::String(Some(Box::new(hash.0)))
    }
}

impl TryGetable for HashedPassword {
    fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
        <String as TryGetable>::try_get_by(res, index).map(Self)
    }
}

impl ValueType for HashedPassword {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        <String as ValueType>::try_from(v).map(Self)
    }

    fn type_name() -> String {
        "HashedPassword".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::String(None)
    }
}

impl Nullable for HashedPassword {
    fn null() -> Value {
        Value::String(None)
    }
}
