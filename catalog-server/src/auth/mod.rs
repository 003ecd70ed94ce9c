use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::database::Database;
use crate::errors::WebError;
use crate::models::User;

pub mod route;
pub mod session;

pub type AuthResult<X> = Result<X, AuthError>;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hashing(argon2::password_hash::Error),
    #[error("Username {0:?} is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<AuthError> for WebError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UsernameTaken(name) => {
                WebError::BadRequest(format!("Username {name:?} is already taken"))
            }
            AuthError::Hashing(e) => WebError::Internal(anyhow::anyhow!("{e}")),
            AuthError::Database(e) => WebError::Internal(e),
        }
    }
}

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>()).map_err(AuthError::Hashing)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AuthError::Hashing)?;
    Ok(hash.to_string())
}

/// Verifies if a provided password matches a stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Look up a user by name and check their password.
pub fn authenticate(db: &Database, username: &str, password: &str) -> AuthResult<Option<User>> {
    Ok(User::get_by_username(db, username)?
        .filter(|user| verify_password(password, &user.password_hash)))
}

pub fn create_user(db: &Database, username: &str, password: &str, is_staff: bool) -> AuthResult<User> {
    if User::get_by_username(db, username)?.is_some() {
        return Err(AuthError::UsernameTaken(username.into()));
    }
    let hash = hash_password(password)?;
    let user_id = User::push(db, username, &hash, is_staff)?;
    User::get_by_id(db, user_id)?
        .ok_or_else(|| AuthError::Database(anyhow::anyhow!("User {user_id} vanished after insert")))
}

pub fn set_password(db: &Database, user: &User, password: &str) -> AuthResult<()> {
    let hash = hash_password(password)?;
    User::set_password_hash(db, user.user_id, &hash)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_their_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        assert!(!verify_password("correct horse", "not a hash"));
        assert_ne!(hash, hash_password("correct horse").unwrap());
    }

    #[tokio::test]
    async fn authenticate_checks_name_and_password() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("catalog.db")).await.unwrap();
        let ada = create_user(&db, "ada", "analytical", false).unwrap();
        assert!(matches!(
            create_user(&db, "ada", "again", false),
            Err(AuthError::UsernameTaken(_))
        ));

        let found = authenticate(&db, "ada", "analytical").unwrap().unwrap();
        assert_eq!(found.user_id, ada.user_id);
        assert!(authenticate(&db, "ada", "wrong").unwrap().is_none());
        assert!(authenticate(&db, "nobody", "analytical").unwrap().is_none());

        set_password(&db, &ada, "engine").unwrap();
        assert!(authenticate(&db, "ada", "analytical").unwrap().is_none());
        assert!(authenticate(&db, "ada", "engine").unwrap().is_some());
    }
}
