//! Password hashing and login checks

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::User;
use crate::storage::UserRepository;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const TEMPORARY_PASSWORD_LENGTH: usize = 12;

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Argon2 PHC string for `password`
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Authentication(format!("Failed to hash password: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|_| Error::Authentication("Invalid stored password".into()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// One-time password handed out when an account is created for someone
pub fn temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(TEMPORARY_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Check `password` against the account found for a login attempt. Needs
/// no storage, so callers can run it without holding the database.
///
/// Unknown emails, wrong passwords and disabled accounts all fail with the
/// same message.
pub fn check_credentials(candidate: Option<User>, password: &str) -> Result<User> {
    let rejected = || Error::Authentication("Invalid email or password".into());

    let user = candidate.ok_or_else(rejected)?;
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "Wrong password");
        return Err(rejected());
    }
    if !user.is_active {
        warn!(user_id = %user.id, "Login to disabled account");
        return Err(rejected());
    }
    Ok(user)
}

/// Hash for `new_password` once `current` matches the user's password
pub fn replacement_hash(user: &User, current: &str, new_password: &str) -> Result<String> {
    validate_password(new_password)?;
    if !verify_password(current, &user.password_hash)? {
        return Err(Error::Authentication("Current password is incorrect".into()));
    }
    hash_password(new_password)
}

/// Check an email/password pair and record the login
#[instrument(skip(store, password))]
pub fn authenticate<S: UserRepository>(store: &S, email: &str, password: &str) -> Result<User> {
    let user = check_credentials(store.find_user_by_email(email)?, password)?;
    store.record_login(user.id)?;
    info!(user_id = %user.id, "User logged in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::storage::Database;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert_eq!(temporary_password().len(), TEMPORARY_PASSWORD_LENGTH);
    }

    #[test]
    fn test_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let user = User::new(
            "guest@example.com".into(),
            hash_password("s3cret-pass").unwrap(),
            "Hana".into(),
            "Girma".into(),
            UserRole::Customer,
        );
        db.users().create(&user).unwrap();

        let logged_in = authenticate(&db, "Guest@Example.com", "s3cret-pass").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(
            db.users().find_by_email("guest@example.com").unwrap().unwrap().last_login.is_some()
        );

        assert!(matches!(
            authenticate(&db, "guest@example.com", "nope"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            authenticate(&db, "nobody@example.com", "s3cret-pass"),
            Err(Error::Authentication(_))
        ));

        db.users().set_active(user.id, false).unwrap();
        assert!(authenticate(&db, "guest@example.com", "s3cret-pass").is_err());
    }

    #[test]
    fn test_replacement_hash_needs_current_password() {
        let user = User::new(
            "guest@example.com".into(),
            hash_password("s3cret-pass").unwrap(),
            "Hana".into(),
            "Girma".into(),
            UserRole::Customer,
        );
        let hash = replacement_hash(&user, "s3cret-pass", "n3w-secret-pass").unwrap();
        assert!(verify_password("n3w-secret-pass", &hash).unwrap());

        assert!(matches!(
            replacement_hash(&user, "wrong-pass", "n3w-secret-pass"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            replacement_hash(&user, "s3cret-pass", "short"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(check_credentials(None, "s3cret-pass"), Err(Error::Authentication(_))));
    }
}
