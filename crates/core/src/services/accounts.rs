//! Customer sign-up, sign-in and profile

use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{normalize_email, optional, required};
use crate::credentials::{authenticate, hash_password, replacement_hash, validate_password};
use crate::error::{Error, Result};
use crate::models::{User, UserRole};
use crate::scope::TenantScope;
use crate::storage::{Database, UserRepository, UserStore};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A sign-up that passed validation, with its password already hashed
#[derive(Debug, Clone)]
pub struct NewCustomer {
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
}

impl RegisterRequest {
    /// Validate the request and hash its password. This is the slow part of
    /// a sign-up and touches no storage.
    pub fn prepare(&self) -> Result<NewCustomer> {
        let email = normalize_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(NewCustomer {
            email,
            first_name: required(&self.first_name, "First name")?,
            last_name: required(&self.last_name, "Last name")?,
            phone: optional(self.phone.clone()),
            password_hash: hash_password(&self.password)?,
        })
    }
}

pub struct AccountService<'a> {
    db: &'a Database,
}

impl<'a> AccountService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Self-registration always yields a CUSTOMER outside any tenant
    pub fn register_customer(&self, request: &RegisterRequest) -> Result<User> {
        self.create_customer(request.prepare()?)
    }

    #[instrument(skip(self, customer), fields(email = %customer.email))]
    pub fn create_customer(&self, customer: NewCustomer) -> Result<User> {
        self.db.transaction(|conn| {
            let users = UserStore::new(conn);
            if users.email_taken(&customer.email, None)? {
                return Err(Error::Conflict(format!(
                    "Email {} is already registered",
                    customer.email
                )));
            }
            let mut user = User::new(
                customer.email.clone(),
                customer.password_hash.clone(),
                customer.first_name.clone(),
                customer.last_name.clone(),
                UserRole::Customer,
            );
            user.phone = customer.phone.clone();
            users.create(&user)?;
            info!(user_id = %user.id, "Customer registered");
            Ok(user)
        })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        authenticate(self.db, &email.trim().to_lowercase(), password)
    }

    /// The account a login for `email` is checked against, if any
    pub fn login_candidate(&self, email: &str) -> Result<Option<User>> {
        self.db.find_user_by_email(&email.trim().to_lowercase())
    }

    pub fn record_login(&self, user: &User) -> Result<()> {
        self.db.record_login(user.id)?;
        info!(user_id = %user.id, "User logged in");
        Ok(())
    }

    /// Current state of an authenticated account; disabled accounts are refused
    pub fn me(&self, user_id: Uuid) -> Result<User> {
        self.db
            .find_user_by_id(TenantScope::System, user_id)?
            .filter(|user| user.is_active)
            .ok_or_else(|| Error::Authentication("Account is no longer available".into()))
    }

    pub fn change_password(&self, actor: &User, current: &str, new_password: &str) -> Result<()> {
        let user = self.me(actor.id)?;
        let password_hash = replacement_hash(&user, current, new_password)?;
        self.set_password_hash(actor, password_hash)
    }

    /// Store a hash produced by `credentials::replacement_hash`
    pub fn set_password_hash(&self, actor: &User, password_hash: String) -> Result<()> {
        let mut user = self.me(actor.id)?;
        user.password_hash = password_hash;
        self.db.users().update(&user)?;
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            email: " Yonas@Example.com".into(),
            password: "injera-2030".into(),
            first_name: "Yonas".into(),
            last_name: "Desta".into(),
            phone: Some("+251911000000".into()),
        }
    }

    #[test]
    fn test_register_and_login() {
        let db = Database::open_in_memory().unwrap();
        let accounts = AccountService::new(&db);

        let user = accounts.register_customer(&request()).unwrap();
        assert_eq!(user.email, "yonas@example.com");
        assert!(user.has_role(UserRole::Customer));
        assert_eq!(user.tenant_id, None);
        assert!(matches!(accounts.register_customer(&request()), Err(Error::Conflict(_))));

        let logged_in = accounts.login("YONAS@example.com", "injera-2030").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(matches!(
            accounts.login("yonas@example.com", "wrong-pass"),
            Err(Error::Authentication(_))
        ));

        accounts.change_password(&user, "injera-2030", "berbere-2031").unwrap();
        assert!(accounts.login("yonas@example.com", "injera-2030").is_err());
        accounts.login("yonas@example.com", "berbere-2031").unwrap();

        db.users().set_active(user.id, false).unwrap();
        assert!(matches!(accounts.me(user.id), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_login_in_steps() {
        let db = Database::open_in_memory().unwrap();
        let accounts = AccountService::new(&db);
        let prepared = request().prepare().unwrap();
        let user = accounts.create_customer(prepared).unwrap();

        let candidate = accounts.login_candidate(" YONAS@example.com").unwrap();
        let checked = crate::credentials::check_credentials(candidate, "injera-2030").unwrap();
        accounts.record_login(&checked).unwrap();
        assert!(accounts.me(user.id).unwrap().last_login.is_some());

        assert!(accounts.login_candidate("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_registration_validation() {
        let db = Database::open_in_memory().unwrap();
        let accounts = AccountService::new(&db);

        let short = RegisterRequest { password: "short".into(), ..request() };
        assert!(matches!(accounts.register_customer(&short), Err(Error::Validation(_))));
        let nameless = RegisterRequest { first_name: " ".into(), ..request() };
        assert!(matches!(accounts.register_customer(&nameless), Err(Error::Validation(_))));
        let bad_email = RegisterRequest { email: "yonas".into(), ..request() };
        assert!(matches!(accounts.register_customer(&bad_email), Err(Error::Validation(_))));
    }
}
