//! Credential store: registration and password login.

use doc_store::{DocumentStore, StoreError};
use thiserror::Error;

use crate::error::DomainError;
use crate::password::PasswordHasher;
use crate::repository::{Repository, Stored};
use crate::user::{Role, User};
use common::UserId;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AccountError {
    /// A required registration field was missing or blank.
    #[error("name, email and password are required")]
    MissingRegistrationFields,

    /// A required login field was missing or blank.
    #[error("Email and password are required")]
    MissingLoginFields,

    /// The requested role is not one of the known roles.
    #[error("role must be either buyer or seller, got {0:?}")]
    InvalidRole(String),

    /// Another account already uses this email.
    #[error("Email already registered")]
    EmailTaken,

    /// No account matches the login email.
    #[error("User not found")]
    UserNotFound,

    /// The password does not match the stored hash.
    #[error("Invalid password")]
    InvalidPassword,

    /// Password hashing or hash parsing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

/// Input for [`AccountService::register`].
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Service owning the user collection.
pub struct AccountService<S: DocumentStore> {
    users: Repository<S, User>,
    hasher: PasswordHasher,
}

impl<S: DocumentStore> AccountService<S> {
    /// Creates a new account service with default Argon2 parameters.
    pub fn new(store: S) -> Self {
        Self::with_hasher(store, PasswordHasher::default())
    }

    /// Creates a new account service with a specific password hasher.
    pub fn with_hasher(store: S, hasher: PasswordHasher) -> Self {
        Self {
            users: Repository::new(store),
            hasher,
        }
    }

    /// Registers a new account. The role defaults to buyer.
    #[tracing::instrument(skip(self, registration), fields(email = ?registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<User, DomainError> {
        let (Some(name), Some(email), Some(password)) = (
            non_blank(registration.name),
            non_blank(registration.email),
            registration.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::MissingRegistrationFields.into());
        };

        let role = match non_blank(registration.role) {
            None => Role::default(),
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|_| AccountError::InvalidRole(raw))?,
        };

        if self.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken.into());
        }

        let user = User {
            id: UserId::new(),
            name,
            email,
            password: self.hasher.hash_blocking(password).await?,
            role,
        };

        // The unique index settles races between concurrent registrations.
        let stored = self.users.insert(user).await.map_err(|e| match e {
            DomainError::Store(StoreError::DuplicateKey { .. }) => AccountError::EmailTaken.into(),
            other => other,
        })?;

        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %stored.entity.id, role = %stored.entity.role, "user registered");
        Ok(stored.entity)
    }

    /// Checks an email/password pair and returns the matching account.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<User, DomainError> {
        let (Some(email), Some(password)) =
            (non_blank(email), password.filter(|p| !p.is_empty()))
        else {
            return Err(AccountError::MissingLoginFields.into());
        };

        let Some(stored) = self.find_by_email(&email).await? else {
            metrics::counter!("logins_total", "outcome" => "unknown_user").increment(1);
            return Err(AccountError::UserNotFound.into());
        };
        let user = stored.entity;

        if !self
            .hasher
            .verify_blocking(password, user.password.clone())
            .await?
        {
            metrics::counter!("logins_total", "outcome" => "bad_password").increment(1);
            return Err(AccountError::InvalidPassword.into());
        }

        metrics::counter!("logins_total", "outcome" => "success").increment(1);
        Ok(user)
    }

    /// Looks up an account by its exact (trimmed) email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Stored<User>>, DomainError> {
        self.users
            .find_one(self.users.query().filter("email", email.trim()))
            .await
    }

    /// Loads an account by id.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.users.get(id).await?.map(|s| s.entity))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
