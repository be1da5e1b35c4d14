//! Dashboard accounts and credential checks.
//!
//! The directory is an in-memory, insertion-ordered list of users. Usernames
//! are unique ignoring case. Passwords are stored as argon2 PHC strings and
//! never serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printshop_core::{DomainError, UserId};

use crate::Role;
use crate::password::{Argon2Params, hash_password, verify_password};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<AuthError> for DomainError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingCredentials => DomainError::validation(value.to_string()),
            AuthError::InvalidCredentials => DomainError::Unauthorized,
            AuthError::DuplicateUsername(name) => {
                DomainError::conflict(format!("username already exists: {name}"))
            }
            AuthError::UserNotFound(id) => DomainError::not_found(format!("user {id}")),
            AuthError::UnknownRole(_) | AuthError::Validation(_) => {
                DomainError::validation(value.to_string())
            }
            AuthError::PasswordHash(msg) => DomainError::invariant(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub password_hash: Option<String>,
}

/// Request to add an account. Accounts without a password cannot log in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub password: Option<String>,
}

/// Hash the password of an account about to be added.
///
/// CPU-heavy; callers on an async runtime should run it on a blocking thread.
pub fn hash_new_password(new_user: &NewUser, params: Argon2Params) -> Result<Option<String>, AuthError> {
    match new_user.password.as_deref() {
        Some("") => Err(AuthError::Validation("password cannot be empty".to_string())),
        Some(p) => hash_password(p, params).map(Some),
        None => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct UserDirectory {
    users: Vec<User>,
    params: Argon2Params,
}

impl UserDirectory {
    pub fn new(params: Argon2Params) -> Self {
        Self {
            users: Vec::new(),
            params,
        }
    }

    /// Directory seeded with `admin/admin`, `operator/operator` and `viewer/viewer`.
    pub fn with_demo_accounts(params: Argon2Params, now: DateTime<Utc>) -> Result<Self, AuthError> {
        let mut directory = Self::new(params);
        for role in Role::ALL {
            directory.add(
                NewUser {
                    username: role.as_str().to_string(),
                    role,
                    password: Some(role.as_str().to_string()),
                },
                now,
            )?;
        }
        Ok(directory)
    }

    pub fn params(&self) -> Argon2Params {
        self.params
    }

    pub fn add(&mut self, new_user: NewUser, now: DateTime<Utc>) -> Result<&User, AuthError> {
        self.check_new_user(&new_user)?;
        let password_hash = hash_new_password(&new_user, self.params)?;
        self.insert_hashed(new_user, password_hash, now)
    }

    /// Reject an empty or taken username before any hashing is done.
    pub fn check_new_user(&self, new_user: &NewUser) -> Result<(), AuthError> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("username cannot be empty".to_string()));
        }
        if self.find_by_username(username).is_some() {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }
        Ok(())
    }

    /// Insert an account whose password was hashed with [`hash_new_password`].
    ///
    /// Re-checks the username, since the directory may have changed while
    /// the hash was computed.
    pub fn insert_hashed(
        &mut self,
        new_user: NewUser,
        password_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&User, AuthError> {
        self.check_new_user(&new_user)?;

        self.users.push(User {
            id: UserId::new(),
            username: new_user.username.trim().to_string(),
            role: new_user.role,
            last_login: None,
            created_at: now,
            password_hash,
        });

        let idx = self.users.len() - 1;
        Ok(&self.users[idx])
    }

    pub fn remove(&mut self, id: UserId) -> Result<User, AuthError> {
        let idx = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(AuthError::UserNotFound(id))?;
        Ok(self.users.remove(idx))
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        let wanted = username.trim();
        self.users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(wanted))
    }

    pub fn list(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check credentials and stamp `last_login` on success.
    pub fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let (id, hash) = self.login_candidate(username, password)?;
        if !verify_password(password, &hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        self.record_login(id, now)
    }

    /// The account and stored PHC hash a login attempt must be verified
    /// against. Unknown users and accounts without a password are
    /// `InvalidCredentials`.
    pub fn login_candidate(&self, username: &str, password: &str) -> Result<(UserId, String), AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = self
            .find_by_username(username)
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .clone()
            .ok_or(AuthError::InvalidCredentials)?;
        Ok((user.id, hash))
    }

    pub fn record_login(&mut self, id: UserId, now: DateTime<Utc>) -> Result<User, AuthError> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AuthError::UserNotFound(id))?;
        user.last_login = Some(now);
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> UserDirectory {
        UserDirectory::with_demo_accounts(Argon2Params::fast(), Utc::now()).unwrap()
    }

    #[test]
    fn demo_accounts_log_in() {
        let mut dir = demo();
        assert_eq!(dir.len(), 3);

        for role in Role::ALL {
            let user = dir
                .authenticate(role.as_str(), role.as_str(), Utc::now())
                .unwrap();
            assert_eq!(user.role, role);
            assert!(user.last_login.is_some());
        }
    }

    #[test]
    fn wrong_password_is_rejected() {
        let mut dir = demo();
        assert_eq!(
            dir.authenticate("admin", "nope", Utc::now()),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            dir.authenticate("ghost", "admin", Utc::now()),
            Err(AuthError::InvalidCredentials)
        );
        assert!(dir.find_by_username("admin").unwrap().last_login.is_none());
    }

    #[test]
    fn blank_credentials() {
        let mut dir = demo();
        assert_eq!(
            dir.authenticate("  ", "admin", Utc::now()),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            dir.authenticate("admin", "", Utc::now()),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn usernames_are_unique_ignoring_case() {
        let mut dir = demo();
        let err = dir
            .add(
                NewUser {
                    username: "Admin".to_string(),
                    role: Role::Viewer,
                    password: None,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateUsername("Admin".to_string()));
    }

    #[test]
    fn account_without_password_cannot_log_in() {
        let mut dir = UserDirectory::new(Argon2Params::fast());
        dir.add(
            NewUser {
                username: "kiosk".to_string(),
                role: Role::Viewer,
                password: None,
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            dir.authenticate("kiosk", "anything", Utc::now()),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn insert_hashed_rechecks_the_username() {
        let mut dir = demo();
        let new_user = NewUser {
            username: "clerk".to_string(),
            role: Role::Operator,
            password: Some("pw".to_string()),
        };
        dir.check_new_user(&new_user).unwrap();
        let hash = hash_new_password(&new_user, dir.params()).unwrap();

        dir.insert_hashed(new_user.clone(), hash.clone(), Utc::now()).unwrap();
        assert_eq!(
            dir.insert_hashed(new_user, hash, Utc::now()),
            Err(AuthError::DuplicateUsername("clerk".to_string()))
        );
        assert!(dir.authenticate("clerk", "pw", Utc::now()).is_ok());
    }

    #[test]
    fn login_candidate_returns_the_stored_hash() {
        let dir = demo();
        let (id, hash) = dir.login_candidate("OPERATOR", "operator").unwrap();
        assert_eq!(dir.get(id).unwrap().username, "operator");
        assert!(hash.starts_with("$argon2id$"));
        assert_eq!(dir.login_candidate("operator", ""), Err(AuthError::MissingCredentials));
    }

    #[test]
    fn remove_user() {
        let mut dir = demo();
        let id = dir.find_by_username("viewer").unwrap().id;

        let removed = dir.remove(id).unwrap();
        assert_eq!(removed.username, "viewer");
        assert!(dir.get(id).is_none());
        assert_eq!(dir.remove(id), Err(AuthError::UserNotFound(id)));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let dir = demo();
        let json = serde_json::to_value(&dir.list()[0]).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }
}
