//! User accounts and the session-based login guard.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::session::Session;

pub type UserId = u64;

/// Session key holding the logged-in user's id.
pub const AUTH_USER_KEY: &str = "_auth_user_id";

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub is_active: bool,
    #[serde(skip)]
    salt: String,
    #[serde(skip)]
    password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error("A user with that username already exists.")]
    UsernameTaken,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl User {
    fn check_password(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }
}

#[derive(Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<Vec<User>>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, new: NewUser) -> std::result::Result<User, RegisterError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.iter().any(|u| u.username == new.username) {
            return Err(RegisterError::UsernameTaken);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let user = User {
            id: users.len() as UserId + 1,
            password_hash: hash_password(&salt, &new.password),
            salt,
            username: new.username,
            email: new.email,
            website: new.website,
            is_active: true,
        };
        users.push(user.clone());
        Ok(user)
    }

    pub fn username_taken(&self, username: &str) -> bool {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|u| u.username == username)
    }

    /// Returns the user if the credentials match, whether or not the
    /// account is active.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|u| u.username == username && u.check_password(password))
            .cloned()
    }

    /// Returns false if no such user exists.
    pub fn set_active(&self, id: UserId, active: bool) -> bool {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }
}

pub fn login(session: &mut Session, user: &User) {
    session.set(AUTH_USER_KEY, user.id);
}

pub fn current_user(session: &Session) -> Option<UserId> {
    session.get_u64(AUTH_USER_KEY)
}

/// Route guard for pages that need a logged-in user.
pub fn require_login(session: &Session) -> Result<UserId> {
    current_user(session).ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: None,
            password: password.to_string(),
            website: None,
        }
    }

    #[test]
    fn registers_and_authenticates() {
        let users = UserStore::new();
        let user = users.register(new_user("leif", "hunter2")).unwrap();
        assert!(user.is_active);
        assert_ne!(user.password_hash, "hunter2");

        assert_eq!(users.authenticate("leif", "hunter2").map(|u| u.id), Some(user.id));
        assert!(users.authenticate("leif", "wrong").is_none());
        assert!(users.authenticate("nobody", "hunter2").is_none());
    }

    #[test]
    fn same_password_gets_different_hashes() {
        let users = UserStore::new();
        let a = users.register(new_user("a", "pw")).unwrap();
        let b = users.register(new_user("b", "pw")).unwrap();
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn usernames_are_unique() {
        let users = UserStore::new();
        users.register(new_user("leif", "pw")).unwrap();
        assert_eq!(
            users.register(new_user("leif", "other")).unwrap_err(),
            RegisterError::UsernameTaken
        );
        assert!(users.username_taken("leif"));
    }

    #[test]
    fn inactive_users_still_authenticate() {
        let users = UserStore::new();
        let user = users.register(new_user("leif", "pw")).unwrap();
        assert!(users.set_active(user.id, false));
        assert!(!users.set_active(42, false));

        let found = users.authenticate("leif", "pw").unwrap();
        assert!(!found.is_active);
    }

    #[test]
    fn guard_follows_session() {
        let users = UserStore::new();
        let user = users.register(new_user("leif", "pw")).unwrap();
        let mut session = Session::default();
        assert!(matches!(require_login(&session), Err(AppError::Unauthorized)));

        login(&mut session, &user);
        assert_eq!(require_login(&session).unwrap(), user.id);
        assert_eq!(users.get(user.id).map(|u| u.username), Some("leif".to_string()));
    }
}
