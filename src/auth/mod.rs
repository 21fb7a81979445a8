//! Mock credential directory and caller identity.
//!
//! Login only checks that the email is known; the password is accepted but
//! never verified. A successful login or registration hands out an opaque
//! bearer token which the RPC boundary resolves into a [`Caller`].

use std::fmt;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    consultation::model::not_blank,
    core::{ApiError, ApiResult},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    #[validate(custom(function = "not_blank"))]
    pub id: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl User {
    /// The two demo accounts the mobile app ships with.
    pub fn demo_accounts() -> Vec<User> {
        vec![
            User {
                id: "1".to_string(),
                email: "client@test.com".to_string(),
                name: "John Doe".to_string(),
                role: Role::Client,
                phone: Some("555-0123".to_string()),
            },
            User {
                id: "2".to_string(),
                email: "admin@test.com".to_string(),
                name: "Dr. Sarah Smith".to_string(),
                role: Role::Admin,
                phone: Some("555-0456".to_string()),
            },
        ]
    }
}

/// Identity attached to every consultation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn client(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Client,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("admin role required"))
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct UserDirectory {
    users: RwLock<Vec<User>>,
    // token -> user id
    sessions: DashMap<String, String>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
            sessions: DashMap::new(),
        }
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned()
    }

    pub fn find_by_id(&self, id: &str) -> Option<User> {
        self.users.read().iter().find(|u| u.id == id).cloned()
    }

    pub fn login(&self, input: LoginInput) -> ApiResult<Session> {
        let user = self
            .find_by_email(&input.email)
            .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;
        log::info!("User {} logged in as {}", user.id, user.role);
        Ok(self.open_session(user))
    }

    pub fn register(&self, input: RegisterInput) -> ApiResult<Session> {
        input.validate()?;

        let user = {
            let mut users = self.users.write();
            if users
                .iter()
                .any(|u| u.email.eq_ignore_ascii_case(input.email.trim()))
            {
                return Err(ApiError::validation("User already exists"));
            }
            let user = User {
                id: Uuid::new_v4().simple().to_string(),
                email: input.email.trim().to_string(),
                name: input.name,
                role: input.role,
                phone: input.phone.filter(|p| !p.trim().is_empty()),
            };
            users.push(user.clone());
            user
        };

        log::info!("Registered user {} as {}", user.id, user.role);
        Ok(self.open_session(user))
    }

    pub fn logout(&self, token: &str) {
        if let Some((_, user_id)) = self.sessions.remove(token) {
            log::info!("User {user_id} logged out");
        }
    }

    /// Resolves a bearer token into the caller it was issued to.
    pub fn authenticate(&self, token: &str) -> ApiResult<Caller> {
        let user_id = self
            .sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ApiError::Unauthorized("invalid or expired session".to_string()))?;
        let user = self
            .find_by_id(&user_id)
            .ok_or_else(|| ApiError::Unauthorized("unknown user".to_string()))?;
        Ok(Caller {
            id: user.id,
            role: user.role,
        })
    }

    fn open_session(&self, user: User) -> Session {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), user.id.clone());
        Session { token, user }
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new(User::demo_accounts())
    }
}
