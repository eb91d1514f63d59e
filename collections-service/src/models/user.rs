use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Accounts,
    #[default]
    Collector,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "ADMIN",
            Self::Accounts => "ACCOUNTS",
            Self::Collector => "COLLECTOR",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// Page ids (`DASHBOARD`, `CUSTOMERS`, ...). Overrides the role default
    /// for non-admins when present and non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Profile used when the identity provider knows a user that has no
    /// user document yet.
    pub fn fallback_for(uid: impl Into<String>, email: &str) -> Self {
        let name = email.split('@').next().filter(|s| !s.is_empty()).unwrap_or("User");
        Self {
            uid: uid.into(),
            name: name.to_string(),
            email: email.to_string(),
            role: UserRole::Collector,
            permissions: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    pub permissions: Option<Vec<String>>,
}
