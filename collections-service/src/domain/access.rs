//! Role and permission based page gating.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{User, UserRole};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Page {
    Dashboard,
    Collections,
    Customers,
    Cheques,
    Reconciliation,
    Ledger,
    Reports,
    Users,
    Audit,
    Settings,
}

impl Page {
    pub const ALL: [Page; 10] = [
        Self::Dashboard,
        Self::Collections,
        Self::Customers,
        Self::Cheques,
        Self::Reconciliation,
        Self::Ledger,
        Self::Reports,
        Self::Users,
        Self::Audit,
        Self::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "DASHBOARD",
            Self::Collections => "COLLECTIONS",
            Self::Customers => "CUSTOMERS",
            Self::Cheques => "CHEQUES",
            Self::Reconciliation => "RECONCILIATION",
            Self::Ledger => "LEDGER",
            Self::Reports => "REPORTS",
            Self::Users => "USERS",
            Self::Audit => "AUDIT",
            Self::Settings => "SETTINGS",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown page: {0}")]
pub struct UnknownPage(pub String);

impl FromStr for Page {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPage(s.to_string()))
    }
}

pub fn role_default_pages(role: UserRole) -> Vec<Page> {
    match role {
        UserRole::Admin => Page::ALL.to_vec(),
        UserRole::Accounts => vec![Page::Cheques, Page::Reconciliation, Page::Ledger, Page::Reports],
        UserRole::Collector => vec![Page::Dashboard, Page::Collections, Page::Customers],
    }
}

/// Pages `user` may open, in navigation order.
///
/// Admins always get every page. For other roles a non-empty permission
/// list replaces the role default; ids that name no page are ignored.
pub fn allowed_pages(user: &User) -> Vec<Page> {
    if user.is_admin() {
        return Page::ALL.to_vec();
    }
    match user.permissions.as_deref() {
        Some(list) if !list.is_empty() => {
            let granted: Vec<Page> = list.iter().filter_map(|id| id.parse().ok()).collect();
            Page::ALL.into_iter().filter(|p| granted.contains(p)).collect()
        }
        _ => role_default_pages(user.role),
    }
}

pub fn can_access(user: &User, page: Page) -> bool {
    user.is_admin() || allowed_pages(user).contains(&page)
}

#[derive(Debug, Error, PartialEq)]
#[error("user {uid} may not access {page}")]
pub struct AccessDenied {
    pub uid: String,
    pub page: Page,
}

pub fn require(user: &User, page: Page) -> Result<(), AccessDenied> {
    if can_access(user, page) {
        Ok(())
    } else {
        Err(AccessDenied {
            uid: user.uid.clone(),
            page,
        })
    }
}
