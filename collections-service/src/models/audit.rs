use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    Logout,
    PasswordReset,
    CreateCollection,
    CreateCustomer,
    UpdateCustomer,
    DeleteCustomer,
    ImportCustomers,
    CreateRoute,
    CreateUser,
    UpdateUser,
    DeleteUser,
    UpdateSettings,
    Reconcile,
    DeleteLedgerEntries,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::PasswordReset => "PASSWORD_RESET",
            Self::CreateCollection => "CREATE_COLLECTION",
            Self::CreateCustomer => "CREATE_CUSTOMER",
            Self::UpdateCustomer => "UPDATE_CUSTOMER",
            Self::DeleteCustomer => "DELETE_CUSTOMER",
            Self::ImportCustomers => "IMPORT_CUSTOMERS",
            Self::CreateRoute => "CREATE_ROUTE",
            Self::CreateUser => "CREATE_USER",
            Self::UpdateUser => "UPDATE_USER",
            Self::DeleteUser => "DELETE_USER",
            Self::UpdateSettings => "UPDATE_SETTINGS",
            Self::Reconcile => "RECONCILE",
            Self::DeleteLedgerEntries => "DELETE_LEDGER_ENTRIES",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLog {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// uid of the acting user.
    pub performed_by: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub details: String,
}

impl AuditLog {
    pub fn new(action: AuditAction, actor: &User, details: impl Into<String>) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            performed_by: actor.uid.clone(),
            user_name: Some(actor.name.clone()),
            details: details.into(),
        }
    }
}
