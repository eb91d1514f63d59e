use serde::Serialize;

use crate::models::{AuditAction, AuditLog, User};
use crate::services::DataStore;

/// Append an audit entry. Audit writes never fail the calling operation;
/// a failure is logged and returned as a warning for the response.
#[must_use = "an unrecorded audit entry should be reported to the caller"]
pub async fn append_audit(
    store: &dyn DataStore,
    action: AuditAction,
    actor: &User,
    details: impl Into<String>,
) -> Option<String> {
    let log = AuditLog::new(action, actor, details);
    match store.insert_audit_log(&log).await {
        Ok(()) => {
            tracing::debug!(action = %action, performed_by = %actor.uid, "Audit entry appended");
            None
        }
        Err(e) => {
            tracing::error!(action = %action, performed_by = %actor.uid, "Failed to append audit entry: {}", e);
            Some(format!("audit entry {} not recorded: {}", action, e))
        }
    }
}

/// A write result together with the warnings raised by its audit entry.
/// Serializes as the value's own fields plus `warnings` when there are any.
#[derive(Debug, Clone, Serialize)]
pub struct Audited<T> {
    #[serde(flatten)]
    pub value: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> Audited<T> {
    pub fn new(value: T, warning: Option<String>) -> Self {
        Self {
            value,
            warnings: warning.into_iter().collect(),
        }
    }
}
