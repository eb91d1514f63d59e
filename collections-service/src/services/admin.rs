//! Master data and administration: customers, routes, users, settings,
//! ledger maintenance and the audit trail.

use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::audit::{append_audit, Audited};
use super::identity::IdentityProvider;
use super::metrics::IMPORTS_TOTAL;
use crate::domain::access::Page;
use crate::domain::import::{parse_customers, ImportDefaults};
use crate::domain::ledger::{verify_ledger, LedgerViolation};
use crate::domain::reports::{audit_newest_first, ledger_newest_first};
use crate::models::{
    AuditAction, AuditLog, Customer, CustomerInput, GlobalSettings, LedgerEntry, Route, RouteInput,
    RouteStatus, User, UserInput,
};
use crate::services::DataStore;

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped_rows: Vec<usize>,
    pub customer_ids: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCreated {
    pub user: User,
    pub setup_email_sent: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerDeletion {
    pub deleted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerReport {
    pub entries_checked: usize,
    pub collections_checked: usize,
    pub violations: Vec<LedgerViolation>,
}

fn check_permissions(permissions: Option<&[String]>) -> Result<(), AppError> {
    for id in permissions.unwrap_or_default() {
        id.parse::<Page>()
            .map_err(|e| AppError::bad_request(e.to_string()))?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn DataStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl AdminService {
    pub fn new(store: Arc<dyn DataStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub async fn settings(&self) -> Result<GlobalSettings, AppError> {
        Ok(self.store.get_settings().await?.unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: GlobalSettings, actor: &User) -> Result<Audited<GlobalSettings>, AppError> {
        if settings.default_credit_limit.is_sign_negative() {
            return Err(AppError::bad_request("default credit limit cannot be negative"));
        }
        self.store.save_settings(&settings).await?;
        tracing::info!(
            camera = settings.enable_cheque_camera,
            currency = %settings.currency_code,
            "Settings saved"
        );
        let warning =
            append_audit(self.store.as_ref(), AuditAction::UpdateSettings, actor, "System settings updated").await;
        Ok(Audited::new(settings, warning))
    }

    // Customers

    /// Customers that have not been soft-deleted.
    pub async fn customers(&self) -> Result<Vec<Customer>, AppError> {
        let mut customers: Vec<Customer> = self
            .store
            .list_customers()
            .await?
            .into_iter()
            .filter(|c| !c.deleted)
            .collect();
        customers.sort_by(|a, b| a.business_name.to_lowercase().cmp(&b.business_name.to_lowercase()));
        Ok(customers)
    }

    async fn live_customer(&self, customer_id: &str) -> Result<Customer, AppError> {
        self.store
            .get_customer(customer_id)
            .await?
            .filter(|c| !c.deleted)
            .ok_or_else(|| AppError::not_found(format!("customer {} not found", customer_id)))
    }

    pub async fn create_customer(&self, input: CustomerInput, actor: &User) -> Result<Audited<Customer>, AppError> {
        input.validate()?;
        let settings = self.settings().await?;
        let customer = input.into_customer(
            format!("C-{}", Uuid::new_v4().simple()),
            settings.default_credit_limit,
            settings.default_credit_period,
            Some(actor.uid.clone()),
        );
        self.store.insert_customer(&customer).await?;
        tracing::info!(customer_id = %customer.customer_id, route_id = %customer.route_id, "Customer created");
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::CreateCustomer,
            actor,
            format!("Created customer {}", customer.business_name),
        )
        .await;
        Ok(Audited::new(customer, warning))
    }

    pub async fn update_customer(
        &self,
        customer_id: &str,
        input: CustomerInput,
        actor: &User,
    ) -> Result<Audited<Customer>, AppError> {
        input.validate()?;
        let existing = self.live_customer(customer_id).await?;
        let customer = input.into_customer(
            existing.customer_id,
            existing.credit_limit,
            existing.credit_period_days,
            existing.created_by,
        );
        self.store.update_customer(&customer).await?;
        tracing::info!(customer_id = %customer.customer_id, "Customer updated");
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::UpdateCustomer,
            actor,
            format!("Updated customer {}", customer.business_name),
        )
        .await;
        Ok(Audited::new(customer, warning))
    }

    /// Soft delete: the record stays so historical collections still join.
    pub async fn delete_customer(&self, customer_id: &str, actor: &User) -> Result<Audited<()>, AppError> {
        let mut customer = self.live_customer(customer_id).await?;
        customer.deleted = true;
        self.store.update_customer(&customer).await?;
        tracing::info!(customer_id, "Customer deleted");
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::DeleteCustomer,
            actor,
            format!("Deleted customer {}", customer.business_name),
        )
        .await;
        Ok(Audited::new((), warning))
    }

    pub async fn import_customers(&self, text: &str, actor: &User) -> Result<ImportSummary, AppError> {
        let settings = self.settings().await?;
        let routes = self.store.list_routes().await?;
        let defaults = ImportDefaults {
            credit_limit: settings.default_credit_limit,
            credit_period_days: settings.default_credit_period,
        };
        let batch = Utc::now().timestamp_millis().to_string();

        let outcome = match parse_customers(text, &routes, defaults, &batch, Some(&actor.uid)) {
            Ok(outcome) => outcome,
            Err(e) => {
                IMPORTS_TOTAL.with_label_values(&["rejected"]).inc();
                tracing::warn!("Customer import rejected: {}", e);
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.insert_customers(&outcome.customers).await {
            IMPORTS_TOTAL.with_label_values(&["error"]).inc();
            tracing::error!(rows = outcome.customers.len(), "Customer import write failed: {}", e);
            return Err(e);
        }
        IMPORTS_TOTAL.with_label_values(&["ok"]).inc();

        let imported = outcome.customers.len();
        tracing::info!(imported, skipped = outcome.skipped_rows.len(), "Customers imported");
        let warnings: Vec<String> = append_audit(
            self.store.as_ref(),
            AuditAction::ImportCustomers,
            actor,
            format!("Imported {} customers", imported),
        )
        .await
        .into_iter()
        .collect();

        Ok(ImportSummary {
            imported,
            skipped_rows: outcome.skipped_rows,
            customer_ids: outcome.customers.into_iter().map(|c| c.customer_id).collect(),
            warnings,
        })
    }

    // Routes

    pub async fn routes(&self) -> Result<Vec<Route>, AppError> {
        let mut routes = self.store.list_routes().await?;
        routes.sort_by(|a, b| a.route_name.cmp(&b.route_name));
        Ok(routes)
    }

    pub async fn create_route(&self, input: RouteInput, actor: &User) -> Result<Audited<Route>, AppError> {
        input.validate()?;
        let route = Route {
            route_id: format!("R-{}", Uuid::new_v4().simple()),
            route_name: input.route_name.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            status: RouteStatus::Active,
        };
        self.store.insert_route(&route).await?;
        tracing::info!(route_id = %route.route_id, "Route created");
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::CreateRoute,
            actor,
            format!("Created route {}", route.route_name),
        )
        .await;
        Ok(Audited::new(route, warning))
    }

    // Users

    pub async fn users(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.store.list_users().await?;
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    /// Provision an identity account, store the profile and send the
    /// password setup email. A failed email does not undo the account.
    pub async fn create_user(&self, input: UserInput, actor: &User) -> Result<UserCreated, AppError> {
        input.validate()?;
        check_permissions(input.permissions.as_deref())?;

        let email = input.email.trim().to_lowercase();
        let uid = self.identity.create_account(&email).await?;
        let user = User {
            uid,
            name: input.name.trim().to_string(),
            email: email.clone(),
            role: input.role,
            permissions: input.permissions,
        };
        self.store.save_user(&user).await?;

        let mut warnings = Vec::new();
        let setup_email_sent = match self.identity.send_password_reset(&email).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(uid = %user.uid, "Setup email failed: {}", e);
                warnings.push(format!("setup email not sent: {}", e));
                false
            }
        };
        tracing::info!(uid = %user.uid, role = %user.role, setup_email_sent, "User created");

        let details = format!(
            "Created user {}. Setup email {}.",
            user.name,
            if setup_email_sent { "sent" } else { "failed" }
        );
        warnings.extend(append_audit(self.store.as_ref(), AuditAction::CreateUser, actor, details).await);

        Ok(UserCreated {
            user,
            setup_email_sent,
            warnings,
        })
    }

    pub async fn update_user(&self, uid: &str, input: UserInput, actor: &User) -> Result<Audited<User>, AppError> {
        input.validate()?;
        check_permissions(input.permissions.as_deref())?;
        if self.store.get_user(uid).await?.is_none() {
            return Err(AppError::not_found(format!("user {} not found", uid)));
        }
        let user = User {
            uid: uid.to_string(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            role: input.role,
            permissions: input.permissions,
        };
        self.store.save_user(&user).await?;
        tracing::info!(uid, role = %user.role, "User updated");
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::UpdateUser,
            actor,
            format!("Updated user {}", user.name),
        )
        .await;
        Ok(Audited::new(user, warning))
    }

    /// Removes the profile only; the identity account is left in place.
    pub async fn delete_user(&self, uid: &str, actor: &User) -> Result<Audited<()>, AppError> {
        if uid == actor.uid {
            return Err(AppError::conflict("you cannot delete your own account"));
        }
        if !self.store.delete_user(uid).await? {
            return Err(AppError::not_found(format!("user {} not found", uid)));
        }
        tracing::info!(uid, "User deleted");
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::DeleteUser,
            actor,
            format!("Deleted user with ID {}", uid),
        )
        .await;
        Ok(Audited::new((), warning))
    }

    // Ledger and audit

    pub async fn ledger(&self) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(ledger_newest_first(self.store.list_ledger().await?))
    }

    pub async fn delete_ledger_entries(&self, entry_ids: &[String], actor: &User) -> Result<Audited<LedgerDeletion>, AppError> {
        if !actor.is_admin() {
            return Err(AppError::forbidden("only administrators may delete ledger entries"));
        }
        if entry_ids.is_empty() {
            return Err(AppError::bad_request("no ledger entries selected"));
        }
        let deleted = self.store.delete_ledger_entries(entry_ids).await?;
        tracing::warn!(requested = entry_ids.len(), deleted, "Ledger entries deleted");
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::DeleteLedgerEntries,
            actor,
            format!("Deleted {} ledger entries", deleted),
        )
        .await;
        Ok(Audited::new(LedgerDeletion { deleted }, warning))
    }

    pub async fn verify_ledger(&self) -> Result<LedgerReport, AppError> {
        let collections = self.store.list_collections().await?;
        let entries = self.store.list_ledger().await?;
        let violations = verify_ledger(&collections, &entries);
        if !violations.is_empty() {
            tracing::warn!(violations = violations.len(), "Ledger verification found violations");
        }
        Ok(LedgerReport {
            entries_checked: entries.len(),
            collections_checked: collections.len(),
            violations,
        })
    }

    pub async fn audit_logs(&self) -> Result<Vec<AuditLog>, AppError> {
        Ok(audit_newest_first(self.store.list_audit_logs().await?))
    }
}
