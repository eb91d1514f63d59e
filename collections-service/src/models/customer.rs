use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub customer_id: String,
    pub customer_name: String,
    pub business_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub br_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    /// GPS position as entered by the collector.
    #[serde(default)]
    pub location: String,
    pub credit_limit: Decimal,
    pub credit_period_days: u32,
    /// Empty when the customer is not assigned to a route.
    #[serde(default)]
    pub route_id: String,
    #[serde(default)]
    pub status: CustomerStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// Create/edit form payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, message = "business name is required"))]
    pub business_name: String,
    #[serde(default)]
    pub customer_name: String,
    #[validate(length(min = 1, message = "phone number is required"))]
    pub phone_number: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default)]
    pub address: String,
    pub business_address: Option<String>,
    pub br_number: Option<String>,
    pub nic: Option<String>,
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub location: String,
    pub credit_limit: Option<Decimal>,
    #[validate(range(max = 3650, message = "credit period must be at most 3650 days"))]
    pub credit_period_days: Option<u32>,
    #[serde(default)]
    pub route_id: String,
    pub status: Option<CustomerStatus>,
}

impl CustomerInput {
    /// Build a customer record, filling credit terms from the given defaults.
    pub fn into_customer(
        self,
        customer_id: String,
        default_credit_limit: Decimal,
        default_credit_period: u32,
        created_by: Option<String>,
    ) -> Customer {
        let customer_name = if self.customer_name.trim().is_empty() {
            self.business_name.clone()
        } else {
            self.customer_name
        };
        Customer {
            customer_id,
            customer_name,
            business_name: self.business_name,
            phone_number: self.phone_number,
            whatsapp_number: self.whatsapp_number,
            address: self.address,
            business_address: self.business_address,
            br_number: self.br_number,
            nic: self.nic,
            date_of_birth: self.date_of_birth,
            location: self.location,
            credit_limit: self.credit_limit.unwrap_or(default_credit_limit),
            credit_period_days: self.credit_period_days.unwrap_or(default_credit_period),
            route_id: self.route_id,
            status: self.status.unwrap_or_default(),
            created_by,
            deleted: false,
        }
    }
}
