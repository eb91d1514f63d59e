use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The singleton `system/settings` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalSettings {
    pub default_credit_limit: Decimal,
    pub default_credit_period: u32,
    pub enable_cheque_camera: bool,
    pub currency_code: String,
    pub country: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_credit_limit: Decimal::from(50_000),
            default_credit_period: 30,
            enable_cheque_camera: true,
            currency_code: "LKR".to_string(),
            country: "Sri Lanka".to_string(),
        }
    }
}
