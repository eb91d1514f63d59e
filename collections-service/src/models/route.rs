use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RouteStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub route_id: String,
    pub route_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RouteStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RouteInput {
    #[validate(length(min = 1, message = "route name is required"))]
    pub route_name: String,
    pub description: Option<String>,
}
