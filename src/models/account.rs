use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A local principal that can own API credentials.
///
/// Accounts are created and managed by the external authentication package;
/// this crate only needs enough of them to know who owns a credential and
/// whether that owner is still allowed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAccount {
    pub tenant_id: Uuid,
    #[validate(email, length(max = 320))]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub display_name: Option<String>,
}
