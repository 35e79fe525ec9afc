use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The columns of a staff record that directory sync reads or writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub account_id: Option<Uuid>,
    pub reference_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStaffMember {
    pub tenant_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub account_id: Option<Uuid>,
    pub reference_code: Option<String>,
}

/// Fields refreshed on a matched staff record. `reference_code` is left
/// untouched when `None`.
#[derive(Debug, Clone)]
pub struct DirectoryProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub reference_code: Option<String>,
}
