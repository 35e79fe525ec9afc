use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{DirectoryProfileUpdate, NewStaffMember, StaffMember},
};

#[async_trait]
pub trait StaffRepo: Send + Sync {
    async fn create(&self, input: NewStaffMember) -> DbResult<StaffMember>;

    /// Create a staff record and its identity link (status `active`) in one
    /// transaction. Either both rows exist afterwards or neither does.
    async fn create_with_link(
        &self,
        input: NewStaffMember,
        external_user_id: &str,
        synced_at: DateTime<Utc>,
    ) -> DbResult<StaffMember>;

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<StaffMember>>;

    /// First staff record in the tenant whose own email, or whose linked
    /// account's email, equals `email` case-insensitively.
    async fn find_by_email(&self, tenant_id: Uuid, email: &str) -> DbResult<Option<StaffMember>>;

    async fn update_directory_profile(
        &self,
        id: Uuid,
        update: &DirectoryProfileUpdate,
    ) -> DbResult<()>;

    async fn count_by_tenant(&self, tenant_id: Uuid) -> DbResult<i64>;
}
