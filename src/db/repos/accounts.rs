use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{Account, CreateAccount},
};

#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn create(&self, input: CreateAccount) -> DbResult<Account>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Account>>;
    /// Activate or deactivate an account. `NotFound` if it does not exist.
    async fn set_active(&self, id: Uuid, active: bool) -> DbResult<()>;
}
