use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{DbPool, SyncLockRepo},
    federation::{FederationClient, FederationError},
    models::{
        DirectoryProfileUpdate, DirectoryUser, ExternalIdentityLink, NewStaffMember, SyncReport,
        SyncStatus,
    },
};

const MAX_LOCK_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Reconciles directory users with local staff records.
///
/// Runs are serialized per tenant through a lease row in the shared store.
/// Nothing is written until the complete directory listing has been fetched.
#[derive(Clone)]
pub struct DirectorySyncService {
    db: Arc<DbPool>,
    federation: Arc<FederationClient>,
    lock_ttl: Duration,
}

impl DirectorySyncService {
    pub fn new(db: Arc<DbPool>, federation: Arc<FederationClient>, lock_ttl_secs: u64) -> Self {
        Self {
            db,
            federation,
            lock_ttl: Duration::seconds(lock_ttl_secs.min(MAX_LOCK_TTL_SECS) as i64),
        }
    }

    /// Pull the tenant's directory and create or update staff records.
    ///
    /// Fails with `SyncInProgress` when another run holds the tenant's lease.
    pub async fn sync_tenant(&self, tenant_id: Uuid) -> Result<SyncReport, FederationError> {
        let holder = Uuid::new_v4();
        let now = Utc::now();
        let stale_before = now - self.lock_ttl;

        let acquired = self
            .db
            .sync_locks()
            .try_acquire(
                tenant_id,
                holder,
                now.timestamp_millis(),
                stale_before.timestamp_millis(),
            )
            .await?;
        if !acquired {
            tracing::warn!(tenant_id = %tenant_id, "Directory sync already running");
            return Err(FederationError::SyncInProgress(tenant_id));
        }

        let lease = SyncLease {
            locks: self.db.sync_locks(),
            tenant_id,
            holder,
            released: false,
        };
        let result = self.run(tenant_id).await;
        lease.release().await;

        result
    }

    async fn run(&self, tenant_id: Uuid) -> Result<SyncReport, FederationError> {
        let mut report = SyncReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let users = self.federation.fetch_all_directory_users(tenant_id).await?;

        for user in &users {
            self.sync_user(tenant_id, user, &mut report).await;
        }

        report.finished_at = Some(Utc::now());
        tracing::info!(
            tenant_id = %tenant_id,
            fetched = users.len(),
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            warnings = report.warnings.len(),
            "Directory sync finished"
        );

        Ok(report)
    }

    async fn sync_user(&self, tenant_id: Uuid, user: &DirectoryUser, report: &mut SyncReport) {
        if user.is_disabled() {
            report.skipped += 1;
            return;
        }

        let Some(email) = user.usable_email() else {
            record_warning(report, user, "has no usable email address");
            return;
        };

        let (first_name, last_name) = match user.names() {
            (first, last) if first.is_empty() && last.is_empty() => (
                email.split('@').next().unwrap_or_default().to_string(),
                String::new(),
            ),
            names => names,
        };
        let reference_code = user.reference_code().map(str::to_string);
        let synced_at = Utc::now();

        let existing = match self.db.staff().find_by_email(tenant_id, &email).await {
            Ok(existing) => existing,
            Err(e) => {
                record_warning(report, user, &format!("could not be matched: {e}"));
                return;
            }
        };

        match existing {
            Some(staff) => {
                let update = DirectoryProfileUpdate {
                    first_name,
                    last_name,
                    reference_code,
                };
                let updated = self
                    .db
                    .staff()
                    .update_directory_profile(staff.id, &update)
                    .await;

                match updated {
                    Ok(()) => {
                        let link = identity_link(tenant_id, user, staff.id, synced_at, None);
                        match self.db.identity_links().upsert(&link).await {
                            Ok(()) => report.updated += 1,
                            Err(e) => {
                                record_warning(report, user, &format!("could not be linked: {e}"))
                            }
                        }
                    }
                    Err(e) => {
                        let message = e.to_string();
                        let link = identity_link(
                            tenant_id,
                            user,
                            staff.id,
                            synced_at,
                            Some(message.clone()),
                        );
                        if let Err(e) = self.db.identity_links().upsert(&link).await {
                            tracing::debug!(error = %e, "Failed to record identity link error");
                        }
                        record_warning(report, user, &format!("could not be updated: {message}"));
                    }
                }
            }
            None => {
                let input = NewStaffMember {
                    tenant_id,
                    first_name,
                    last_name,
                    email: Some(email),
                    account_id: None,
                    reference_code,
                };
                match self
                    .db
                    .staff()
                    .create_with_link(input, &user.id, synced_at)
                    .await
                {
                    Ok(_) => report.created += 1,
                    Err(e) => record_warning(report, user, &format!("could not be created: {e}")),
                }
            }
        }
    }
}

/// A held per-tenant sync lease.
///
/// Dropping it unreleased (the sync future was cancelled) hands the release
/// to a background task so the tenant is not blocked until the lease goes stale.
struct SyncLease {
    locks: Arc<dyn SyncLockRepo>,
    tenant_id: Uuid,
    holder: Uuid,
    released: bool,
}

impl SyncLease {
    async fn release(mut self) {
        self.released = true;
        release_lease(self.locks.as_ref(), self.tenant_id, self.holder).await;
    }
}

impl Drop for SyncLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                tenant_id = %self.tenant_id,
                "Sync cancelled outside a runtime, lease left to expire"
            );
            return;
        };
        tracing::warn!(tenant_id = %self.tenant_id, "Directory sync cancelled");
        let locks = Arc::clone(&self.locks);
        let (tenant_id, holder) = (self.tenant_id, self.holder);
        handle.spawn(async move {
            release_lease(locks.as_ref(), tenant_id, holder).await;
        });
    }
}

async fn release_lease(locks: &dyn SyncLockRepo, tenant_id: Uuid, holder: Uuid) {
    if let Err(e) = locks.release(tenant_id, holder).await {
        tracing::warn!(error = %e, tenant_id = %tenant_id, "Failed to release sync lease");
    }
}

fn identity_link(
    tenant_id: Uuid,
    user: &DirectoryUser,
    local_person_id: Uuid,
    synced_at: DateTime<Utc>,
    error: Option<String>,
) -> ExternalIdentityLink {
    ExternalIdentityLink {
        tenant_id,
        external_user_id: user.id.clone(),
        local_person_id,
        last_synced_at: synced_at,
        sync_status: if error.is_some() {
            SyncStatus::Error
        } else {
            SyncStatus::Active
        },
        sync_error: error,
    }
}

fn record_warning(report: &mut SyncReport, user: &DirectoryUser, problem: &str) {
    let label = user
        .display_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("unnamed");
    let warning = format!("Directory user {} ({}) {}", user.id, label, problem);
    tracing::debug!(warning = %warning, "Skipped directory user");
    report.skip_with_warning(warning);
}
