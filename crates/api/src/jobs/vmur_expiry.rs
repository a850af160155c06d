//! VMUR expiry sweep (spec.md §4.5 `expireOldVMURs`).

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use persistence::repositories::VmurRepository;

use super::scheduler::{Job, JobFrequency};

/// Flips every PENDING VMUR past `expiresAt` to EXPIRED.
pub struct VmurExpiryJob {
    pool: PgPool,
}

impl VmurExpiryJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for VmurExpiryJob {
    fn name(&self) -> &'static str {
        "vmur_expiry"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), String> {
        let repo = VmurRepository::new(self.pool.clone());
        let expired = repo
            .expire_due(Utc::now())
            .await
            .map_err(|e| format!("failed to expire due vmurs: {e}"))?;

        if expired > 0 {
            info!(expired, "expired pending vmurs past their deadline");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn runs_daily() {
        assert_eq!(JobFrequency::Daily.duration(), Duration::from_secs(86400));
    }
}
