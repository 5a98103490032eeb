use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::db::Store;

/// Background maintenance: reclaims expired verification codes and reset
/// tokens. Lookups already filter on expiry, so the sweep is about table
/// hygiene, not correctness.
pub struct Maintenance {
    store: Store,
}

impl Maintenance {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Starts the scheduler; the returned handle keeps the jobs alive.
    pub async fn start(self) -> Result<JobScheduler> {
        let mut sched = JobScheduler::new().await?;

        let store = self.store;
        let job = Job::new_async("0 */15 * * * *", move |_id, _lock| {
            let store = store.clone();
            Box::pin(async move {
                match store.verification_repo().purge_expired().await {
                    Ok((codes, tokens)) if codes + tokens > 0 => {
                        info!(codes, tokens, "Purged expired one-time credentials");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Credential purge failed"),
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Maintenance scheduler started (purge every 15 minutes)");

        Ok(sched)
    }
}
