use anyhow::Result;
use std::collections::HashMap;
use tracing::error;

use crate::db::Store;
use crate::entities::audit_log;

/// A log row joined with the usernames the admin UI displays.
#[derive(Debug)]
pub struct AuditEntryDetail {
    pub entry: audit_log::Model,
    pub admin_username: Option<String>,
    pub target_username: Option<String>,
    pub target_uid: Option<i64>,
}

/// Records privileged actions. Recording is deliberately best-effort: a
/// failed insert is logged and swallowed so the primary mutation still
/// succeeds.
#[derive(Clone)]
pub struct AuditService {
    store: Store,
}

impl AuditService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        admin_id: i32,
        action: &str,
        target_user_id: Option<i32>,
        details: serde_json::Value,
    ) {
        if let Err(e) = self
            .store
            .audit_repo()
            .append(admin_id, action, target_user_id, &details)
            .await
        {
            error!(action, admin_id, error = %e, "Audit log write failed");
        }
    }

    pub async fn list(&self, page: u64, per_page: u64) -> Result<(Vec<AuditEntryDetail>, u64)> {
        let (entries, total) = self.store.audit_repo().list(page, per_page).await?;

        // Resolve actor/target names in one pass per page.
        let mut ids: Vec<i32> = entries.iter().map(|e| e.admin_id).collect();
        ids.extend(entries.iter().filter_map(|e| e.target_user_id));
        ids.sort_unstable();
        ids.dedup();

        let users = self.store.user_repo();
        let mut names: HashMap<i32, (String, i64)> = HashMap::new();
        for id in ids {
            if let Some(user) = users.get_by_id(id).await? {
                names.insert(id, (user.username, user.uid));
            }
        }

        let detailed = entries
            .into_iter()
            .map(|entry| {
                let admin_username = names.get(&entry.admin_id).map(|(n, _)| n.clone());
                let target = entry.target_user_id.and_then(|id| names.get(&id));
                AuditEntryDetail {
                    admin_username,
                    target_username: target.map(|(n, _)| n.clone()),
                    target_uid: target.map(|(_, uid)| *uid),
                    entry,
                }
            })
            .collect();

        Ok((detailed, total))
    }
}
