use std::collections::{HashSet, VecDeque};
use std::sync::RwLock;

use nutri_core::{TenantId, UserId};

use super::{AccessAction, AccessLog, AccessLogStore, AccessStats, LogStoreError};

/// Default number of entries kept in memory.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Bounded in-memory access log for tests/dev. Oldest entries are dropped
/// once `capacity` is reached.
#[derive(Debug)]
pub struct InMemoryAccessLogStore {
    inner: RwLock<VecDeque<AccessLog>>,
    capacity: usize,
}

impl InMemoryAccessLogStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn newest<F>(&self, limit: usize, keep: F) -> Result<Vec<AccessLog>, LogStoreError>
    where
        F: Fn(&AccessLog) -> bool,
    {
        let entries = self
            .inner
            .read()
            .map_err(|_| LogStoreError::Backend("lock poisoned".into()))?;
        Ok(entries.iter().rev().filter(|e| keep(e)).take(limit).cloned().collect())
    }
}

impl Default for InMemoryAccessLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AccessLogStore for InMemoryAccessLogStore {
    async fn record(&self, entry: AccessLog) -> Result<(), LogStoreError> {
        let mut entries = self
            .inner
            .write()
            .map_err(|_| LogStoreError::Backend("lock poisoned".into()))?;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    async fn for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        self.newest(limit, |e| e.user_id == Some(user_id))
    }

    async fn for_tenant(&self, tenant_id: TenantId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        self.newest(limit, |e| e.tenant_id == Some(tenant_id))
    }

    async fn failed_logins(&self, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        self.newest(limit, |e| e.action == AccessAction::Login && !e.success)
    }

    async fn stats(&self) -> Result<AccessStats, LogStoreError> {
        let entries = self
            .inner
            .read()
            .map_err(|_| LogStoreError::Backend("lock poisoned".into()))?;

        let total = entries.len() as u64;
        let successful = entries.iter().filter(|e| e.success).count() as u64;
        // Anonymous requests count as one "user", like any other id.
        let unique: HashSet<Option<UserId>> = entries.iter().map(|e| e.user_id).collect();
        Ok(AccessStats::from_counts(total, successful, unique.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nutri_core::AccessLogId;
    use serde_json::json;

    fn entry(user_id: Option<UserId>, action: AccessAction, success: bool) -> AccessLog {
        AccessLog {
            id: AccessLogId::new(),
            user_id,
            user_email: None,
            user_role: None,
            tenant_id: None,
            action,
            resource: "/api/x".into(),
            method: "GET".into(),
            ip_address: None,
            user_agent: None,
            success,
            error_message: None,
            status_code: if success { 200 } else { 401 },
            response_time_ms: 1,
            metadata: json!({}),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_limited() {
        let store = InMemoryAccessLogStore::new();
        let user = UserId::new();
        for _ in 0..5 {
            store.record(entry(Some(user), AccessAction::Read, true)).await.unwrap();
        }
        let last = entry(Some(user), AccessAction::Update, true);
        store.record(last.clone()).await.unwrap();

        let page = store.for_user(user, 3).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].id, last.id);
        assert!(store.for_user(UserId::new(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn capacity_drops_oldest() {
        let store = InMemoryAccessLogStore::with_capacity(2);
        let first = entry(None, AccessAction::Read, true);
        store.record(first.clone()).await.unwrap();
        store.record(entry(None, AccessAction::Read, true)).await.unwrap();
        store.record(entry(None, AccessAction::Read, false)).await.unwrap();

        assert_eq!(store.stats().await.unwrap().total_access, 2);
    }

    #[tokio::test]
    async fn failed_logins_and_stats() {
        let store = InMemoryAccessLogStore::new();
        let user = UserId::new();
        store.record(entry(None, AccessAction::Login, false)).await.unwrap();
        store.record(entry(Some(user), AccessAction::Login, true)).await.unwrap();
        store.record(entry(Some(user), AccessAction::Read, false)).await.unwrap();

        let failed = store.failed_logins(50).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].user_id, None);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_access, 3);
        assert_eq!(stats.failed_access, 2);
        assert_eq!(stats.unique_users_count, 2);
    }
}
