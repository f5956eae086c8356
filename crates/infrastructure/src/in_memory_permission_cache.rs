use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use wardkeep_application::PermissionCache;
use wardkeep_core::AppResult;
use wardkeep_domain::UserId;

#[derive(Debug, Clone, Copy)]
struct PermissionCacheEntry {
    granted: bool,
    expires_at: Instant,
}

/// In-memory cache adapter for role-derived permission decisions.
#[derive(Debug, Default)]
pub struct InMemoryPermissionCache {
    entries: RwLock<HashMap<(UserId, String), PermissionCacheEntry>>,
}

impl InMemoryPermissionCache {
    /// Creates an empty in-memory permission cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get_decision(&self, user_id: UserId, permission: &str) -> AppResult<Option<bool>> {
        let key = (user_id, permission.to_owned());
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.granted));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&key);
        }

        Ok(None)
    }

    async fn set_decision(
        &self,
        user_id: UserId,
        permission: &str,
        granted: bool,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            (user_id, permission.to_owned()),
            PermissionCacheEntry {
                granted,
                expires_at,
            },
        );

        Ok(())
    }

    async fn invalidate_user(&self, user_id: UserId) -> AppResult<()> {
        self.entries
            .write()
            .await
            .retain(|(cached_user, _), _| *cached_user != user_id);
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wardkeep_application::PermissionCache;
    use wardkeep_domain::UserId;

    use super::InMemoryPermissionCache;

    #[tokio::test]
    async fn stores_negative_decisions() {
        let cache = InMemoryPermissionCache::new();
        let user_id = UserId::new();

        assert!(cache.set_decision(user_id, "view-billing", false, 60).await.is_ok());
        assert!(matches!(
            cache.get_decision(user_id, "view-billing").await,
            Ok(Some(false))
        ));
    }

    #[tokio::test]
    async fn zero_ttl_is_not_stored() {
        let cache = InMemoryPermissionCache::new();
        let user_id = UserId::new();

        assert!(cache.set_decision(user_id, "view-billing", true, 0).await.is_ok());
        assert!(matches!(
            cache.get_decision(user_id, "view-billing").await,
            Ok(None)
        ));
    }

    #[tokio::test]
    async fn invalidation_is_scoped_to_one_user() {
        let cache = InMemoryPermissionCache::new();
        let clerk = UserId::new();
        let nurse = UserId::new();

        for user_id in [clerk, nurse] {
            assert!(cache.set_decision(user_id, "view-billing", true, 60).await.is_ok());
        }

        assert!(cache.invalidate_user(clerk).await.is_ok());
        assert!(matches!(cache.get_decision(clerk, "view-billing").await, Ok(None)));
        assert!(matches!(
            cache.get_decision(nurse, "view-billing").await,
            Ok(Some(true))
        ));

        assert!(cache.flush().await.is_ok());
        assert!(matches!(cache.get_decision(nurse, "view-billing").await, Ok(None)));
    }

    #[tokio::test]
    async fn writes_drop_expired_entries_for_other_keys() {
        let cache = InMemoryPermissionCache::new();
        let clerk = UserId::new();
        let nurse = UserId::new();

        assert!(cache.set_decision(clerk, "view-billing", true, 1).await.is_ok());
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(cache.set_decision(nurse, "view-lab", true, 60).await.is_ok());
        assert_eq!(cache.len().await, 1);
        assert!(matches!(cache.get_decision(nurse, "view-lab").await, Ok(Some(true))));
    }
}
