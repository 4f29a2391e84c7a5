use std::future::Future;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, warn};

use crate::{entities::response_cache, error::CacheError};

pub const MOVIES_TAG: &str = "movies-get";
pub const GENRES_TAG: &str = "genres-get";
pub const ACTORS_TAG: &str = "actors-get";
pub const COMMENTS_TAG: &str = "comments-get";

/// Group eviction of cached responses.
pub trait TagEviction: Send + Sync {
    /// Removes every entry carrying `tag`, returning how many were dropped.
    fn evict_by_tag(&self, tag: &str) -> impl Future<Output = Result<u64, CacheError>> + Send;
}

/// Evicts `tag` after a committed write. Failure is logged, never returned.
pub async fn invalidate<T: TagEviction>(cache: &T, tag: &str) {
    match cache.evict_by_tag(tag).await {
        Ok(removed) => debug!(tag, removed, "evicted cached responses"),
        Err(err) => warn!(tag, error = %err, "cache eviction failed, responses may be stale"),
    }
}

/// Serialized responses kept in the store, grouped by tag and expired by age.
#[derive(Clone)]
pub struct CacheManager {
    db: DatabaseConnection,
    ttl_seconds: i64,
}

impl CacheManager {
    pub fn new(db: DatabaseConnection, ttl_seconds: i64) -> Self {
        Self { db, ttl_seconds }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entry = response_cache::Entity::find_by_id(key.to_string()).one(&self.db).await?;
        Ok(entry.filter(|e| self.is_fresh(e.cached_at)).map(|e| e.body))
    }

    pub async fn put(&self, key: &str, tag: &str, body: &str) -> Result<(), CacheError> {
        let model = response_cache::ActiveModel {
            key: Set(key.to_string()),
            tag: Set(tag.to_string()),
            body: Set(body.to_string()),
            cached_at: Set(now_sec()),
        };

        response_cache::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(response_cache::Column::Key)
                    .update_columns([
                        response_cache::Column::Tag,
                        response_cache::Column::Body,
                        response_cache::Column::CachedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    fn is_fresh(&self, cached_at: i64) -> bool {
        now_sec().saturating_sub(cached_at) <= self.ttl_seconds
    }
}

impl TagEviction for CacheManager {
    async fn evict_by_tag(&self, tag: &str) -> Result<u64, CacheError> {
        let res = response_cache::Entity::delete_many()
            .filter(response_cache::Column::Tag.eq(tag))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, RecordingCache};

    #[tokio::test]
    async fn eviction_is_scoped_to_the_tag() {
        let db = test_support::db().await;
        let cache = CacheManager::new(db, 60);

        cache.put("movies-get:1:10", MOVIES_TAG, "[1]").await.unwrap();
        cache.put("movies-get:2:10", MOVIES_TAG, "[2]").await.unwrap();
        cache.put("genres-get", GENRES_TAG, "[]").await.unwrap();

        assert_eq!(cache.get("movies-get:1:10").await.unwrap().as_deref(), Some("[1]"));
        assert_eq!(cache.evict_by_tag(MOVIES_TAG).await.unwrap(), 2);
        assert_eq!(cache.get("movies-get:1:10").await.unwrap(), None);
        assert_eq!(cache.get("genres-get").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn put_replaces_existing_entry() {
        let db = test_support::db().await;
        let cache = CacheManager::new(db, 60);

        cache.put("k", MOVIES_TAG, "old").await.unwrap();
        cache.put("k", MOVIES_TAG, "new").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn stale_entries_are_misses() {
        let db = test_support::db().await;
        let cache = CacheManager::new(db, -1);

        cache.put("k", MOVIES_TAG, "body").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalidate_swallows_failures() {
        let cache = RecordingCache::failing();
        invalidate(&cache, MOVIES_TAG).await;
        assert_eq!(cache.evictions(), vec![MOVIES_TAG.to_string()]);
    }
}
