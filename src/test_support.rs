use std::sync::Mutex;

use jiff::civil::Date;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::{
    cache::TagEviction,
    db,
    entities::{actor, genre, movie},
    error::CacheError,
};

pub async fn db() -> DatabaseConnection {
    db::connect_and_migrate("sqlite::memory:").await.unwrap()
}

pub async fn genre(db: &DatabaseConnection, name: &str) -> i32 {
    genre::ActiveModel { name: Set(name.to_string()), ..Default::default() }
        .insert(db)
        .await
        .unwrap()
        .id
}

pub async fn actor(db: &DatabaseConnection, name: &str) -> i32 {
    actor::ActiveModel {
        name: Set(name.to_string()),
        date_of_birth: Set("1940-04-25".to_string()),
        picture: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn movie(db: &DatabaseConnection, title: &str, release_date: Date, in_theaters: bool) -> i32 {
    movie::ActiveModel {
        title: Set(title.to_string()),
        in_theaters: Set(in_theaters),
        release_date: Set(release_date.to_string()),
        poster: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

/// Remembers every eviction request; optionally fails all of them.
#[derive(Default)]
pub struct RecordingCache {
    evictions: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingCache {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn evictions(&self) -> Vec<String> {
        self.evictions.lock().unwrap().clone()
    }
}

impl TagEviction for RecordingCache {
    async fn evict_by_tag(&self, tag: &str) -> Result<u64, CacheError> {
        self.evictions.lock().unwrap().push(tag.to_string());
        if self.fail {
            return Err(CacheError(sea_orm::DbErr::Custom("cache offline".to_string())));
        }
        Ok(0)
    }
}

impl<T: TagEviction> TagEviction for &T {
    async fn evict_by_tag(&self, tag: &str) -> Result<u64, CacheError> {
        (**self).evict_by_tag(tag).await
    }
}
