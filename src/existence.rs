use std::collections::HashSet;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use tracing::debug;

use crate::{
    entities::{actor, genre},
    error::{CatalogResult, ValidationError},
};

/// Entities a movie association may point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    Genre,
    Actor,
}

impl ReferenceKind {
    pub fn plural(self) -> &'static str {
        match self {
            ReferenceKind::Genre => "Genres",
            ReferenceKind::Actor => "Actors",
        }
    }
}

/// Returns which of `ids` exist. An empty request never touches the store.
pub async fn existing_ids<C: ConnectionTrait>(
    db: &C,
    kind: ReferenceKind,
    ids: &[i32],
) -> Result<HashSet<i32>, DbErr> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let distinct = distinct_in_order(ids);
    let found: Vec<i32> = match kind {
        ReferenceKind::Genre => {
            genre::Entity::find()
                .select_only()
                .column(genre::Column::Id)
                .filter(genre::Column::Id.is_in(distinct))
                .into_tuple()
                .all(db)
                .await?
        },
        ReferenceKind::Actor => {
            actor::Entity::find()
                .select_only()
                .column(actor::Column::Id)
                .filter(actor::Column::Id.is_in(distinct))
                .into_tuple()
                .all(db)
                .await?
        },
    };

    debug!(kind = ?kind, requested = ids.len(), found = found.len(), "checked references");
    Ok(found.into_iter().collect())
}

/// Fails with the missing ids, in the order they were first requested.
pub async fn ensure_exist<C: ConnectionTrait>(
    db: &C,
    kind: ReferenceKind,
    ids: &[i32],
) -> CatalogResult<()> {
    let existing = existing_ids(db, kind, ids).await?;
    let missing: Vec<i32> =
        distinct_in_order(ids).into_iter().filter(|id| !existing.contains(id)).collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingReferences { kind, ids: missing }.into())
    }
}

pub fn distinct_in_order(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
