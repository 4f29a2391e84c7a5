//! Set reconciliation of a movie's genre and actor associations.
//!
//! The desired collection fully replaces the current one, but only the rows
//! that actually differ are written: links that disappear are deleted, new
//! links are inserted, and links present on both sides are updated in place
//! when their payload changed.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use sea_orm::{
    ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, Set, sea_query::Expr,
};

use crate::{
    entities::{actor_movie, genre_movie},
    existence::distinct_in_order,
    models::CreditInput,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff<K, V> {
    pub inserts: Vec<(K, V)>,
    pub updates: Vec<(K, V)>,
    pub deletes: Vec<K>,
}

impl<K, V> Diff<K, V> {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Keys of `desired` must be distinct. Output follows the order of the inputs.
pub fn diff<K, V>(current: &[(K, V)], desired: &[(K, V)]) -> Diff<K, V>
where
    K: Copy + Eq + Hash,
    V: Clone + PartialEq,
{
    let existing: HashMap<K, &V> = current.iter().map(|(k, v)| (*k, v)).collect();
    let wanted: HashSet<K> = desired.iter().map(|(k, _)| *k).collect();

    let deletes = current.iter().map(|(k, _)| *k).filter(|k| !wanted.contains(k)).collect();

    let mut inserts = Vec::new();
    let mut updates = Vec::new();
    for (key, value) in desired {
        match existing.get(key) {
            None => inserts.push((*key, value.clone())),
            Some(current) if *current != value => updates.push((*key, value.clone())),
            Some(_) => {},
        }
    }

    Diff { inserts, updates, deletes }
}

/// Payload of an actor credit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreditSlot {
    pub character: String,
    pub order: i32,
}

/// Numbers credits 1..N in the order given. A repeated actor keeps its first
/// position and later repeats are dropped, so the numbering stays contiguous.
pub fn number_credits(credits: &[CreditInput]) -> Vec<(i32, CreditSlot)> {
    let mut seen = HashSet::with_capacity(credits.len());
    credits
        .iter()
        .filter(|c| seen.insert(c.actor_id))
        .zip(1..)
        .map(|(c, order)| (c.actor_id, CreditSlot { character: c.character.clone(), order }))
        .collect()
}

pub async fn reconcile_genres(
    txn: &DatabaseTransaction,
    movie_id: i32,
    genre_ids: &[i32],
) -> Result<Diff<i32, ()>, DbErr> {
    let current: Vec<(i32, ())> = genre_movie::Entity::find()
        .filter(genre_movie::Column::MovieId.eq(movie_id))
        .all(txn)
        .await?
        .into_iter()
        .map(|row| (row.genre_id, ()))
        .collect();
    let desired: Vec<(i32, ())> =
        distinct_in_order(genre_ids).into_iter().map(|id| (id, ())).collect();

    let diff = diff(&current, &desired);

    if !diff.deletes.is_empty() {
        genre_movie::Entity::delete_many()
            .filter(genre_movie::Column::MovieId.eq(movie_id))
            .filter(genre_movie::Column::GenreId.is_in(diff.deletes.iter().copied()))
            .exec(txn)
            .await?;
    }

    if !diff.inserts.is_empty() {
        genre_movie::Entity::insert_many(diff.inserts.iter().map(|(genre_id, _)| {
            genre_movie::ActiveModel { movie_id: Set(movie_id), genre_id: Set(*genre_id) }
        }))
        .exec_without_returning(txn)
        .await?;
    }

    Ok(diff)
}

pub async fn reconcile_credits(
    txn: &DatabaseTransaction,
    movie_id: i32,
    credits: &[CreditInput],
) -> Result<Diff<i32, CreditSlot>, DbErr> {
    let current: Vec<(i32, CreditSlot)> = actor_movie::Entity::find()
        .filter(actor_movie::Column::MovieId.eq(movie_id))
        .all(txn)
        .await?
        .into_iter()
        .map(|row| (row.actor_id, CreditSlot { character: row.character, order: row.order }))
        .collect();
    let desired = number_credits(credits);

    let diff = diff(&current, &desired);

    if !diff.deletes.is_empty() {
        actor_movie::Entity::delete_many()
            .filter(actor_movie::Column::MovieId.eq(movie_id))
            .filter(actor_movie::Column::ActorId.is_in(diff.deletes.iter().copied()))
            .exec(txn)
            .await?;
    }

    for (actor_id, slot) in &diff.updates {
        actor_movie::Entity::update_many()
            .col_expr(actor_movie::Column::Character, Expr::value(slot.character.clone()))
            .col_expr(actor_movie::Column::Order, Expr::value(slot.order))
            .filter(actor_movie::Column::MovieId.eq(movie_id))
            .filter(actor_movie::Column::ActorId.eq(*actor_id))
            .exec(txn)
            .await?;
    }

    if !diff.inserts.is_empty() {
        actor_movie::Entity::insert_many(diff.inserts.iter().map(|(actor_id, slot)| {
            actor_movie::ActiveModel {
                movie_id: Set(movie_id),
                actor_id: Set(*actor_id),
                character: Set(slot.character.clone()),
                order: Set(slot.order),
            }
        }))
        .exec_without_returning(txn)
        .await?;
    }

    Ok(diff)
}
