use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, Unchanged,
};
use tracing::info;

use crate::{
    cache::{GENRES_TAG, TagEviction, invalidate},
    entities::{genre, genre_movie},
    error::{CatalogError, CatalogResult},
    models::{Genre, GenreInput},
};

pub struct GenresRepository<C> {
    db: DatabaseConnection,
    cache: C,
}

impl<C: TagEviction> GenresRepository<C> {
    pub fn new(db: DatabaseConnection, cache: C) -> Self {
        Self { db, cache }
    }

    pub async fn list(&self) -> CatalogResult<Vec<Genre>> {
        let rows = genre::Entity::find()
            .order_by_asc(genre::Column::Name)
            .order_by_asc(genre::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Genre::from).collect())
    }

    pub async fn get(&self, id: i32) -> CatalogResult<Genre> {
        genre::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Genre::from)
            .ok_or_else(|| CatalogError::not_found("genre", id))
    }

    pub async fn exists(&self, id: i32) -> CatalogResult<bool> {
        Ok(genre::Entity::find_by_id(id).count(&self.db).await? > 0)
    }

    pub async fn create(&self, input: &GenreInput) -> CatalogResult<i32> {
        input.validate()?;

        let row = genre::ActiveModel { name: Set(input.name.clone()), ..Default::default() }
            .insert(&self.db)
            .await?;

        info!(genre_id = row.id, name = %row.name, "created genre");
        invalidate(&self.cache, GENRES_TAG).await;
        Ok(row.id)
    }

    pub async fn update(&self, id: i32, input: &GenreInput) -> CatalogResult<()> {
        input.validate()?;

        let result = genre::ActiveModel { id: Unchanged(id), name: Set(input.name.clone()) }
            .update(&self.db)
            .await;
        match result {
            Ok(_) => {},
            Err(DbErr::RecordNotUpdated) => return Err(CatalogError::not_found("genre", id)),
            Err(err) => return Err(err.into()),
        }

        info!(genre_id = id, "updated genre");
        invalidate(&self.cache, GENRES_TAG).await;
        Ok(())
    }

    /// Removes the genre and unlinks it from every movie.
    pub async fn delete(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        genre_movie::Entity::delete_many()
            .filter(genre_movie::Column::GenreId.eq(id))
            .exec(&txn)
            .await?;
        let deleted = genre::Entity::delete_by_id(id).exec(&txn).await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(CatalogError::not_found("genre", id));
        }
        txn.commit().await?;

        info!(genre_id = id, "deleted genre");
        invalidate(&self.cache, GENRES_TAG).await;
        Ok(())
    }
}
