use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, Unchanged,
};
use tracing::info;

use crate::{
    cache::{ACTORS_TAG, TagEviction, invalidate},
    entities::{actor, actor_movie},
    error::{CatalogError, CatalogResult},
    filter::contains_literal,
    models::{Actor, ActorInput},
    pagination::{Page, PageLimits, PaginationRequest, fetch_page},
};

pub struct ActorsRepository<C> {
    db: DatabaseConnection,
    cache: C,
    limits: PageLimits,
}

impl<C: TagEviction> ActorsRepository<C> {
    pub fn new(db: DatabaseConnection, cache: C, limits: PageLimits) -> Self {
        Self { db, cache, limits }
    }

    pub async fn list(&self, pagination: PaginationRequest) -> CatalogResult<Page<Actor>> {
        let pagination = pagination.resolve(self.limits)?;
        let select = actor::Entity::find()
            .order_by_asc(actor::Column::Name)
            .order_by_asc(actor::Column::Id);
        let page = fetch_page(select, &self.db, pagination).await?;
        Ok(page.try_map(Actor::try_from)?)
    }

    pub async fn get(&self, id: i32) -> CatalogResult<Actor> {
        let row = actor::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("actor", id))?;
        Ok(Actor::try_from(row)?)
    }

    /// Actors whose name contains `name`, ordered by name.
    pub async fn search(&self, name: &str) -> CatalogResult<Vec<Actor>> {
        let rows = actor::Entity::find()
            .filter(contains_literal((actor::Entity, actor::Column::Name), name))
            .order_by_asc(actor::Column::Name)
            .order_by_asc(actor::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Actor::try_from).collect::<Result<_, _>>()?)
    }

    pub async fn exists(&self, id: i32) -> CatalogResult<bool> {
        Ok(actor::Entity::find_by_id(id).count(&self.db).await? > 0)
    }

    pub async fn create(&self, input: &ActorInput) -> CatalogResult<i32> {
        input.validate()?;

        let row = actor::ActiveModel {
            name: Set(input.name.clone()),
            date_of_birth: Set(input.date_of_birth.to_string()),
            picture: Set(input.picture.clone()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(actor_id = row.id, name = %row.name, "created actor");
        invalidate(&self.cache, ACTORS_TAG).await;
        Ok(row.id)
    }

    pub async fn update(&self, id: i32, input: &ActorInput) -> CatalogResult<()> {
        input.validate()?;

        let result = actor::ActiveModel {
            id: Unchanged(id),
            name: Set(input.name.clone()),
            date_of_birth: Set(input.date_of_birth.to_string()),
            picture: Set(input.picture.clone()),
        }
        .update(&self.db)
        .await;
        match result {
            Ok(_) => {},
            Err(DbErr::RecordNotUpdated) => return Err(CatalogError::not_found("actor", id)),
            Err(err) => return Err(err.into()),
        }

        info!(actor_id = id, "updated actor");
        invalidate(&self.cache, ACTORS_TAG).await;
        Ok(())
    }

    /// Removes the actor and every credit they hold.
    pub async fn delete(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        actor_movie::Entity::delete_many()
            .filter(actor_movie::Column::ActorId.eq(id))
            .exec(&txn)
            .await?;
        let deleted = actor::Entity::delete_by_id(id).exec(&txn).await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(CatalogError::not_found("actor", id));
        }
        txn.commit().await?;

        info!(actor_id = id, "deleted actor");
        invalidate(&self.cache, ACTORS_TAG).await;
        Ok(())
    }
}
