use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::{
    cache::{COMMENTS_TAG, TagEviction, invalidate},
    entities::{comment, movie},
    error::{CatalogError, CatalogResult},
    models::{Comment, CommentInput},
};

/// Comments on a movie. Only the author of a comment may change or remove it.
pub struct CommentsRepository<C> {
    db: DatabaseConnection,
    cache: C,
}

impl<C: TagEviction> CommentsRepository<C> {
    pub fn new(db: DatabaseConnection, cache: C) -> Self {
        Self { db, cache }
    }

    pub async fn list(&self, movie_id: i32) -> CatalogResult<Vec<Comment>> {
        self.ensure_movie(movie_id).await?;

        let rows = comment::Entity::find()
            .filter(comment::Column::MovieId.eq(movie_id))
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    /// A comment is only visible under the movie it was written on.
    pub async fn get(&self, movie_id: i32, id: i32) -> CatalogResult<Comment> {
        self.find(movie_id, id).await.map(Comment::from)
    }

    pub async fn create(
        &self,
        movie_id: i32,
        user_id: &str,
        input: &CommentInput,
    ) -> CatalogResult<Comment> {
        input.validate()?;
        self.ensure_movie(movie_id).await?;

        let row = comment::ActiveModel {
            body: Set(input.body.clone()),
            movie_id: Set(movie_id),
            user_id: Set(user_id.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(comment_id = row.id, movie_id, user_id, "created comment");
        invalidate(&self.cache, COMMENTS_TAG).await;
        Ok(row.into())
    }

    pub async fn update(
        &self,
        movie_id: i32,
        id: i32,
        user_id: &str,
        input: &CommentInput,
    ) -> CatalogResult<()> {
        input.validate()?;
        let row = self.owned(movie_id, id, user_id).await?;

        let mut row: comment::ActiveModel = row.into();
        row.body = Set(input.body.clone());
        row.update(&self.db).await?;

        info!(comment_id = id, movie_id, "updated comment");
        invalidate(&self.cache, COMMENTS_TAG).await;
        Ok(())
    }

    pub async fn delete(&self, movie_id: i32, id: i32, user_id: &str) -> CatalogResult<()> {
        self.owned(movie_id, id, user_id).await?;

        comment::Entity::delete_by_id(id).exec(&self.db).await?;

        info!(comment_id = id, movie_id, "deleted comment");
        invalidate(&self.cache, COMMENTS_TAG).await;
        Ok(())
    }

    async fn ensure_movie(&self, movie_id: i32) -> CatalogResult<()> {
        if movie::Entity::find_by_id(movie_id).count(&self.db).await? == 0 {
            return Err(CatalogError::not_found("movie", movie_id));
        }
        Ok(())
    }

    async fn find(&self, movie_id: i32, id: i32) -> CatalogResult<comment::Model> {
        self.ensure_movie(movie_id).await?;

        comment::Entity::find_by_id(id)
            .filter(comment::Column::MovieId.eq(movie_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("comment", id))
    }

    async fn owned(&self, movie_id: i32, id: i32, user_id: &str) -> CatalogResult<comment::Model> {
        let row = self.find(movie_id, id).await?;
        if row.user_id != user_id {
            return Err(CatalogError::Forbidden { entity: "comment", id });
        }
        Ok(row)
    }
}
