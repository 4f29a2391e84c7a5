use jiff::civil::Date;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, Unchanged, sea_query::Query,
};
use tracing::{debug, info};

use crate::{
    cache::{MOVIES_TAG, TagEviction, invalidate},
    entities::{actor, actor_movie, comment, genre, genre_movie, movie},
    error::{CatalogError, CatalogResult},
    existence::{ReferenceKind, ensure_exist},
    filter::{FilterCriteria, MovieSort},
    models::{Actor, Comment, Credit, CreditInput, Genre, Movie, MovieDetails, MovieInput},
    pagination::{Page, PageLimits, PaginationRequest, fetch_page},
    reconcile,
};

/// Reads and writes of the movie aggregate. One instance serves one request.
pub struct MoviesRepository<C> {
    db: DatabaseConnection,
    cache: C,
    limits: PageLimits,
}

impl<C: TagEviction> MoviesRepository<C> {
    pub fn new(db: DatabaseConnection, cache: C, limits: PageLimits) -> Self {
        Self { db, cache, limits }
    }

    /// Every movie ordered by title.
    pub async fn list(&self, pagination: PaginationRequest) -> CatalogResult<Page<Movie>> {
        let pagination = pagination.resolve(self.limits)?;
        let select = MovieSort::default().apply(movie::Entity::find());
        let page = fetch_page(select, &self.db, pagination).await?;
        Ok(page.try_map(Movie::try_from)?)
    }

    pub async fn filter(&self, criteria: &FilterCriteria) -> CatalogResult<Page<Movie>> {
        let today: Date = jiff::Zoned::now().date();
        self.filter_as_of(criteria, today).await
    }

    /// Like [`filter`](Self::filter), with "future releases" measured from `today`.
    pub async fn filter_as_of(
        &self,
        criteria: &FilterCriteria,
        today: Date,
    ) -> CatalogResult<Page<Movie>> {
        let pagination = criteria.pagination.resolve(self.limits)?;
        let select = criteria.select(today)?;
        let page = fetch_page(select, &self.db, pagination).await?;
        debug!(total = page.total, returned = page.rows.len(), "filtered movies");
        Ok(page.try_map(Movie::try_from)?)
    }

    pub async fn get_by_id(&self, id: i32) -> CatalogResult<MovieDetails> {
        let row = movie::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("movie", id))?;

        let genres = genre::Entity::find()
            .filter(
                genre::Column::Id.in_subquery(
                    Query::select()
                        .column(genre_movie::Column::GenreId)
                        .from(genre_movie::Entity)
                        .and_where(genre_movie::Column::MovieId.eq(id))
                        .to_owned(),
                ),
            )
            .order_by_asc(genre::Column::Name)
            .order_by_asc(genre::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Genre::from)
            .collect();

        let mut actors = Vec::new();
        for (credit, person) in actor_movie::Entity::find()
            .filter(actor_movie::Column::MovieId.eq(id))
            .order_by_asc(actor_movie::Column::Order)
            .find_also_related(actor::Entity)
            .all(&self.db)
            .await?
        {
            let Some(person) = person else {
                continue;
            };
            actors.push(Credit {
                actor: Actor::try_from(person)?,
                character: credit.character,
                order: credit.order,
            });
        }

        let comments = comment::Entity::find()
            .filter(comment::Column::MovieId.eq(id))
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Comment::from)
            .collect();

        Ok(MovieDetails { movie: Movie::try_from(row)?, genres, actors, comments })
    }

    pub async fn exists(&self, id: i32) -> CatalogResult<bool> {
        Ok(movie::Entity::find_by_id(id).count(&self.db).await? > 0)
    }

    pub async fn create(&self, input: &MovieInput) -> CatalogResult<i32> {
        input.validate()?;

        let row = movie::ActiveModel {
            title: Set(input.title.clone()),
            in_theaters: Set(input.in_theaters),
            release_date: Set(input.release_date.to_string()),
            poster: Set(input.poster.clone()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(movie_id = row.id, title = %row.title, "created movie");
        invalidate(&self.cache, MOVIES_TAG).await;
        Ok(row.id)
    }

    pub async fn update(&self, id: i32, input: &MovieInput) -> CatalogResult<()> {
        input.validate()?;

        let result = movie::ActiveModel {
            id: Unchanged(id),
            title: Set(input.title.clone()),
            in_theaters: Set(input.in_theaters),
            release_date: Set(input.release_date.to_string()),
            poster: Set(input.poster.clone()),
        }
        .update(&self.db)
        .await;

        match result {
            Ok(_) => {},
            Err(DbErr::RecordNotUpdated) => return Err(CatalogError::not_found("movie", id)),
            Err(err) => return Err(err.into()),
        }

        info!(movie_id = id, "updated movie");
        invalidate(&self.cache, MOVIES_TAG).await;
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        genre_movie::Entity::delete_many()
            .filter(genre_movie::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        actor_movie::Entity::delete_many()
            .filter(actor_movie::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        comment::Entity::delete_many().filter(comment::Column::MovieId.eq(id)).exec(&txn).await?;
        let deleted = movie::Entity::delete_by_id(id).exec(&txn).await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(CatalogError::not_found("movie", id));
        }
        txn.commit().await?;

        info!(movie_id = id, "deleted movie");
        invalidate(&self.cache, MOVIES_TAG).await;
        Ok(())
    }

    /// Makes the movie's genres exactly `genre_ids`. Duplicates are ignored.
    pub async fn assign_genres(&self, movie_id: i32, genre_ids: &[i32]) -> CatalogResult<()> {
        if !self.exists(movie_id).await? {
            return Err(CatalogError::not_found("movie", movie_id));
        }
        ensure_exist(&self.db, ReferenceKind::Genre, genre_ids).await?;

        let txn = self.db.begin().await?;
        let diff = reconcile::reconcile_genres(&txn, movie_id, genre_ids).await?;
        txn.commit().await?;

        if diff.is_empty() {
            debug!(movie_id, "genres already up to date");
        } else {
            info!(
                movie_id,
                inserted = diff.inserts.len(),
                deleted = diff.deletes.len(),
                "assigned genres"
            );
        }
        invalidate(&self.cache, MOVIES_TAG).await;
        Ok(())
    }

    /// Makes the movie's cast exactly `credits`, billed in the order given.
    pub async fn assign_actors(&self, movie_id: i32, credits: &[CreditInput]) -> CatalogResult<()> {
        if !self.exists(movie_id).await? {
            return Err(CatalogError::not_found("movie", movie_id));
        }
        let actor_ids: Vec<i32> = credits.iter().map(|c| c.actor_id).collect();
        ensure_exist(&self.db, ReferenceKind::Actor, &actor_ids).await?;

        let txn = self.db.begin().await?;
        let diff = reconcile::reconcile_credits(&txn, movie_id, credits).await?;
        txn.commit().await?;

        if diff.is_empty() {
            debug!(movie_id, "cast already up to date");
        } else {
            info!(
                movie_id,
                inserted = diff.inserts.len(),
                updated = diff.updates.len(),
                deleted = diff.deletes.len(),
                "assigned actors"
            );
        }
        invalidate(&self.cache, MOVIES_TAG).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use sea_orm::DatabaseConnection;

    use super::*;
    use crate::{
        error::ValidationError,
        test_support::{self, RecordingCache},
    };

    const TODAY: Date = date(2025, 6, 1);

    fn repo<'a>(
        db: &DatabaseConnection,
        cache: &'a RecordingCache,
    ) -> MoviesRepository<&'a RecordingCache> {
        MoviesRepository::new(db.clone(), cache, PageLimits::default())
    }

    fn credit(actor_id: i32, character: &str) -> CreditInput {
        CreditInput { actor_id, character: character.to_string() }
    }

    fn input(title: &str) -> MovieInput {
        MovieInput {
            title: title.to_string(),
            in_theaters: false,
            release_date: date(1995, 12, 15),
            poster: None,
        }
    }

    async fn five_movies(db: &DatabaseConnection) -> Vec<i32> {
        let mut ids = Vec::new();
        for title in ["Heat", "Alien", "Casino", "Brazil", "Drive"] {
            ids.push(test_support::movie(db, title, date(1990, 1, 1), false).await);
        }
        ids
    }

    fn titles(page: &Page<Movie>) -> Vec<&str> {
        page.rows.iter().map(|m| m.title.as_str()).collect()
    }

    async fn cast(repo: &MoviesRepository<&RecordingCache>, movie_id: i32) -> Vec<(i32, i32)> {
        let details = repo.get_by_id(movie_id).await.unwrap();
        details.actors.iter().map(|c| (c.actor.id, c.order)).collect()
    }

    #[tokio::test]
    async fn unfiltered_list_returns_everything_by_title() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        five_movies(&db).await;

        let page = repo(&db, &cache).list(PaginationRequest::new(1, 50)).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(titles(&page), ["Alien", "Brazil", "Casino", "Drive", "Heat"]);
    }

    #[tokio::test]
    async fn pages_partition_the_ordered_result() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        five_movies(&db).await;
        let repo = repo(&db, &cache);

        let mut seen = Vec::new();
        for (page, expected) in [(1, 2), (2, 2), (3, 1)] {
            let result = repo.list(PaginationRequest::new(page, 2)).await.unwrap();
            assert_eq!(result.total, 5);
            assert_eq!(result.rows.len(), expected);
            seen.extend(result.rows.into_iter().map(|m| m.title));
        }
        assert_eq!(seen, ["Alien", "Brazil", "Casino", "Drive", "Heat"]);

        let beyond = repo.list(PaginationRequest::new(4, 2)).await.unwrap();
        assert!(beyond.rows.is_empty());
        assert_eq!(beyond.total, 5);
    }

    #[tokio::test]
    async fn same_title_pages_deterministically_by_id() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let first = test_support::movie(&db, "Solaris", date(1972, 3, 20), false).await;
        let second = test_support::movie(&db, "Solaris", date(2002, 11, 27), false).await;

        let repo = repo(&db, &cache);
        let p1 = repo.list(PaginationRequest::new(1, 1)).await.unwrap();
        let p2 = repo.list(PaginationRequest::new(2, 1)).await.unwrap();
        assert_eq!(p1.rows[0].id, first);
        assert_eq!(p2.rows[0].id, second);
    }

    #[tokio::test]
    async fn invalid_paging_is_rejected() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();

        let err = repo(&db, &cache).list(PaginationRequest::new(0, 10)).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ValidationError::InvalidField { .. })));
    }

    #[tokio::test]
    async fn filter_combines_clauses_and_counts_matches() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let noir = test_support::genre(&db, "Noir").await;
        let heat = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let heat2 = test_support::movie(&db, "Heat 2", date(2026, 8, 1), true).await;
        test_support::movie(&db, "Thief", date(1981, 3, 27), true).await;
        let repo = repo(&db, &cache);
        repo.assign_genres(heat, &[noir]).await.unwrap();
        repo.assign_genres(heat2, &[noir]).await.unwrap();

        let by_title = FilterCriteria { title: Some("Heat".into()), ..Default::default() };
        let page = repo.filter_as_of(&by_title, TODAY).await.unwrap();
        assert_eq!(titles(&page), ["Heat", "Heat 2"]);

        let upcoming = FilterCriteria { future_releases: true, ..Default::default() };
        assert_eq!(titles(&repo.filter_as_of(&upcoming, TODAY).await.unwrap()), ["Heat 2"]);

        let showing = FilterCriteria { in_theaters: true, ..Default::default() };
        assert_eq!(
            titles(&repo.filter_as_of(&showing, TODAY).await.unwrap()),
            ["Heat 2", "Thief"]
        );

        let by_genre = FilterCriteria {
            genre_id: noir,
            pagination: PaginationRequest::new(1, 1),
            ..Default::default()
        };
        let page = repo.filter_as_of(&by_genre, TODAY).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(titles(&page), ["Heat"]);

        let newest_first = FilterCriteria {
            order_by_field: Some("releaseDate".into()),
            order_by_ascending: Some(false),
            ..Default::default()
        };
        assert_eq!(
            titles(&repo.filter_as_of(&newest_first, TODAY).await.unwrap()),
            ["Heat 2", "Heat", "Thief"]
        );
    }

    #[tokio::test]
    async fn details_include_genres_and_billing_order() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let crime = test_support::genre(&db, "Crime").await;
        let action = test_support::genre(&db, "Action").await;
        let pacino = test_support::actor(&db, "Al Pacino").await;
        let de_niro = test_support::actor(&db, "Robert De Niro").await;
        let repo = repo(&db, &cache);

        repo.assign_genres(movie, &[crime, action]).await.unwrap();
        repo.assign_actors(movie, &[credit(de_niro, "Neil"), credit(pacino, "Vincent")])
            .await
            .unwrap();

        let details = repo.get_by_id(movie).await.unwrap();
        assert_eq!(details.movie.title, "Heat");
        let genres: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(genres, ["Action", "Crime"]);
        assert_eq!(details.actors[0].actor.name, "Robert De Niro");
        assert_eq!(details.actors[0].character, "Neil");
        assert_eq!(details.actors[1].order, 2);
    }

    #[tokio::test]
    async fn missing_movie_is_not_found() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let repo = repo(&db, &cache);

        assert!(matches!(repo.get_by_id(77).await, Err(CatalogError::NotFound { id: 77, .. })));
        assert!(!repo.exists(77).await.unwrap());
    }

    #[tokio::test]
    async fn writes_evict_once_each() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let genre = test_support::genre(&db, "Drama").await;
        let repo = repo(&db, &cache);

        let id = repo.create(&input("Heat")).await.unwrap();
        assert!(repo.exists(id).await.unwrap());
        repo.update(id, &input("Heat (1995)")).await.unwrap();
        repo.assign_genres(id, &[genre]).await.unwrap();
        repo.assign_actors(id, &[]).await.unwrap();
        repo.delete(id).await.unwrap();

        assert_eq!(cache.evictions(), vec![MOVIES_TAG; 5]);
        assert!(!repo.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn update_changes_stored_fields() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let repo = repo(&db, &cache);

        let id = repo.create(&input("Heat")).await.unwrap();
        let mut changed = input("Heat (Director's Cut)");
        changed.in_theaters = true;
        changed.poster = Some("posters/heat.jpg".into());
        repo.update(id, &changed).await.unwrap();

        let movie = repo.get_by_id(id).await.unwrap().movie;
        assert_eq!(movie.title, "Heat (Director's Cut)");
        assert!(movie.in_theaters);
        assert_eq!(movie.poster.as_deref(), Some("posters/heat.jpg"));
    }

    #[tokio::test]
    async fn short_circuits_do_not_evict() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let repo = repo(&db, &cache);

        assert!(matches!(repo.delete(404).await, Err(CatalogError::NotFound { .. })));
        assert!(matches!(repo.update(404, &input("Heat")).await, Err(CatalogError::NotFound { .. })));
        assert!(matches!(repo.assign_genres(404, &[1]).await, Err(CatalogError::NotFound { .. })));
        assert!(matches!(repo.create(&input("")).await, Err(CatalogError::Validation(_))));

        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        assert!(matches!(
            repo.assign_actors(movie, &[credit(12, "Neil")]).await,
            Err(CatalogError::Validation(_))
        ));

        assert!(cache.evictions().is_empty());
    }

    #[tokio::test]
    async fn assign_on_missing_movie_skips_reference_checks() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let repo = repo(&db, &cache);

        // the genre ids are bogus too; the movie check must win
        let err = repo.assign_genres(404, &[98, 99]).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "movie", id: 404 }));
    }

    #[tokio::test]
    async fn missing_references_leave_associations_untouched() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let crime = test_support::genre(&db, "Crime").await;
        let repo = repo(&db, &cache);
        repo.assign_genres(movie, &[crime]).await.unwrap();

        let err = repo.assign_genres(movie, &[crime, 500, 501]).await.unwrap_err();
        assert_eq!(err.to_string(), "Genres with ids 500, 501 do not exist.");

        let details = repo.get_by_id(movie).await.unwrap();
        assert_eq!(details.genres.len(), 1);
        assert_eq!(details.genres[0].id, crime);
    }

    #[tokio::test]
    async fn empty_genre_list_clears_and_is_idempotent() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let crime = test_support::genre(&db, "Crime").await;
        let repo = repo(&db, &cache);
        repo.assign_genres(movie, &[crime]).await.unwrap();

        repo.assign_genres(movie, &[]).await.unwrap();
        assert!(repo.get_by_id(movie).await.unwrap().genres.is_empty());
        repo.assign_genres(movie, &[]).await.unwrap();
        assert!(repo.get_by_id(movie).await.unwrap().genres.is_empty());
    }

    #[tokio::test]
    async fn reassigning_the_same_genres_changes_nothing() {
        let db = test_support::db().await;
        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let crime = test_support::genre(&db, "Crime").await;
        let drama = test_support::genre(&db, "Drama").await;

        for expect_changes in [true, false] {
            let txn = db.begin().await.unwrap();
            let diff = reconcile::reconcile_genres(&txn, movie, &[crime, drama, crime])
                .await
                .unwrap();
            txn.commit().await.unwrap();
            assert_eq!(!diff.is_empty(), expect_changes);
        }
    }

    #[tokio::test]
    async fn dropping_an_actor_renumbers_the_cast() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let a = test_support::actor(&db, "Al Pacino").await;
        let b = test_support::actor(&db, "Robert De Niro").await;
        let c = test_support::actor(&db, "Val Kilmer").await;
        let repo = repo(&db, &cache);

        repo.assign_actors(movie, &[credit(a, "Vincent"), credit(b, "Neil"), credit(c, "Chris")])
            .await
            .unwrap();
        assert_eq!(cast(&repo, movie).await, vec![(a, 1), (b, 2), (c, 3)]);

        repo.assign_actors(movie, &[credit(b, "Neil"), credit(c, "Chris")]).await.unwrap();
        assert_eq!(cast(&repo, movie).await, vec![(b, 1), (c, 2)]);

        repo.assign_actors(movie, &[credit(c, "Chris"), credit(a, "Vincent"), credit(c, "x")])
            .await
            .unwrap();
        assert_eq!(cast(&repo, movie).await, vec![(c, 1), (a, 2)]);
    }

    #[tokio::test]
    async fn eviction_failure_does_not_fail_the_write() {
        let db = test_support::db().await;
        let cache = RecordingCache::failing();
        let repo = repo(&db, &cache);

        let id = repo.create(&input("Heat")).await.unwrap();
        assert!(repo.exists(id).await.unwrap());
        assert_eq!(cache.evictions().len(), 1);
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        five_movies(&db).await;

        let page = repo(&db, &cache).list(PaginationRequest::new(i64::MAX, 50)).await.unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn title_filter_matches_wildcards_literally() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        test_support::movie(&db, "100% Wolf", date(2020, 5, 21), false).await;
        test_support::movie(&db, "heat wave", date(2001, 7, 4), false).await;
        let repo = repo(&db, &cache);

        let percent = FilterCriteria { title: Some("%".into()), ..Default::default() };
        assert_eq!(titles(&repo.filter_as_of(&percent, TODAY).await.unwrap()), ["100% Wolf"]);

        let underscore = FilterCriteria { title: Some("_".into()), ..Default::default() };
        let page = repo.filter_as_of(&underscore, TODAY).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn missing_actor_leaves_existing_cast_untouched() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let a = test_support::actor(&db, "Al Pacino").await;
        let b = test_support::actor(&db, "Robert De Niro").await;
        let repo = repo(&db, &cache);
        repo.assign_actors(movie, &[credit(a, "Vincent"), credit(b, "Neil")]).await.unwrap();

        let err = repo
            .assign_actors(movie, &[credit(b, "Neil"), credit(900, "Waingro")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Actors with ids 900 do not exist.");
        assert_eq!(cast(&repo, movie).await, vec![(a, 1), (b, 2)]);
        assert_eq!(cache.evictions().len(), 1);
    }

    #[tokio::test]
    async fn reassigning_the_same_cast_changes_nothing() {
        let db = test_support::db().await;
        let cache = RecordingCache::default();
        let movie = test_support::movie(&db, "Heat", date(1995, 12, 15), false).await;
        let a = test_support::actor(&db, "Al Pacino").await;
        let b = test_support::actor(&db, "Robert De Niro").await;
        let credits = [credit(b, "Neil"), credit(a, "Vincent")];

        for expect_changes in [true, false] {
            let txn = db.begin().await.unwrap();
            let diff = reconcile::reconcile_credits(&txn, movie, &credits).await.unwrap();
            txn.commit().await.unwrap();
            assert_eq!(!diff.is_empty(), expect_changes);
        }
        assert_eq!(cast(&repo(&db, &cache), movie).await, vec![(b, 1), (a, 2)]);
    }
}
