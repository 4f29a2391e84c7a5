use std::{future::Future, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
    AppState,
    actors::ActorsRepository,
    auth::CurrentUser,
    cache::{ACTORS_TAG, COMMENTS_TAG, CacheManager, GENRES_TAG, MOVIES_TAG},
    comments::CommentsRepository,
    error::{AppResult, CatalogError, CatalogResult},
    filter::FilterCriteria,
    genres::GenresRepository,
    models::{ActorInput, CommentInput, CreditInput, GenreInput, MovieInput},
    movies::MoviesRepository,
    pagination::{Page, PaginationRequest},
};

pub const TOTAL_RECORDS: HeaderName = HeaderName::from_static("totalamountofrecords");

type SharedState = State<Arc<AppState>>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/filter", post(filter_movies))
        .route("/movies/{id}", get(get_movie).put(update_movie).delete(delete_movie))
        .route("/movies/{id}/assignGenres", post(assign_genres))
        .route("/movies/{id}/assignActors", post(assign_actors))
        .route("/movies/{id}/comments", get(list_comments).post(create_comment))
        .route(
            "/movies/{id}/comments/{comment_id}",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/{id}", get(get_genre).put(update_genre).delete(delete_genre))
        .route("/actors", get(list_actors).post(create_actor))
        .route("/actors/search/{name}", get(search_actors))
        .route("/actors/{id}", get(get_actor).put(update_actor).delete(delete_actor))
        .with_state(state)
}

impl AppState {
    fn movies(&self) -> MoviesRepository<CacheManager> {
        MoviesRepository::new(self.db.clone(), self.cache.clone(), self.config.page_limits())
    }

    fn genres(&self) -> GenresRepository<CacheManager> {
        GenresRepository::new(self.db.clone(), self.cache.clone())
    }

    fn actors(&self) -> ActorsRepository<CacheManager> {
        ActorsRepository::new(self.db.clone(), self.cache.clone(), self.config.page_limits())
    }

    fn comments(&self) -> CommentsRepository<CacheManager> {
        CommentsRepository::new(self.db.clone(), self.cache.clone())
    }
}

pub async fn list_movies(
    State(state): SharedState,
    Query(req): Query<PaginationRequest>,
) -> AppResult<Response> {
    let pagination = req.resolve(state.config.page_limits())?;
    let key = format!(
        "{MOVIES_TAG}?page={}&recordsPerPage={}",
        pagination.page(),
        pagination.records_per_page()
    );
    let movies = state.movies();
    let page = cached(&state.cache, &key, MOVIES_TAG, || movies.list(req)).await?;
    Ok(paged(page))
}

pub async fn filter_movies(
    State(state): SharedState,
    Json(criteria): Json<FilterCriteria>,
) -> AppResult<Response> {
    Ok(paged(state.movies().filter(&criteria).await?))
}

pub async fn get_movie(State(state): SharedState, Path(id): Path<i32>) -> AppResult<Response> {
    Ok(Json(state.movies().get_by_id(id).await?).into_response())
}

pub async fn create_movie(
    State(state): SharedState,
    Json(input): Json<MovieInput>,
) -> AppResult<Response> {
    let id = state.movies().create(&input).await?;
    created(format!("/movies/{id}"), state.movies().get_by_id(id).await?)
}

pub async fn update_movie(
    State(state): SharedState,
    Path(id): Path<i32>,
    Json(input): Json<MovieInput>,
) -> AppResult<StatusCode> {
    state.movies().update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_movie(State(state): SharedState, Path(id): Path<i32>) -> AppResult<StatusCode> {
    state.movies().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_genres(
    State(state): SharedState,
    Path(id): Path<i32>,
    Json(genre_ids): Json<Vec<i32>>,
) -> AppResult<StatusCode> {
    state.movies().assign_genres(id, &genre_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_actors(
    State(state): SharedState,
    Path(id): Path<i32>,
    Json(credits): Json<Vec<CreditInput>>,
) -> AppResult<StatusCode> {
    state.movies().assign_actors(id, &credits).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
    State(state): SharedState,
    Path(movie_id): Path<i32>,
) -> AppResult<Response> {
    // a cached list must not outlive its movie
    if !state.movies().exists(movie_id).await? {
        return Err(CatalogError::not_found("movie", movie_id).into());
    }
    let key = format!("{COMMENTS_TAG}?movieId={movie_id}");
    let comments = state.comments();
    let list = cached(&state.cache, &key, COMMENTS_TAG, || comments.list(movie_id)).await?;
    Ok(Json(list).into_response())
}

pub async fn get_comment(
    State(state): SharedState,
    Path((movie_id, id)): Path<(i32, i32)>,
) -> AppResult<Response> {
    Ok(Json(state.comments().get(movie_id, id).await?).into_response())
}

pub async fn create_comment(
    State(state): SharedState,
    Path(movie_id): Path<i32>,
    user: CurrentUser,
    Json(input): Json<CommentInput>,
) -> AppResult<Response> {
    let comment = state.comments().create(movie_id, &user.user_id, &input).await?;
    created(format!("/movies/{movie_id}/comments/{}", comment.id), comment)
}

pub async fn update_comment(
    State(state): SharedState,
    Path((movie_id, id)): Path<(i32, i32)>,
    user: CurrentUser,
    Json(input): Json<CommentInput>,
) -> AppResult<StatusCode> {
    state.comments().update(movie_id, id, &user.user_id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_comment(
    State(state): SharedState,
    Path((movie_id, id)): Path<(i32, i32)>,
    user: CurrentUser,
) -> AppResult<StatusCode> {
    state.comments().delete(movie_id, id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_genres(State(state): SharedState) -> AppResult<Response> {
    let repo = state.genres();
    let genres = cached(&state.cache, GENRES_TAG, GENRES_TAG, || repo.list()).await?;
    Ok(Json(genres).into_response())
}

pub async fn get_genre(State(state): SharedState, Path(id): Path<i32>) -> AppResult<Response> {
    Ok(Json(state.genres().get(id).await?).into_response())
}

pub async fn create_genre(
    State(state): SharedState,
    Json(input): Json<GenreInput>,
) -> AppResult<Response> {
    let id = state.genres().create(&input).await?;
    created(format!("/genres/{id}"), state.genres().get(id).await?)
}

pub async fn update_genre(
    State(state): SharedState,
    Path(id): Path<i32>,
    Json(input): Json<GenreInput>,
) -> AppResult<StatusCode> {
    state.genres().update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_genre(State(state): SharedState, Path(id): Path<i32>) -> AppResult<StatusCode> {
    state.genres().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_actors(
    State(state): SharedState,
    Query(req): Query<PaginationRequest>,
) -> AppResult<Response> {
    let pagination = req.resolve(state.config.page_limits())?;
    let key = format!(
        "{ACTORS_TAG}?page={}&recordsPerPage={}",
        pagination.page(),
        pagination.records_per_page()
    );
    let actors = state.actors();
    let page = cached(&state.cache, &key, ACTORS_TAG, || actors.list(req)).await?;
    Ok(paged(page))
}

pub async fn search_actors(
    State(state): SharedState,
    Path(name): Path<String>,
) -> AppResult<Response> {
    Ok(Json(state.actors().search(&name).await?).into_response())
}

pub async fn get_actor(State(state): SharedState, Path(id): Path<i32>) -> AppResult<Response> {
    Ok(Json(state.actors().get(id).await?).into_response())
}

pub async fn create_actor(
    State(state): SharedState,
    Json(input): Json<ActorInput>,
) -> AppResult<Response> {
    let id = state.actors().create(&input).await?;
    created(format!("/actors/{id}"), state.actors().get(id).await?)
}

pub async fn update_actor(
    State(state): SharedState,
    Path(id): Path<i32>,
    Json(input): Json<ActorInput>,
) -> AppResult<StatusCode> {
    state.actors().update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_actor(State(state): SharedState, Path(id): Path<i32>) -> AppResult<StatusCode> {
    state.actors().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serves `key` from the response cache, loading and storing it on a miss.
/// Cache trouble degrades to a plain load.
async fn cached<T, F, Fut>(cache: &CacheManager, key: &str, tag: &str, load: F) -> AppResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = CatalogResult<T>>,
{
    match cache.get(key).await {
        Ok(Some(body)) => match serde_json::from_str(&body) {
            Ok(value) => return Ok(value),
            Err(err) => warn!(key, error = %err, "discarding unreadable cache entry"),
        },
        Ok(None) => {},
        Err(err) => warn!(key, error = %err, "cache read failed"),
    }

    let value = load().await?;
    let body = serde_json::to_string(&value)?;
    if let Err(err) = cache.put(key, tag, &body).await {
        warn!(key, error = %err, "cache write failed");
    }
    Ok(value)
}

/// Rows as the body, the total match count as a header.
fn paged<T: Serialize>(page: Page<T>) -> Response {
    let mut resp = Json(page.rows).into_response();
    resp.headers_mut().insert(TOTAL_RECORDS, HeaderValue::from(page.total));
    resp
}

fn created<T: Serialize>(location: String, body: T) -> AppResult<Response> {
    let mut resp = (StatusCode::CREATED, Json(body)).into_response();
    let location = HeaderValue::from_str(&location).map_err(anyhow::Error::new)?;
    resp.headers_mut().insert(LOCATION, location);
    Ok(resp)
}
