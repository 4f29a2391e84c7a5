use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::existence::ReferenceKind;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{} with ids {} do not exist.", .kind.plural(), join_ids(.ids))]
    MissingReferences { kind: ReferenceKind, ids: Vec<i32> },
    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField { field, reason: reason.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("there's no {entity} with id {id}")]
    NotFound { entity: &'static str, id: i32 },
    #[error("{entity} {id} belongs to another user")]
    Forbidden { entity: &'static str, id: i32 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] sea_orm::DbErr),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failure to reach the response cache. Never fails the surrounding write.
#[derive(Debug, thiserror::Error)]
#[error("response cache unavailable: {0}")]
pub struct CacheError(#[from] pub sea_orm::DbErr);

#[derive(Debug)]
pub enum AppError {
    Catalog(CatalogError),
    /// The request carried no caller identity.
    Unauthorized,
    Internal(anyhow::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Catalog(err) => write!(f, "{err}"),
            AppError::Unauthorized => write!(f, "missing caller identity"),
            AppError::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Catalog(err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Catalog(CatalogError::NotFound { .. }) => StatusCode::NOT_FOUND.into_response(),
            AppError::Catalog(CatalogError::Forbidden { .. }) => StatusCode::FORBIDDEN.into_response(),
            AppError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            AppError::Catalog(CatalogError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string()).into_response()
            },
            other => {
                tracing::error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "an unexpected error occurred").into_response()
            },
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

fn join_ids(ids: &[i32]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}
