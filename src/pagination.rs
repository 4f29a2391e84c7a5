use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QuerySelect, Select,
};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Raw paging parameters as they arrive on a request.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationRequest {
    pub page: Option<i64>,
    pub records_per_page: Option<i64>,
}

impl PaginationRequest {
    pub fn new(page: i64, records_per_page: i64) -> Self {
        Self { page: Some(page), records_per_page: Some(records_per_page) }
    }

    /// Rejects non-positive values; oversized pages are clamped to the limit.
    pub fn resolve(&self, limits: PageLimits) -> Result<Pagination, ValidationError> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(ValidationError::invalid("page", "must be at least 1"));
        }

        let records_per_page = match self.records_per_page {
            None => limits.default_records_per_page,
            Some(n) if n <= 0 => {
                return Err(ValidationError::invalid("recordsPerPage", "must be positive"));
            },
            Some(n) => n as u64,
        };

        Ok(Pagination {
            page: page as u64,
            records_per_page: records_per_page.clamp(1, limits.max_records_per_page.max(1)),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub default_records_per_page: u64,
    pub max_records_per_page: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default_records_per_page: 10, max_records_per_page: 50 }
    }
}

/// A validated page window. `page` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    records_per_page: u64,
}

impl Pagination {
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn records_per_page(&self) -> u64 {
        self.records_per_page
    }

    /// Saturates for pages far past any real row count.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.records_per_page)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page { rows: self.rows.into_iter().map(f).collect::<Result<_, _>>()?, total: self.total })
    }
}

/// Counts every row matched by `select`, then fetches the requested window.
/// The select must already carry a deterministic ordering.
pub async fn fetch_page<'db, C, E, M>(
    select: Select<E>,
    db: &'db C,
    pagination: Pagination,
) -> Result<Page<M>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait<Model = M>,
    M: FromQueryResult + Send + Sync + 'db,
{
    let total = select.clone().count(db).await?;
    if pagination.offset() >= total {
        return Ok(Page { rows: Vec::new(), total });
    }

    let rows = select
        .offset(pagination.offset())
        .limit(pagination.records_per_page)
        .all(db)
        .await?;
    Ok(Page { rows, total })
}
