use jiff::civil::Date;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Order, QueryFilter, QueryOrder, Select,
    sea_query::{Expr, IntoColumnRef, LikeExpr, Query, SimpleExpr},
};
use serde::Deserialize;

use crate::{
    entities::{genre_movie, movie},
    error::ValidationError,
    pagination::PaginationRequest,
};

/// Sparse movie search. Unset fields add no clause.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub in_theaters: bool,
    #[serde(default)]
    pub future_releases: bool,
    /// `0` means no genre filter.
    #[serde(default)]
    pub genre_id: i32,
    #[serde(default)]
    pub order_by_field: Option<String>,
    #[serde(default)]
    pub order_by_ascending: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationRequest,
}

impl FilterCriteria {
    /// Conjunction of the clauses for every field that is set.
    pub fn condition(&self, today: Date) -> Condition {
        let mut cond = Condition::all();

        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            cond = cond.add(contains_literal((movie::Entity, movie::Column::Title), title));
        }

        if self.in_theaters {
            cond = cond.add(movie::Column::InTheaters.eq(true));
        }

        if self.future_releases {
            cond = cond.add(movie::Column::ReleaseDate.gt(today.to_string()));
        }

        if self.genre_id != 0 {
            cond = cond.add(
                movie::Column::Id.in_subquery(
                    Query::select()
                        .column(genre_movie::Column::MovieId)
                        .from(genre_movie::Entity)
                        .and_where(genre_movie::Column::GenreId.eq(self.genre_id))
                        .to_owned(),
                ),
            );
        }

        cond
    }

    pub fn sort(&self) -> Result<MovieSort, ValidationError> {
        let field = match self.order_by_field.as_deref().filter(|f| !f.is_empty()) {
            None => SortField::Title,
            Some(name) => SortField::parse(name).ok_or_else(|| {
                ValidationError::invalid("orderByField", format!("cannot order by {name:?}"))
            })?,
        };
        Ok(MovieSort { field, ascending: self.order_by_ascending.unwrap_or(true) })
    }

    /// Filtered and ordered, not yet paged.
    pub fn select(&self, today: Date) -> Result<Select<movie::Entity>, ValidationError> {
        let sort = self.sort()?;
        let cond = self.condition(today);
        let select = movie::Entity::find();
        let select = if cond.is_empty() { select } else { select.filter(cond) };
        Ok(sort.apply(select))
    }
}

/// `column LIKE '%needle%'` with `%`, `_` and `\` in the needle matched literally.
pub fn contains_literal(column: impl IntoColumnRef, needle: &str) -> SimpleExpr {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Expr::col(column).like(LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Title,
    ReleaseDate,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "title" => Some(SortField::Title),
            "releasedate" | "release_date" => Some(SortField::ReleaseDate),
            _ => None,
        }
    }

    fn column(self) -> movie::Column {
        match self {
            SortField::Title => movie::Column::Title,
            SortField::ReleaseDate => movie::Column::ReleaseDate,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovieSort {
    pub field: SortField,
    pub ascending: bool,
}

impl Default for MovieSort {
    fn default() -> Self {
        Self { field: SortField::Title, ascending: true }
    }
}

impl MovieSort {
    /// Id is always the final key so pages never overlap.
    pub fn apply(self, select: Select<movie::Entity>) -> Select<movie::Entity> {
        let order = if self.ascending { Order::Asc } else { Order::Desc };
        select.order_by(self.field.column(), order).order_by_asc(movie::Column::Id)
    }
}
