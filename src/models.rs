use jiff::civil::Date;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

use crate::{
    entities::{actor, comment, genre, movie},
    error::ValidationError,
};

pub const TITLE_MAX_LEN: usize = 250;
pub const NAME_MAX_LEN: usize = 150;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub in_theaters: bool,
    pub release_date: Date,
    pub poster: Option<String>,
}

impl TryFrom<movie::Model> for Movie {
    type Error = DbErr;

    fn try_from(row: movie::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            release_date: parse_stored_date("movies.release_date", &row.release_date)?,
            title: row.title,
            in_theaters: row.in_theaters,
            poster: row.poster,
        })
    }
}

/// Writable fields of a movie, as received from callers.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieInput {
    pub title: String,
    #[serde(default)]
    pub in_theaters: bool,
    pub release_date: Date,
    #[serde(default)]
    pub poster: Option<String>,
}

impl MovieInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        bounded_text("title", &self.title, TITLE_MAX_LEN)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

impl From<genre::Model> for Genre {
    fn from(row: genre::Model) -> Self {
        Self { id: row.id, name: row.name }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenreInput {
    pub name: String,
}

impl GenreInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        bounded_text("name", &self.name, NAME_MAX_LEN)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub date_of_birth: Date,
    pub picture: Option<String>,
}

impl TryFrom<actor::Model> for Actor {
    type Error = DbErr;

    fn try_from(row: actor::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            date_of_birth: parse_stored_date("actors.date_of_birth", &row.date_of_birth)?,
            name: row.name,
            picture: row.picture,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorInput {
    pub name: String,
    pub date_of_birth: Date,
    #[serde(default)]
    pub picture: Option<String>,
}

impl ActorInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        bounded_text("name", &self.name, NAME_MAX_LEN)
    }
}

/// One requested credit. Its position in the submitted list is its billing order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditInput {
    pub actor_id: i32,
    #[serde(default)]
    pub character: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    pub actor: Actor,
    pub character: String,
    pub order: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i32,
    pub body: String,
    pub movie_id: i32,
    pub user_id: String,
}

impl From<comment::Model> for Comment {
    fn from(row: comment::Model) -> Self {
        Self { id: row.id, body: row.body, movie_id: row.movie_id, user_id: row.user_id }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommentInput {
    pub body: String,
}

impl CommentInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        required_text("body", &self.body)
    }
}

/// A movie together with the associations and comments it owns.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    pub genres: Vec<Genre>,
    pub actors: Vec<Credit>,
    pub comments: Vec<Comment>,
}

fn required_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::invalid(field, "is required"));
    }
    Ok(())
}

fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    required_text(field, value)?;
    if value.chars().count() > max {
        return Err(ValidationError::invalid(field, format!("must be at most {max} characters")));
    }
    Ok(())
}

fn parse_stored_date(column: &str, raw: &str) -> Result<Date, DbErr> {
    raw.parse().map_err(|e| DbErr::Type(format!("{column}: {raw:?} is not a date: {e}")))
}
