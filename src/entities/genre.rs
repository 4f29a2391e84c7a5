use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "genres")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::genre_movie::Entity")]
    GenreMovie,
}

impl Related<super::genre_movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GenreMovie.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
