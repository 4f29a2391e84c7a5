use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string_len(Movies::Title, 250))
                    .col(boolean(Movies::InTheaters))
                    .col(string(Movies::ReleaseDate))
                    .col(string_null(Movies::Poster))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_title")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .col(Movies::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(string_len(Genres::Name, 150))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actors::Table)
                    .if_not_exists()
                    .col(pk_auto(Actors::Id))
                    .col(string_len(Actors::Name, 150))
                    .col(string(Actors::DateOfBirth))
                    .col(string_null(Actors::Picture))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GenresMovies::Table)
                    .if_not_exists()
                    .col(integer(GenresMovies::MovieId))
                    .col(integer(GenresMovies::GenreId))
                    .primary_key(
                        Index::create().col(GenresMovies::MovieId).col(GenresMovies::GenreId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_genres_movies_movie")
                            .from(GenresMovies::Table, GenresMovies::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_genres_movies_genre")
                            .from(GenresMovies::Table, GenresMovies::GenreId)
                            .to(Genres::Table, Genres::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_genres_movies_genre")
                    .table(GenresMovies::Table)
                    .col(GenresMovies::GenreId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActorsMovies::Table)
                    .if_not_exists()
                    .col(integer(ActorsMovies::MovieId))
                    .col(integer(ActorsMovies::ActorId))
                    .col(string(ActorsMovies::Character))
                    .col(integer(ActorsMovies::Order))
                    .primary_key(
                        Index::create().col(ActorsMovies::MovieId).col(ActorsMovies::ActorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_actors_movies_movie")
                            .from(ActorsMovies::Table, ActorsMovies::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_actors_movies_actor")
                            .from(ActorsMovies::Table, ActorsMovies::ActorId)
                            .to(Actors::Table, Actors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ActorsMovies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(GenresMovies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    InTheaters,
    ReleaseDate,
    Poster,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Actors {
    Table,
    Id,
    Name,
    DateOfBirth,
    Picture,
}

#[derive(DeriveIden)]
enum GenresMovies {
    Table,
    MovieId,
    GenreId,
}

#[derive(DeriveIden)]
enum ActorsMovies {
    Table,
    MovieId,
    ActorId,
    Character,
    Order,
}
