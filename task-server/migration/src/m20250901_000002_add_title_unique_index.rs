use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const TITLE_UNIQUE_INDEX: &str = "idx_tasks_title_unique";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Titles identify tasks for duplicate detection, so they are unique.
        manager
            .create_index(
                Index::create()
                    .name(TITLE_UNIQUE_INDEX)
                    .table(Tasks::Table)
                    .col(Tasks::Title)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(TITLE_UNIQUE_INDEX)
                    .table(Tasks::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Title,
}
