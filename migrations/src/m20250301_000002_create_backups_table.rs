use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000002_create_backups_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Backups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Backups::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Backups::Filename).string_len(255).not_null())
                    .col(ColumnDef::new(Backups::Data).text().not_null())
                    .col(ColumnDef::new(Backups::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(
                        ColumnDef::new(Backups::TotalProducts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Backups::Type).string_len(16).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_backups_created_at")
                    .table(Backups::Table)
                    .col(Backups::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Backups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Backups {
    Table,
    Id,
    Filename,
    Data,
    CreatedAt,
    TotalProducts,
    Type,
}
