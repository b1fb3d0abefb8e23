use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000001_create_products_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::ProductNumber).string_len(64).null())
                    .col(
                        ColumnDef::new(Products::ProductName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Products::CarName).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Products::ModelNumber)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Products::Type)
                            .string_len(128)
                            .not_null()
                            .default("Other"),
                    )
                    .col(
                        ColumnDef::new(Products::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::OriginalQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::PriceIqd)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::WholesalePriceIqd)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Products::Status).string_len(20).not_null())
                    .col(ColumnDef::new(Products::Image).string_len(1024).null())
                    .col(ColumnDef::new(Products::LastUpdate).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Products::MessageId).big_integer().null())
                    .to_owned(),
            )
            .await?;

        // Unique across non-NULL product numbers.
        manager
            .create_index(
                Index::create()
                    .name("idx_products_product_number")
                    .table(Products::Table)
                    .col(Products::ProductNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_last_update")
                    .table(Products::Table)
                    .col(Products::LastUpdate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_type")
                    .table(Products::Table)
                    .col(Products::Type)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_car_name")
                    .table(Products::Table)
                    .col(Products::CarName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    Id,
    ProductNumber,
    ProductName,
    CarName,
    ModelNumber,
    Type,
    Quantity,
    OriginalQuantity,
    PriceIqd,
    WholesalePriceIqd,
    Status,
    Image,
    LastUpdate,
    MessageId,
}
