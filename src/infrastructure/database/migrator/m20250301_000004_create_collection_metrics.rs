//! Create collection_metrics table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CollectionMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CollectionMetrics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::JobId)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::AreaCode)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::DataType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::CollectionStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::CollectionEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::PointsCollected)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::Success)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(CollectionMetrics::ErrorMessage).text())
                    .col(ColumnDef::new(CollectionMetrics::ApiResponseTime).double())
                    .col(ColumnDef::new(CollectionMetrics::ProcessingTime).double())
                    .col(
                        ColumnDef::new(CollectionMetrics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CollectionMetrics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_collection_metrics_time_range")
                    .table(CollectionMetrics::Table)
                    .col(CollectionMetrics::CollectionStart)
                    .col(CollectionMetrics::CollectionEnd)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_collection_metrics_area_type_time")
                    .table(CollectionMetrics::Table)
                    .col(CollectionMetrics::AreaCode)
                    .col(CollectionMetrics::DataType)
                    .col(CollectionMetrics::CollectionStart)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_collection_metrics_success_time")
                    .table(CollectionMetrics::Table)
                    .col(CollectionMetrics::Success)
                    .col(CollectionMetrics::CollectionStart)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_collection_metrics_job_time")
                    .table(CollectionMetrics::Table)
                    .col(CollectionMetrics::JobId)
                    .col(CollectionMetrics::CollectionStart)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CollectionMetrics::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CollectionMetrics {
    Table,
    Id,
    JobId,
    AreaCode,
    DataType,
    CollectionStart,
    CollectionEnd,
    PointsCollected,
    Success,
    ErrorMessage,
    ApiResponseTime,
    ProcessingTime,
    CreatedAt,
    UpdatedAt,
}
