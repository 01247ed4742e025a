//! Create backfill_progress table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BackfillProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BackfillProgress::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::AreaCode)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::EndpointName)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::ProgressPercentage)
                            .decimal_len(5, 2)
                            .not_null()
                            .default("0.00"),
                    )
                    .col(ColumnDef::new(BackfillProgress::CurrentChunkStart).timestamp_with_time_zone())
                    .col(ColumnDef::new(BackfillProgress::CurrentChunkEnd).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(BackfillProgress::TotalChunks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::CompletedChunks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::FailedChunks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::TotalDataPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(BackfillProgress::LastError).text())
                    .col(ColumnDef::new(BackfillProgress::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(BackfillProgress::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(BackfillProgress::EstimatedCompletion)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::ChunkSizeDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::RateLimitDelay)
                            .decimal_len(4, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BackfillProgress::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_backfill_progress_area_endpoint")
                    .table(BackfillProgress::Table)
                    .col(BackfillProgress::AreaCode)
                    .col(BackfillProgress::EndpointName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_backfill_progress_status")
                    .table(BackfillProgress::Table)
                    .col(BackfillProgress::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BackfillProgress::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum BackfillProgress {
    Table,
    Id,
    AreaCode,
    EndpointName,
    PeriodStart,
    PeriodEnd,
    Status,
    ProgressPercentage,
    CurrentChunkStart,
    CurrentChunkEnd,
    TotalChunks,
    CompletedChunks,
    FailedChunks,
    TotalDataPoints,
    LastError,
    StartedAt,
    CompletedAt,
    EstimatedCompletion,
    ChunkSizeDays,
    RateLimitDelay,
    CreatedAt,
    UpdatedAt,
}
