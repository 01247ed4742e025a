//! Create scheduler_jobs table (persistent job registry)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SchedulerJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SchedulerJobs::Id)
                            .string_len(50)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SchedulerJobs::JobName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchedulerJobs::Trigger)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchedulerJobs::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SchedulerJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SchedulerJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SchedulerJobs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SchedulerJobs {
    Table,
    Id,
    JobName,
    Trigger,
    Enabled,
    CreatedAt,
    UpdatedAt,
}
