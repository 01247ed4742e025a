//! Create energy_data_points table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EnergyDataPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnergyDataPoints::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::AreaCode)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::DataType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::BusinessType)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::Quantity)
                            .decimal_len(15, 3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::Unit)
                            .string_len(10)
                            .not_null()
                            .default("MAW"),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::DataSource)
                            .string_len(20)
                            .not_null()
                            .default("entsoe"),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::DocumentMrid)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnergyDataPoints::RevisionNumber).integer())
                    .col(
                        ColumnDef::new(EnergyDataPoints::DocumentCreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::TimeSeriesMrid)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::Resolution)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::CurveType)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::ObjectAggregation)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnergyDataPoints::Position).integer().not_null())
                    .col(
                        ColumnDef::new(EnergyDataPoints::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyDataPoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(EnergyDataPoints::Timestamp)
                            .col(EnergyDataPoints::AreaCode)
                            .col(EnergyDataPoints::DataType)
                            .col(EnergyDataPoints::BusinessType),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_energy_data_timestamp_area")
                    .table(EnergyDataPoints::Table)
                    .col(EnergyDataPoints::Timestamp)
                    .col(EnergyDataPoints::AreaCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_energy_data_type_timestamp")
                    .table(EnergyDataPoints::Table)
                    .col(EnergyDataPoints::DataType)
                    .col(EnergyDataPoints::Timestamp)
                    .to_owned(),
            )
            .await?;

        // Gap detection hits this one on every collection cycle
        manager
            .create_index(
                Index::create()
                    .name("ix_energy_data_area_type_timestamp")
                    .table(EnergyDataPoints::Table)
                    .col(EnergyDataPoints::AreaCode)
                    .col(EnergyDataPoints::DataType)
                    .col(EnergyDataPoints::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_energy_data_document_mrid")
                    .table(EnergyDataPoints::Table)
                    .col(EnergyDataPoints::DocumentMrid)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnergyDataPoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum EnergyDataPoints {
    Table,
    Timestamp,
    AreaCode,
    DataType,
    BusinessType,
    Quantity,
    Unit,
    DataSource,
    DocumentMrid,
    RevisionNumber,
    DocumentCreatedAt,
    TimeSeriesMrid,
    Resolution,
    CurveType,
    ObjectAggregation,
    Position,
    PeriodStart,
    PeriodEnd,
    CreatedAt,
    UpdatedAt,
}
