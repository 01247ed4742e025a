//! Create energy_price_points table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EnergyPricePoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnergyPricePoints::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::AreaCode)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::DataType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::BusinessType)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::PriceAmount)
                            .decimal_len(15, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::CurrencyUnitName)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::PriceMeasureUnitName)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnergyPricePoints::AuctionType).string_len(10))
                    .col(
                        ColumnDef::new(EnergyPricePoints::ContractMarketAgreementType)
                            .string_len(10),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::DataSource)
                            .string_len(20)
                            .not_null()
                            .default("entsoe"),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::DocumentMrid)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnergyPricePoints::RevisionNumber).integer())
                    .col(
                        ColumnDef::new(EnergyPricePoints::DocumentCreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::TimeSeriesMrid)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::Resolution)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnergyPricePoints::CurveType).string_len(10))
                    .col(
                        ColumnDef::new(EnergyPricePoints::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnergyPricePoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(EnergyPricePoints::Timestamp)
                            .col(EnergyPricePoints::AreaCode)
                            .col(EnergyPricePoints::DataType)
                            .col(EnergyPricePoints::BusinessType),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_energy_price_timestamp_area")
                    .table(EnergyPricePoints::Table)
                    .col(EnergyPricePoints::Timestamp)
                    .col(EnergyPricePoints::AreaCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_energy_price_type_timestamp")
                    .table(EnergyPricePoints::Table)
                    .col(EnergyPricePoints::DataType)
                    .col(EnergyPricePoints::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_energy_price_area_type_timestamp")
                    .table(EnergyPricePoints::Table)
                    .col(EnergyPricePoints::AreaCode)
                    .col(EnergyPricePoints::DataType)
                    .col(EnergyPricePoints::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_energy_price_document_mrid")
                    .table(EnergyPricePoints::Table)
                    .col(EnergyPricePoints::DocumentMrid)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnergyPricePoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum EnergyPricePoints {
    Table,
    Timestamp,
    AreaCode,
    DataType,
    BusinessType,
    PriceAmount,
    CurrencyUnitName,
    PriceMeasureUnitName,
    AuctionType,
    ContractMarketAgreementType,
    DataSource,
    DocumentMrid,
    RevisionNumber,
    DocumentCreatedAt,
    TimeSeriesMrid,
    Resolution,
    CurveType,
    Position,
    PeriodStart,
    PeriodEnd,
    CreatedAt,
    UpdatedAt,
}
