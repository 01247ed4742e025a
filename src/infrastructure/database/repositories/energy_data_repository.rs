//! SeaORM implementation of EnergyDataRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::debug;

use crate::domain::repositories::{DataResult, EnergyDataRepository, PointFilter, PointKey};
use crate::infrastructure::database::entities::energy_data_point::{self, EnergyDataType};
use crate::shared::errors::DataAccessError;

const MODEL: &str = "EnergyDataPoint";

pub struct SeaOrmEnergyDataRepository {
    db: DatabaseConnection,
}

impl SeaOrmEnergyDataRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// Audit columns are stamped here; the transformer's placeholder values
// never reach the database.
fn to_active_model(p: energy_data_point::Model) -> energy_data_point::ActiveModel {
    let now = Utc::now();
    energy_data_point::ActiveModel {
        timestamp: Set(p.timestamp),
        area_code: Set(p.area_code),
        data_type: Set(p.data_type),
        business_type: Set(p.business_type),
        quantity: Set(p.quantity),
        unit: Set(p.unit),
        data_source: Set(p.data_source),
        document_mrid: Set(p.document_mrid),
        revision_number: Set(p.revision_number),
        document_created_at: Set(p.document_created_at),
        time_series_mrid: Set(p.time_series_mrid),
        resolution: Set(p.resolution),
        curve_type: Set(p.curve_type),
        object_aggregation: Set(p.object_aggregation),
        position: Set(p.position),
        period_start: Set(p.period_start),
        period_end: Set(p.period_end),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn query_err(
    operation: &'static str,
    context: impl Into<String>,
) -> impl FnOnce(sea_orm::DbErr) -> DataAccessError {
    let context = context.into();
    move |source| DataAccessError::Query {
        model_type: MODEL,
        operation,
        context,
        source,
    }
}

#[async_trait]
impl EnergyDataRepository for SeaOrmEnergyDataRepository {
    async fn upsert_batch(&self, points: Vec<energy_data_point::Model>) -> DataResult<usize> {
        if points.is_empty() {
            return Ok(0);
        }
        let batch_size = points.len();
        debug!(batch_size, "Upserting energy data points");

        let models: Vec<energy_data_point::ActiveModel> =
            points.into_iter().map(to_active_model).collect();

        energy_data_point::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    energy_data_point::Column::Timestamp,
                    energy_data_point::Column::AreaCode,
                    energy_data_point::Column::DataType,
                    energy_data_point::Column::BusinessType,
                ])
                .update_columns([
                    energy_data_point::Column::Quantity,
                    energy_data_point::Column::Unit,
                    energy_data_point::Column::DataSource,
                    energy_data_point::Column::DocumentMrid,
                    energy_data_point::Column::RevisionNumber,
                    energy_data_point::Column::DocumentCreatedAt,
                    energy_data_point::Column::TimeSeriesMrid,
                    energy_data_point::Column::Resolution,
                    energy_data_point::Column::CurveType,
                    energy_data_point::Column::ObjectAggregation,
                    energy_data_point::Column::Position,
                    energy_data_point::Column::PeriodStart,
                    energy_data_point::Column::PeriodEnd,
                    energy_data_point::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|source| DataAccessError::BatchUpsert {
                model_type: MODEL,
                batch_size,
                source,
            })?;

        Ok(batch_size)
    }

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &PointFilter,
    ) -> DataResult<Vec<energy_data_point::Model>> {
        let mut query = energy_data_point::Entity::find()
            .filter(energy_data_point::Column::Timestamp.gte(start))
            .filter(energy_data_point::Column::Timestamp.lte(end));

        if let Some(areas) = &filter.area_codes {
            query = query.filter(energy_data_point::Column::AreaCode.is_in(areas.iter().cloned()));
        }
        if let Some(types) = &filter.data_types {
            query = query.filter(energy_data_point::Column::DataType.is_in(types.iter().copied()));
        }
        if let Some(business) = &filter.business_types {
            query = query
                .filter(energy_data_point::Column::BusinessType.is_in(business.iter().cloned()));
        }

        query
            .order_by_asc(energy_data_point::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(query_err(
                "get_by_time_range",
                format!("{start}..{end}"),
            ))
    }

    async fn get_latest_for_area_and_type(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
    ) -> DataResult<Option<energy_data_point::Model>> {
        energy_data_point::Entity::find()
            .filter(energy_data_point::Column::AreaCode.eq(area_code))
            .filter(energy_data_point::Column::DataType.eq(data_type))
            .order_by_desc(energy_data_point::Column::Timestamp)
            .one(&self.db)
            .await
            .map_err(query_err(
                "get_latest_for_area_and_type",
                format!("{area_code}/{data_type}"),
            ))
    }

    async fn get_latest_for_area(
        &self,
        area_code: &str,
        data_type: EnergyDataType,
        business_type: &str,
    ) -> DataResult<Option<energy_data_point::Model>> {
        energy_data_point::Entity::find()
            .filter(energy_data_point::Column::AreaCode.eq(area_code))
            .filter(energy_data_point::Column::DataType.eq(data_type))
            .filter(energy_data_point::Column::BusinessType.eq(business_type))
            .order_by_desc(energy_data_point::Column::Timestamp)
            .one(&self.db)
            .await
            .map_err(query_err(
                "get_latest_for_area",
                format!("{area_code}/{data_type}/{business_type}"),
            ))
    }

    async fn get_by_area(
        &self,
        area_code: &str,
        data_type: Option<EnergyDataType>,
        limit: Option<u64>,
    ) -> DataResult<Vec<energy_data_point::Model>> {
        let mut query = energy_data_point::Entity::find()
            .filter(energy_data_point::Column::AreaCode.eq(area_code));

        if let Some(data_type) = data_type {
            query = query.filter(energy_data_point::Column::DataType.eq(data_type));
        }

        query = query.order_by_desc(energy_data_point::Column::Timestamp);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(&self.db)
            .await
            .map_err(query_err("get_by_area", area_code.to_string()))
    }

    async fn get_by_id(&self, key: &PointKey) -> DataResult<Option<energy_data_point::Model>> {
        energy_data_point::Entity::find_by_id((
            key.timestamp,
            key.area_code.clone(),
            key.data_type,
            key.business_type.clone(),
        ))
        .one(&self.db)
        .await
        .map_err(query_err("get_by_id", format!("{key:?}")))
    }

    async fn delete(&self, key: &PointKey) -> DataResult<bool> {
        let result = energy_data_point::Entity::delete_many()
            .filter(energy_data_point::Column::Timestamp.eq(key.timestamp))
            .filter(energy_data_point::Column::AreaCode.eq(key.area_code.clone()))
            .filter(energy_data_point::Column::DataType.eq(key.data_type))
            .filter(energy_data_point::Column::BusinessType.eq(key.business_type.clone()))
            .exec(&self.db)
            .await
            .map_err(query_err("delete", format!("{key:?}")))?;
        Ok(result.rows_affected > 0)
    }
}
