//! SeaORM implementation of CollectionMetricsRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder,
};

use crate::domain::repositories::{CollectionMetricsRepository, DataResult, PerformanceAggregates};
use crate::infrastructure::database::entities::collection_metrics;
use crate::infrastructure::database::entities::energy_data_point::EnergyDataType;
use crate::shared::errors::DataAccessError;

const MODEL: &str = "CollectionMetrics";

pub struct SeaOrmCollectionMetricsRepository {
    db: DatabaseConnection,
}

impl SeaOrmCollectionMetricsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_active_model(m: collection_metrics::Model) -> collection_metrics::ActiveModel {
    let now = Utc::now();
    collection_metrics::ActiveModel {
        id: NotSet,
        job_id: Set(m.job_id),
        area_code: Set(m.area_code),
        data_type: Set(m.data_type),
        collection_start: Set(m.collection_start),
        collection_end: Set(m.collection_end),
        points_collected: Set(m.points_collected),
        success: Set(m.success),
        error_message: Set(m.error_message),
        api_response_time: Set(m.api_response_time),
        processing_time: Set(m.processing_time),
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

/// Fold min/avg/max over the present values of one optional field.
fn fold_aggregate<F>(rows: &[collection_metrics::Model], f: F) -> (Option<f64>, Option<f64>, Option<f64>)
where
    F: Fn(&collection_metrics::Model) -> Option<f64>,
{
    let values: Vec<f64> = rows.iter().filter_map(&f).collect();
    if values.is_empty() {
        return (None, None, None);
    }
    let sum: f64 = values.iter().sum();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (Some(sum / values.len() as f64), Some(min), Some(max))
}

#[async_trait]
impl CollectionMetricsRepository for SeaOrmCollectionMetricsRepository {
    async fn insert(&self, metric: collection_metrics::Model) -> DataResult<()> {
        to_active_model(metric)
            .insert(&self.db)
            .await
            .map_err(query_err("insert", "single"))?;
        Ok(())
    }

    async fn insert_many(&self, metrics: Vec<collection_metrics::Model>) -> DataResult<()> {
        if metrics.is_empty() {
            return Ok(());
        }
        let count = metrics.len();
        let models: Vec<collection_metrics::ActiveModel> =
            metrics.into_iter().map(to_active_model).collect();
        collection_metrics::Entity::insert_many(models)
            .exec(&self.db)
            .await
            .map_err(query_err("insert_many", format!("batch of {count}")))?;
        Ok(())
    }

    async fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        area_codes: Option<&[String]>,
        data_types: Option<&[EnergyDataType]>,
    ) -> DataResult<Vec<collection_metrics::Model>> {
        let mut query = collection_metrics::Entity::find()
            .filter(collection_metrics::Column::CollectionStart.gte(start))
            .filter(collection_metrics::Column::CollectionStart.lte(end));

        if let Some(areas) = area_codes {
            query = query.filter(collection_metrics::Column::AreaCode.is_in(areas.iter().cloned()));
        }
        if let Some(types) = data_types {
            query = query.filter(collection_metrics::Column::DataType.is_in(types.iter().copied()));
        }

        query
            .order_by_asc(collection_metrics::Column::CollectionStart)
            .all(&self.db)
            .await
            .map_err(query_err("get_by_time_range", format!("{start}..{end}")))
    }

    async fn get_recent_metrics(
        &self,
        since: DateTime<Utc>,
    ) -> DataResult<Vec<collection_metrics::Model>> {
        collection_metrics::Entity::find()
            .filter(collection_metrics::Column::CollectionStart.gte(since))
            .order_by_desc(collection_metrics::Column::CollectionStart)
            .all(&self.db)
            .await
            .map_err(query_err("get_recent_metrics", since.to_string()))
    }

    async fn get_metrics_by_job_id(
        &self,
        job_id: &str,
    ) -> DataResult<Vec<collection_metrics::Model>> {
        collection_metrics::Entity::find()
            .filter(collection_metrics::Column::JobId.eq(job_id))
            .order_by_desc(collection_metrics::Column::CollectionStart)
            .all(&self.db)
            .await
            .map_err(query_err("get_metrics_by_job_id", job_id.to_string()))
    }

    async fn get_performance_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<PerformanceAggregates> {
        let rows = collection_metrics::Entity::find()
            .filter(collection_metrics::Column::CollectionStart.gte(start))
            .filter(collection_metrics::Column::CollectionStart.lte(end))
            .all(&self.db)
            .await
            .map_err(query_err(
                "get_performance_metrics",
                format!("{start}..{end}"),
            ))?;

        let (avg_api, min_api, max_api) = fold_aggregate(&rows, |m| m.api_response_time);
        let (avg_proc, min_proc, max_proc) = fold_aggregate(&rows, |m| m.processing_time);

        Ok(PerformanceAggregates {
            avg_api_response_time: avg_api,
            min_api_response_time: min_api,
            max_api_response_time: max_api,
            avg_processing_time: avg_proc,
            min_processing_time: min_proc,
            max_processing_time: max_proc,
        })
    }

    async fn cleanup_old_metrics(&self, cutoff: DateTime<Utc>) -> DataResult<u64> {
        let result = collection_metrics::Entity::delete_many()
            .filter(collection_metrics::Column::CollectionStart.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(query_err("cleanup_old_metrics", cutoff.to_string()))?;
        Ok(result.rows_affected)
    }
}
