//! SeaORM implementation of BackfillProgressRepository
//!
//! The update-by-id path always queries a fresh record in the current
//! session and applies field deltas there; stale instances never cross
//! transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder,
};
use tracing::debug;

use crate::domain::repositories::{BackfillProgressRepository, DataResult, ProgressUpdate};
use crate::infrastructure::database::entities::backfill_progress::{
    self, progress_percentage, BackfillStatus,
};
use crate::shared::errors::DataAccessError;

const MODEL: &str = "BackfillProgress";

pub struct SeaOrmBackfillProgressRepository {
    db: DatabaseConnection,
}

impl SeaOrmBackfillProgressRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
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
impl BackfillProgressRepository for SeaOrmBackfillProgressRepository {
    async fn create(
        &self,
        progress: backfill_progress::Model,
    ) -> DataResult<backfill_progress::Model> {
        debug!(
            area = %progress.area_code,
            endpoint = %progress.endpoint_name,
            "Creating backfill progress record"
        );
        let now = Utc::now();
        let model = backfill_progress::ActiveModel {
            id: NotSet,
            area_code: Set(progress.area_code),
            endpoint_name: Set(progress.endpoint_name),
            period_start: Set(progress.period_start),
            period_end: Set(progress.period_end),
            status: Set(progress.status),
            progress_percentage: Set(progress.progress_percentage),
            current_chunk_start: Set(progress.current_chunk_start),
            current_chunk_end: Set(progress.current_chunk_end),
            total_chunks: Set(progress.total_chunks),
            completed_chunks: Set(progress.completed_chunks),
            failed_chunks: Set(progress.failed_chunks),
            total_data_points: Set(progress.total_data_points),
            last_error: Set(progress.last_error),
            started_at: Set(progress.started_at),
            completed_at: Set(progress.completed_at),
            estimated_completion: Set(progress.estimated_completion),
            chunk_size_days: Set(progress.chunk_size_days),
            rate_limit_delay: Set(progress.rate_limit_delay),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model
            .insert(&self.db)
            .await
            .map_err(query_err("create", "insert"))
    }

    async fn get_by_id(&self, id: i32) -> DataResult<Option<backfill_progress::Model>> {
        backfill_progress::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_err("get_by_id", id.to_string()))
    }

    async fn update(&self, progress: &backfill_progress::Model) -> DataResult<()> {
        let model = backfill_progress::ActiveModel {
            id: Set(progress.id),
            area_code: Set(progress.area_code.clone()),
            endpoint_name: Set(progress.endpoint_name.clone()),
            period_start: Set(progress.period_start),
            period_end: Set(progress.period_end),
            status: Set(progress.status),
            progress_percentage: Set(progress.progress_percentage),
            current_chunk_start: Set(progress.current_chunk_start),
            current_chunk_end: Set(progress.current_chunk_end),
            total_chunks: Set(progress.total_chunks),
            completed_chunks: Set(progress.completed_chunks),
            failed_chunks: Set(progress.failed_chunks),
            total_data_points: Set(progress.total_data_points),
            last_error: Set(progress.last_error.clone()),
            started_at: Set(progress.started_at),
            completed_at: Set(progress.completed_at),
            estimated_completion: Set(progress.estimated_completion),
            chunk_size_days: Set(progress.chunk_size_days),
            rate_limit_delay: Set(progress.rate_limit_delay),
            created_at: Set(progress.created_at),
            updated_at: Set(Utc::now()),
        };
        model
            .update(&self.db)
            .await
            .map_err(query_err("update", progress.id.to_string()))?;
        Ok(())
    }

    async fn get_active(&self) -> DataResult<Vec<backfill_progress::Model>> {
        backfill_progress::Entity::find()
            .filter(
                backfill_progress::Column::Status
                    .is_in([BackfillStatus::Pending, BackfillStatus::InProgress]),
            )
            .order_by_desc(backfill_progress::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(query_err("get_active", "pending|in_progress"))
    }

    async fn get_resumable(&self) -> DataResult<Vec<backfill_progress::Model>> {
        backfill_progress::Entity::find()
            .filter(
                backfill_progress::Column::Status
                    .is_in([BackfillStatus::Failed, BackfillStatus::Pending]),
            )
            .filter(backfill_progress::Column::CompletedChunks.gt(0))
            .order_by_desc(backfill_progress::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(query_err("get_resumable", "failed|pending"))
    }

    async fn get_by_area_endpoint(
        &self,
        area_code: &str,
        endpoint_name: &str,
    ) -> DataResult<Vec<backfill_progress::Model>> {
        backfill_progress::Entity::find()
            .filter(backfill_progress::Column::AreaCode.eq(area_code))
            .filter(backfill_progress::Column::EndpointName.eq(endpoint_name))
            .order_by_desc(backfill_progress::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(query_err(
                "get_by_area_endpoint",
                format!("{area_code}/{endpoint_name}"),
            ))
    }

    async fn get_by_area_endpoint_period(
        &self,
        area_code: &str,
        endpoint_name: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> DataResult<Option<backfill_progress::Model>> {
        backfill_progress::Entity::find()
            .filter(backfill_progress::Column::AreaCode.eq(area_code))
            .filter(backfill_progress::Column::EndpointName.eq(endpoint_name))
            .filter(backfill_progress::Column::PeriodStart.eq(period_start))
            .filter(backfill_progress::Column::PeriodEnd.eq(period_end))
            .one(&self.db)
            .await
            .map_err(query_err(
                "get_by_area_endpoint_period",
                format!("{area_code}/{endpoint_name} {period_start}..{period_end}"),
            ))
    }

    async fn update_progress_by_id(
        &self,
        id: i32,
        update: ProgressUpdate,
    ) -> DataResult<backfill_progress::Model> {
        let current = backfill_progress::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(query_err("update_progress_by_id", id.to_string()))?
            .ok_or(DataAccessError::NotFound {
                model_type: MODEL,
                id: id.to_string(),
            })?;

        let total_chunks = current.total_chunks;
        let completed = update.completed_chunks.unwrap_or(current.completed_chunks);

        let mut model: backfill_progress::ActiveModel = current.into();
        if let Some(status) = update.status {
            model.status = Set(status);
        }
        if let Some(completed_chunks) = update.completed_chunks {
            model.completed_chunks = Set(completed_chunks);
        }
        if let Some(failed_chunks) = update.failed_chunks {
            model.failed_chunks = Set(failed_chunks);
        }
        if let Some(total_data_points) = update.total_data_points {
            model.total_data_points = Set(total_data_points);
        }
        if let Some(current_chunk_start) = update.current_chunk_start {
            model.current_chunk_start = Set(current_chunk_start);
        }
        if let Some(current_chunk_end) = update.current_chunk_end {
            model.current_chunk_end = Set(current_chunk_end);
        }
        if let Some(started_at) = update.started_at {
            model.started_at = Set(Some(started_at));
        }
        if let Some(completed_at) = update.completed_at {
            model.completed_at = Set(Some(completed_at));
        }
        if let Some(estimated_completion) = update.estimated_completion {
            model.estimated_completion = Set(estimated_completion);
        }
        if let Some(last_error) = update.last_error {
            model.last_error = Set(last_error);
        }
        model.progress_percentage = Set(update
            .progress_percentage
            .unwrap_or_else(|| progress_percentage(completed, total_chunks)));
        model.updated_at = Set(Utc::now());

        model
            .update(&self.db)
            .await
            .map_err(query_err("update_progress_by_id", id.to_string()))
    }

    async fn delete(&self, id: i32) -> DataResult<bool> {
        let result = backfill_progress::Entity::delete_many()
            .filter(backfill_progress::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(query_err("delete", id.to_string()))?;
        Ok(result.rows_affected > 0)
    }
}
