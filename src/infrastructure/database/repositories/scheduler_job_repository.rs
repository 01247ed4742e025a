//! SeaORM implementation of SchedulerJobRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder};

use crate::domain::repositories::{DataResult, SchedulerJobRepository};
use crate::infrastructure::database::entities::scheduler_job;
use crate::shared::errors::DataAccessError;

const MODEL: &str = "SchedulerJob";

pub struct SeaOrmSchedulerJobRepository {
    db: DatabaseConnection,
}

impl SeaOrmSchedulerJobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SchedulerJobRepository for SeaOrmSchedulerJobRepository {
    async fn upsert(&self, job: scheduler_job::Model) -> DataResult<()> {
        let now = Utc::now();
        let job_id = job.id.clone();
        let model = scheduler_job::ActiveModel {
            id: Set(job.id),
            job_name: Set(job.job_name),
            trigger: Set(job.trigger),
            enabled: Set(job.enabled),
            created_at: Set(now),
            updated_at: Set(now),
        };
        scheduler_job::Entity::insert(model)
            .on_conflict(
                OnConflict::column(scheduler_job::Column::Id)
                    .update_columns([
                        scheduler_job::Column::JobName,
                        scheduler_job::Column::Trigger,
                        scheduler_job::Column::Enabled,
                        scheduler_job::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|source| DataAccessError::Query {
                model_type: MODEL,
                operation: "upsert",
                context: job_id,
                source,
            })?;
        Ok(())
    }

    async fn get_all(&self) -> DataResult<Vec<scheduler_job::Model>> {
        scheduler_job::Entity::find()
            .order_by_asc(scheduler_job::Column::Id)
            .all(&self.db)
            .await
            .map_err(|source| DataAccessError::Query {
                model_type: MODEL,
                operation: "get_all",
                context: String::new(),
                source,
            })
    }
}
