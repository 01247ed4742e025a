//! Persistent scheduler job registry.
//!
//! Rows are upserted by job id every time the scheduler starts, so the
//! registry survives restarts and re-registration is idempotent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduler_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub job_name: String,

    /// Human-readable trigger description ("every 15m", "daily at 02:30 UTC")
    pub trigger: String,

    pub enabled: bool,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
