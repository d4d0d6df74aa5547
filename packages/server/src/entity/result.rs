use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "result")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub challenge_id: i32,
    #[sea_orm(belongs_to, from = "challenge_id", to = "id")]
    pub challenge: HasOne<super::challenge::Entity>,

    /// NULL for results imported without a job.
    pub job_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "job_id", to = "id")]
    pub job: BelongsTo<Option<super::job::Entity>>,

    /// Metrics reported by the evaluator, as a JSON object.
    #[sea_orm(column_type = "JsonBinary")]
    pub metrics: serde_json::Value,
    pub public: bool,
    /// 1-based position in the leaderboard, 0 when unranked.
    pub rank: i32,
    /// Denormalized detail URL, rewritten after every save.
    pub absolute_url: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
