use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_QUEUED: &str = "queued";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub submission_id: Uuid,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    pub method_id: Uuid,
    #[sea_orm(belongs_to, from = "method_id", to = "id")]
    pub method: HasOne<super::method::Entity>,

    /// One of: queued, started, succeeded, failed
    pub status: String,
    pub output: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
