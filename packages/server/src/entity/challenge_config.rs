use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-challenge evaluation settings. At most one row per challenge.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "evaluation_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub challenge_id: i32,
    #[sea_orm(belongs_to, from = "challenge_id", to = "id")]
    pub challenge: HasOne<super::challenge::Entity>,

    pub score_title: String,
    /// Dot-separated path of the ranking score inside `result.metrics`.
    pub score_jsonpath: String,
    /// One of: ascending, descending
    pub score_default_sort: String,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
