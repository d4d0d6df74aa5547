use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challenge")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// URL-safe name; also names the project folder on disk.
    #[sea_orm(unique)]
    pub short_name: String,
    pub title: String,

    pub creator_id: i32,
    #[sea_orm(belongs_to, from = "creator_id", to = "id")]
    pub creator: HasOne<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
