use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Visible to everyone, including anonymous visitors.
pub const PERMISSION_ALL: &str = "ALL";

/// A file uploaded into a challenge's public project folder.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub challenge_id: i32,
    #[sea_orm(belongs_to, from = "challenge_id", to = "id")]
    pub challenge: HasOne<super::challenge::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Stored filename, relative to the public folder.
    pub title: String,
    pub permission_lvl: String,
    pub content_type: Option<String>,
    pub size: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
