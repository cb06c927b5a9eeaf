// ============================================================================
// MODEL : PASSWORD RESET TOKENS
// ============================================================================
//
// Description:
//   Single-use tokens issued once a user has answered their security
//   question correctly.
//
// Workflow:
//   1. POST /api/auth/recovery/start  {dni}          -> security question
//   2. POST /api/auth/recovery/answer {dni, answer}  -> token (this table)
//   3. POST /api/auth/recovery/reset  {token, new_password}
//   4. Backend checks: token exists, not expired, not used
//   5. Backend changes the password and sets used = true
//
// Notes:
//   - A token can only be used once (used = true)
//   - Token expires after 1 hour
//   - Token is a UUID v4
//   - ON DELETE CASCADE: deleting the user deletes its tokens
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_reset_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub token: String,

    pub expires_at: DateTime,

    pub used: bool,

    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
