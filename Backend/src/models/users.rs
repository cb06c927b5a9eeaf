use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Format: pbkdf2:sha256:iterations$salt$hash
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[sea_orm(unique)]
    pub dni: Option<String>,
    pub security_question_id: Option<i32>,
    #[serde(skip_serializing)]
    pub security_answer_hash: Option<String>, // same format, over the trimmed lower-cased answer
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime,
}

impl Model {
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::security_question::Entity",
        from = "Column::SecurityQuestionId",
        to = "super::security_question::Column::Id"
    )]
    SecurityQuestion,
}

impl Related<super::security_question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SecurityQuestion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
