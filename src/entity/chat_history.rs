use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chat_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_message: String,
    pub ai_response: String,
    pub timestamp: String,
}

impl ActiveModelBehavior for ActiveModel {}
