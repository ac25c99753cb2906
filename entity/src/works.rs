use sea_orm::{ActiveValue::Set, entity::prelude::*};
use serde::Serialize;

use crate::current_time;

/// One employment period in a user's history.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "works")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub from_when: DateTimeWithTimeZone,
    pub to_when: DateTimeWithTimeZone,
    #[sea_orm(column_type = "String(Some(50))")]
    pub company: String,
    pub job_type: i16,
    pub job_title: i16,
    #[sea_orm(column_type = "String(Some(1000))")]
    pub description: String,
    #[sea_orm(indexed)]
    pub user_id: i32,
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

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            to_when: Set(current_time()),
            company: Set(String::new()),
            job_type: Set(0),
            job_title: Set(0),
            description: Set(String::new()),
            ..<Self as ActiveModelTrait>::default()
        }
    }
}
