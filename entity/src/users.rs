use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, Condition, QueryOrder, entity::prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    constants::{Role, Sex, Status},
    current_time,
    denormalized::IdSet,
    password::{HashedPassword, PasswordError},
    works,
};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(Some(64))")]
    pub name: String,
    #[sea_orm(unique, column_type = "String(Some(64))")]
    pub email: String,
    #[sea_orm(column_type = "String(Some(64))")]
    pub phone: String,
    pub sex_code: Sex,
    #[sea_orm(column_type = "String(Some(64))")]
    pub url: String,
    pub deposit: Decimal,
    #[sea_orm(column_type = "String(Some(64))")]
    pub location: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub activation_key: Option<String>,
    pub create_at: DateTimeWithTimeZone,
    pub update_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub avatar: Option<String>,
    #[serde(skip_serializing)]
    #[sea_orm(column_type = "String(Some(200))", nullable)]
    pub password: Option<HashedPassword>,
    pub role_code: Role,
    pub status_code: Status,
    #[sea_orm(column_type = "Text", nullable)]
    pub followers: IdSet,
    #[sea_orm(column_type = "Text", nullable)]
    pub following: IdSet,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::works::Entity")]
    Works,
}

impl Related<super::works::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Works.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            phone: Set(String::new()),
            sex_code: Set(Sex::default()),
            url: Set(String::new()),
            deposit: Set(Decimal::ZERO),
            location: Set(String::new()),
            bio: Set(Some(String::new())),
            create_at: Set(current_time()),
            role_code: Set(Role::default()),
            status_code: Set(Status::default()),
            followers: Set(IdSet::new()),
            following: Set(IdSet::new()),
            ..<Self as ActiveModelTrait>::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.update_at = Set(Some(current_time()));
        }
        Ok(self)
    }
}

impl Model {
    pub fn sex(&self) -> &'static str {
        self.sex_code.label()
    }

    pub fn role(&self) -> &'static str {
        self.role_code.label()
    }

    pub fn is_admin(&self) -> bool {
        self.role_code == Role::Admin
    }

    pub fn status(&self) -> &'static str {
        self.status_code.label()
    }

    pub fn set_password(&mut self, plain: &str) -> Result<(), PasswordError> {
        self.password = Some(HashedPassword::new(plain)?);
        Ok(())
    }

    pub fn check_password(&self, plain: &str) -> bool {
        self.password
            .as_ref()
            .is_some_and(|hash| hash.verify(plain))
    }

    /// Replaces the activation key with a fresh random one and returns it.
    pub fn issue_activation_key(&mut self) -> String {
        let key = Uuid::new_v4().simple().to_string();
        self.activation_key = Some(key.clone());
        key
    }

    /// Work history, most recent first.
    pub fn works_query(&self) -> Select<works::Entity> {
        works::Entity::find()
            .filter(works::Column::UserId.eq(self.id))
            .order_by_desc(works::Column::FromWhen)
    }
}

impl Entity {
    /// Users whose name or email equals `login`.
    pub fn find_by_login(login: &str) -> Select<Entity> {
        Self::find().filter(
            Condition::any()
                .add(Column::Name.eq(login))
                .add(Column::Email.eq(login)),
        )
    }

    /// Users other than `user_id` already holding `name`.
    pub fn find_name_holders(name: &str, user_id: i32) -> Select<Entity> {
        Self::find()
            .filter(Column::Name.eq(name))
            .filter(Column::Id.ne(user_id))
    }
}
