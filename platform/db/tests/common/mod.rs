#![allow(dead_code)]

use migration::{Migrator, MigratorTrait};
use platform_db::{
    DbPool,
    users::{NewUser, create_user},
};
use sea_orm::{ConnectionTrait, Database, DbErr};

pub async fn setup_db() -> Result<DbPool, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn seed_user(db: &DbPool, name: &str) -> entity::users::Model {
    create_user(
        db,
        NewUser {
            name: name.to_owned(),
            email: format!("{name}@example.com"),
            password: Some(format!("{name}-password")),
            ..Default::default()
        },
    )
    .await
    .expect("seed user")
}
