use entity::{
    constants::{COMPANY_LEN, WORK_DESCRIPTION_LEN},
    users, works,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    prelude::DateTimeWithTimeZone,
};
use tracing::{info, instrument};

use crate::{DbError, DbResult, users::get_by_id};

#[derive(Clone, Debug)]
pub struct NewWork {
    pub from_when: DateTimeWithTimeZone,
    /// Defaults to now.
    pub to_when: Option<DateTimeWithTimeZone>,
    pub company: String,
    pub job_type: i16,
    pub job_title: i16,
    pub description: String,
}

impl NewWork {
    pub fn starting(from_when: DateTimeWithTimeZone) -> Self {
        Self {
            from_when,
            to_when: None,
            company: String::new(),
            job_type: 0,
            job_title: 0,
            description: String::new(),
        }
    }
}

#[instrument(skip(db, work))]
pub async fn add_work<C>(db: &C, user_id: i32, work: NewWork) -> DbResult<works::Model>
where
    C: ConnectionTrait,
{
    get_by_id(db, user_id).await?;
    if work.company.chars().count() > COMPANY_LEN as usize {
        return Err(DbError::InvalidInput(format!(
            "company exceeds {COMPANY_LEN} characters"
        )));
    }
    if work.description.chars().count() > WORK_DESCRIPTION_LEN as usize {
        return Err(DbError::InvalidInput(format!(
            "description exceeds {WORK_DESCRIPTION_LEN} characters"
        )));
    }
    if matches!(work.to_when, Some(to_when) if to_when < work.from_when) {
        return Err(DbError::InvalidInput(
            "work period ends before it starts".into(),
        ));
    }

    let mut active = works::ActiveModel {
        from_when: Set(work.from_when),
        company: Set(work.company),
        job_type: Set(work.job_type),
        job_title: Set(work.job_title),
        description: Set(work.description),
        user_id: Set(user_id),
        ..Default::default()
    };
    if let Some(to_when) = work.to_when {
        active.to_when = Set(to_when);
    }
    let work = active.insert(db).await?;
    info!(work_id = work.id, "work added");
    Ok(work)
}

/// A user's works, most recent first.
pub async fn works_of<C>(db: &C, user: &users::Model) -> DbResult<Vec<works::Model>>
where
    C: ConnectionTrait,
{
    Ok(user.works_query().all(db).await?)
}

/// Deletes a work, refusing works owned by someone else.
#[instrument(skip(db))]
pub async fn delete_work<C>(db: &C, user_id: i32, work_id: i32) -> DbResult<()>
where
    C: ConnectionTrait,
{
    let deleted = works::Entity::delete_many()
        .filter(works::Column::Id.eq(work_id))
        .filter(works::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(DbError::not_found("work", work_id));
    }
    info!("work deleted");
    Ok(())
}
