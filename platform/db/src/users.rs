use std::collections::BTreeSet;

use entity::{
    HashedPassword,
    constants::{Role, STRING_LEN, Sex, Status},
    users,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, Select, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::{DbError, DbResult, follows};

#[derive(Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
    pub status: Status,
    pub sex: Sex,
}

/// Profile fields to overwrite; `None` leaves a field as it is.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub phone: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub sex: Option<Sex>,
    pub deposit: Option<Decimal>,
}

fn bounded(field: &str, value: &str) -> DbResult<()> {
    if value.chars().count() > STRING_LEN as usize {
        return Err(DbError::InvalidInput(format!(
            "{field} exceeds {STRING_LEN} characters"
        )));
    }
    Ok(())
}

fn required(field: &str, value: &str) -> DbResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DbError::InvalidInput(format!("{field} must not be empty")));
    }
    bounded(field, value)?;
    Ok(value.to_owned())
}

#[instrument(skip(db, new_user), fields(name = %new_user.name))]
pub async fn create_user<C>(db: &C, new_user: NewUser) -> DbResult<users::Model>
where
    C: ConnectionTrait,
{
    let name = required("name", &new_user.name)?;
    let email = required("email", &new_user.email)?;

    let taken = users::Entity::find()
        .filter(users::Column::Name.eq(name.as_str()))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(DbError::Conflict(format!("name {name:?} is already taken")));
    }
    let taken = users::Entity::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(DbError::Conflict(format!(
            "email {email:?} is already registered"
        )));
    }

    let password = new_user
        .password
        .as_deref()
        .map(HashedPassword::new)
        .transpose()?;
    let user = users::ActiveModel {
        name: Set(name),
        email: Set(email),
        password: Set(password),
        role_code: Set(new_user.role),
        status_code: Set(new_user.status),
        sex_code: Set(new_user.sex),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(user_id = user.id, "user created");
    Ok(user)
}

/// Looks a user up by id, failing with [`DbError::NotFound`] when absent.
pub async fn get_by_id<C>(db: &C, id: i32) -> DbResult<users::Model>
where
    C: ConnectionTrait,
{
    users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
}

pub async fn get_by_login<C>(db: &C, login: &str) -> DbResult<users::Model>
where
    C: ConnectionTrait,
{
    users::Entity::find_by_login(login)
        .one(db)
        .await?
        .ok_or_else(|| DbError::not_found("user", login))
}

/// Finds the user by name or email and checks the password.
///
/// An unknown login yields `(None, false)`; a wrong password still returns the
/// matched user alongside `false`.
#[instrument(skip(db, password))]
pub async fn authenticate<C>(
    db: &C,
    login: &str,
    password: &str,
) -> DbResult<(Option<users::Model>, bool)>
where
    C: ConnectionTrait,
{
    let user = users::Entity::find_by_login(login).one(db).await?;
    let authenticated = user
        .as_ref()
        .is_some_and(|user| user.check_password(password));
    if authenticated {
        info!("user authenticated");
    } else {
        warn!(known = user.is_some(), "authentication failed");
    }
    Ok((user, authenticated))
}

/// True when no user other than `user` already holds `name`.
pub async fn check_name_available<C>(db: &C, user: &users::Model, name: &str) -> DbResult<bool>
where
    C: ConnectionTrait,
{
    let holders = users::Entity::find_name_holders(name.trim(), user.id)
        .count(db)
        .await?;
    Ok(holders == 0)
}

pub async fn search<C>(db: &C, keywords: &str) -> DbResult<Vec<users::Model>>
where
    C: ConnectionTrait,
{
    list(db, users::Entity::search(keywords)).await
}

/// Runs a lazily built user query.
pub async fn list<C>(db: &C, query: Select<users::Entity>) -> DbResult<Vec<users::Model>>
where
    C: ConnectionTrait,
{
    Ok(query.all(db).await?)
}

pub async fn following<C>(db: &C, user_id: i32) -> DbResult<Vec<users::Model>>
where
    C: ConnectionTrait,
{
    let user = get_by_id(db, user_id).await?;
    list(db, user.following_query()).await
}

pub async fn followers<C>(db: &C, user_id: i32) -> DbResult<Vec<users::Model>>
where
    C: ConnectionTrait,
{
    let user = get_by_id(db, user_id).await?;
    list(db, user.followers_query()).await
}

#[instrument(skip(db, update))]
pub async fn update_profile<C>(db: &C, id: i32, update: ProfileUpdate) -> DbResult<users::Model>
where
    C: ConnectionTrait,
{
    let mut user = get_by_id(db, id).await?.into_active_model();
    if let Some(phone) = update.phone {
        bounded("phone", &phone)?;
        user.phone = Set(phone);
    }
    if let Some(url) = update.url {
        bounded("url", &url)?;
        user.url = Set(url);
    }
    if let Some(location) = update.location {
        bounded("location", &location)?;
        user.location = Set(location);
    }
    if let Some(avatar) = update.avatar {
        bounded("avatar", &avatar)?;
        user.avatar = Set(Some(avatar));
    }
    if let Some(bio) = update.bio {
        user.bio = Set(Some(bio));
    }
    if let Some(sex) = update.sex {
        user.sex_code = Set(sex);
    }
    if let Some(deposit) = update.deposit {
        user.deposit = Set(deposit);
    }
    let user = user.update(db).await?;
    info!("profile updated");
    Ok(user)
}

#[instrument(skip(db, plain))]
pub async fn set_password<C>(db: &C, id: i32, plain: &str) -> DbResult<users::Model>
where
    C: ConnectionTrait,
{
    let mut user = get_by_id(db, id).await?;
    user.set_password(plain)?;
    let password = user.password.clone();
    let mut active = user.into_active_model();
    active.password = Set(password);
    Ok(active.update(db).await?)
}

/// Stores a fresh activation key on the user and returns it.
#[instrument(skip(db))]
pub async fn issue_activation_key<C>(db: &C, id: i32) -> DbResult<String>
where
    C: ConnectionTrait,
{
    let mut user = get_by_id(db, id).await?;
    let key = user.issue_activation_key();
    let mut active = user.into_active_model();
    active.activation_key = Set(Some(key.clone()));
    active.update(db).await?;
    info!("activation key issued");
    Ok(key)
}

/// Marks the holder of `key` active and consumes the key.
#[instrument(skip(db, key))]
pub async fn activate<C>(db: &C, key: &str) -> DbResult<users::Model>
where
    C: ConnectionTrait,
{
    let user = users::Entity::find()
        .filter(users::Column::ActivationKey.eq(key))
        .one(db)
        .await?
        .ok_or_else(|| DbError::not_found("activation key", key))?;
    let mut active = user.into_active_model();
    active.status_code = Set(Status::Active);
    active.activation_key = Set(None);
    let user = active.update(db).await?;
    info!(user_id = user.id, "user activated");
    Ok(user)
}

const DELETE_ATTEMPTS: usize = 4;

fn related_ids(user: &users::Model) -> BTreeSet<i32> {
    user.followers
        .iter()
        .chain(user.following.iter())
        .copied()
        .filter(|other| *other != user.id)
        .collect()
}

/// Deletes a user, scrubbing its id from every follow set that mentions it.
/// Works go with the user through the foreign key cascade.
///
/// The user and every peer are locked in ascending id order, the same order
/// follows take, before any set is rewritten. If the locked user row names
/// peers that were not locked yet, the attempt rolls back and retries with the
/// wider set.
#[instrument(skip(db))]
pub async fn delete_user<C>(db: &C, id: i32) -> DbResult<()>
where
    C: TransactionTrait,
{
    let mut peers = BTreeSet::new();
    for attempt in 1..=DELETE_ATTEMPTS {
        let txn = db.begin().await?;
        let mut ids = peers.clone();
        ids.insert(id);

        let mut user = None;
        let mut locked = Vec::with_capacity(peers.len());
        for row_id in ids {
            let row = follows::lock_if_present(&txn, row_id).await?;
            if row_id == id {
                user = row;
            } else if let Some(peer) = row {
                locked.push(peer);
            }
        }
        let user = user.ok_or_else(|| DbError::not_found("user", id))?;

        let related = related_ids(&user);
        if !related.is_subset(&peers) {
            debug!(attempt, "follow sets grew before the lock, retrying");
            txn.rollback().await?;
            peers.extend(related);
            continue;
        }
        for missing in related.iter().filter(|peer| !locked.iter().any(|row| row.id == **peer)) {
            warn!(peer_id = *missing, "follow set references a missing user");
        }

        for mut peer in locked {
            let followers_changed = peer.followers.remove(&id);
            let following_changed = peer.following.remove(&id);
            if followers_changed || following_changed {
                follows::write_sets(&txn, peer).await?;
            }
        }
        users::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        info!("user deleted");
        return Ok(());
    }
    Err(DbError::Conflict(format!(
        "user {id} kept gaining follows while being deleted"
    )))
}
