//! Transactional persistence for the follow graph.
//!
//! A follow touches two rows. Both are locked, mutated and written inside one
//! transaction, so readers never observe only one half of the relation.

use entity::users;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QuerySelect, TransactionTrait,
};
use tracing::{debug, info, instrument};

use crate::{DbError, DbResult};

/// Both users as committed, plus whether the call changed anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FollowOutcome {
    pub actor: users::Model,
    pub target: users::Model,
    pub changed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
    Follow,
    Unfollow,
}

/// `actor` starts following `target`. Following twice is a no-op.
#[instrument(skip(db))]
pub async fn follow<C>(db: &C, actor_id: i32, target_id: i32) -> DbResult<FollowOutcome>
where
    C: TransactionTrait,
{
    apply(db, actor_id, target_id, Change::Follow).await
}

/// `actor` stops following `target`. Unfollowing a stranger is a no-op.
#[instrument(skip(db))]
pub async fn unfollow<C>(db: &C, actor_id: i32, target_id: i32) -> DbResult<FollowOutcome>
where
    C: TransactionTrait,
{
    apply(db, actor_id, target_id, Change::Unfollow).await
}

async fn apply<C>(db: &C, actor_id: i32, target_id: i32, change: Change) -> DbResult<FollowOutcome>
where
    C: TransactionTrait,
{
    let txn = db.begin().await?;

    let outcome = if actor_id == target_id {
        let mut user = lock(&txn, actor_id).await?;
        let changed = match change {
            Change::Follow => user.follow_self(),
            Change::Unfollow => user.unfollow_self(),
        };
        if changed {
            user = write_sets(&txn, user).await?;
        }
        FollowOutcome {
            target: user.clone(),
            actor: user,
            changed,
        }
    } else {
        // Lock in id order so opposite follows cannot deadlock.
        let (mut actor, mut target) = if actor_id < target_id {
            let actor = lock(&txn, actor_id).await?;
            (actor, lock(&txn, target_id).await?)
        } else {
            let target = lock(&txn, target_id).await?;
            (lock(&txn, actor_id).await?, target)
        };
        let changed = match change {
            Change::Follow => actor.follow(&mut target),
            Change::Unfollow => actor.unfollow(&mut target),
        };
        if changed {
            actor = write_sets(&txn, actor).await?;
            target = write_sets(&txn, target).await?;
        }
        FollowOutcome {
            actor,
            target,
            changed,
        }
    };

    txn.commit().await?;
    if outcome.changed {
        info!(?change, "follow graph updated");
    } else {
        debug!(?change, "follow graph already in requested state");
    }
    Ok(outcome)
}

async fn lock(txn: &DatabaseTransaction, id: i32) -> DbResult<users::Model> {
    lock_if_present(txn, id)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
}

/// `SELECT .. FOR UPDATE` on one user row; `None` when the row is gone.
pub(crate) async fn lock_if_present(
    txn: &DatabaseTransaction,
    id: i32,
) -> DbResult<Option<users::Model>> {
    Ok(users::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?)
}

/// Writes only the two follow columns of `user`.
pub(crate) async fn write_sets<C>(db: &C, user: users::Model) -> DbResult<users::Model>
where
    C: ConnectionTrait,
{
    let followers = user.followers.copy();
    let following = user.following.copy();
    let mut active = user.into_active_model();
    active.followers = Set(followers);
    active.following = Set(following);
    Ok(active.update(db).await?)
}
