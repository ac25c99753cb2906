//! Follow relation kept redundantly on both users.
//!
//! `A follows B` is recorded as `B.id` in `A.following` and `A.id` in
//! `B.followers`. The mutators below only touch in-memory models and report
//! whether anything changed; persisting both rows together is the caller's job
//! (see `platform_db::follows`).

use sea_orm::{
    Condition, QueryOrder,
    entity::prelude::*,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};

use crate::{
    denormalized::IdSet,
    users::{Column, Entity, Model},
};

impl Model {
    pub fn num_followers(&self) -> usize {
        self.followers.len()
    }

    pub fn num_following(&self) -> usize {
        self.following.len()
    }

    pub fn is_following(&self, user_id: i32) -> bool {
        self.following.contains(&user_id)
    }

    pub fn is_followed_by(&self, user_id: i32) -> bool {
        self.followers.contains(&user_id)
    }

    /// Makes `self` follow `target`. Returns `true` when either side changed.
    pub fn follow(&mut self, target: &mut Model) -> bool {
        let added_follower = target.followers.insert(self.id);
        let added_following = self.following.insert(target.id);
        added_follower || added_following
    }

    /// Self-follow is allowed; both sets live on the same row.
    pub fn follow_self(&mut self) -> bool {
        let added_follower = self.followers.insert(self.id);
        let added_following = self.following.insert(self.id);
        added_follower || added_following
    }

    /// Drops both halves of `self -> target`. Missing halves are ignored.
    pub fn unfollow(&mut self, target: &mut Model) -> bool {
        let removed_follower = target.followers.remove(&self.id);
        let removed_following = self.following.remove(&target.id);
        removed_follower || removed_following
    }

    pub fn unfollow_self(&mut self) -> bool {
        let removed_follower = self.followers.remove(&self.id);
        let removed_following = self.following.remove(&self.id);
        removed_follower || removed_following
    }

    /// Users this user follows. Nothing runs until the query is executed.
    pub fn following_query(&self) -> Select<Entity> {
        members_of(&self.following)
    }

    /// Users following this user.
    pub fn followers_query(&self) -> Select<Entity> {
        members_of(&self.followers)
    }
}

impl Entity {
    /// Users whose name or email contains every whitespace-separated keyword,
    /// ignoring case. No keywords matches no users.
    pub fn search(keywords: &str) -> Select<Entity> {
        let terms: Vec<String> = keywords
            .split_whitespace()
            .map(|term| term.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Self::find().filter(match_nothing());
        }
        let condition = terms.iter().fold(Condition::all(), |all, term| {
            let pattern = format!("%{}%", escape_like(term));
            all.add(
                Condition::any()
                    .add(lower_like(Column::Name, &pattern))
                    .add(lower_like(Column::Email, &pattern)),
            )
        });
        tracing::debug!(terms = terms.len(), "built user search query");
        Self::find().filter(condition).order_by_asc(Column::Id)
    }
}

fn members_of(ids: &IdSet) -> Select<Entity> {
    if ids.is_empty() {
        return Entity::find().filter(match_nothing());
    }
    let mut ids: Vec<i32> = ids.iter().copied().collect();
    ids.sort_unstable();
    Entity::find()
        .filter(Column::Id.is_in(ids))
        .order_by_asc(Column::Id)
}

fn match_nothing() -> SimpleExpr {
    Expr::cust("1 = 0")
}

fn lower_like(column: Column, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((Entity, column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
