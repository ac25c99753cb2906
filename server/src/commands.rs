use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use entity::{users, works};
use platform_db::{
    DbPool, follows,
    users::{self as repo, NewUser, ProfileUpdate},
    works::{NewWork, add_work, delete_work, works_of},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use tracing::info;

use crate::{AddWorkArgs, EdgeArgs, UserCommand, WorkCommand};

/// Accepts RFC 3339 timestamps or plain dates, which are read as UTC midnight.
pub(crate) fn parse_when(raw: &str) -> Result<DateTimeWithTimeZone, String> {
    if let Ok(when) = DateTimeWithTimeZone::parse_from_rfc3339(raw) {
        return Ok(when);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got {raw:?}"))
}

/// A numeric reference is an id; anything else is a name or email.
async fn resolve(pool: &DbPool, reference: &str) -> Result<users::Model> {
    let user = match reference.trim().parse::<i32>() {
        Ok(id) => repo::get_by_id(pool, id).await?,
        Err(_) => repo::get_by_login(pool, reference.trim()).await?,
    };
    Ok(user)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct UserSummary<'a> {
    id: i32,
    name: &'a str,
    email: &'a str,
    role: &'static str,
    status: &'static str,
    followers: usize,
    following: usize,
}

impl<'a> From<&'a users::Model> for UserSummary<'a> {
    fn from(user: &'a users::Model) -> Self {
        Self {
            id: user.id,
            name: &user.name,
            email: &user.email,
            role: user.role(),
            status: user.status(),
            followers: user.num_followers(),
            following: user.num_following(),
        }
    }
}

fn print_users(users: &[users::Model]) -> Result<()> {
    let summaries: Vec<UserSummary<'_>> = users.iter().map(UserSummary::from).collect();
    print_json(&summaries)
}

pub(crate) async fn user(pool: &DbPool, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Create(args) => {
            let user = repo::create_user(
                pool,
                NewUser {
                    name: args.name,
                    email: args.email,
                    password: args.password,
                    role: args.role,
                    status: args.status,
                    sex: args.sex,
                },
            )
            .await?;
            print_json(&user)
        }
        UserCommand::Show { user } => print_json(&resolve(pool, &user).await?),
        UserCommand::Search { keywords } => {
            print_users(&repo::search(pool, &keywords.join(" ")).await?)
        }
        UserCommand::Login { login, password } => {
            let (user, authenticated) = repo::authenticate(pool, &login, &password).await?;
            match user {
                Some(user) if authenticated => print_json(&UserSummary::from(&user)),
                _ => bail!("invalid login or password"),
            }
        }
        UserCommand::Passwd { user, password } => {
            let user = resolve(pool, &user).await?;
            repo::set_password(pool, user.id, &password).await?;
            println!("password updated for {}", user.name);
            Ok(())
        }
        UserCommand::Update(args) => {
            let user = resolve(pool, &args.user).await?;
            let updated = repo::update_profile(
                pool,
                user.id,
                ProfileUpdate {
                    phone: args.phone,
                    url: args.url,
                    location: args.location,
                    bio: args.bio,
                    avatar: args.avatar,
                    sex: args.sex,
                    deposit: args.deposit,
                },
            )
            .await?;
            print_json(&updated)
        }
        UserCommand::CheckName { user, name } => {
            let user = resolve(pool, &user).await?;
            let available = repo::check_name_available(pool, &user, &name).await?;
            print_json(&serde_json::json!({ "name": name, "available": available }))
        }
        UserCommand::IssueKey { user } => {
            let user = resolve(pool, &user).await?;
            println!("{}", repo::issue_activation_key(pool, user.id).await?);
            Ok(())
        }
        UserCommand::Activate { key } => {
            let user = repo::activate(pool, key.trim()).await?;
            print_json(&UserSummary::from(&user))
        }
        UserCommand::Delete { user } => {
            let user = resolve(pool, &user).await?;
            repo::delete_user(pool, user.id).await?;
            println!("deleted {}", user.name);
            Ok(())
        }
    }
}

pub(crate) async fn follow(pool: &DbPool, edge: EdgeArgs, start: bool) -> Result<()> {
    let actor = resolve(pool, &edge.actor).await?;
    let target = resolve(pool, &edge.target).await?;
    let outcome = if start {
        follows::follow(pool, actor.id, target.id).await?
    } else {
        follows::unfollow(pool, actor.id, target.id).await?
    };
    print_json(&serde_json::json!({
        "actor": UserSummary::from(&outcome.actor),
        "target": UserSummary::from(&outcome.target),
        "changed": outcome.changed,
    }))
}

pub(crate) async fn followers(pool: &DbPool, reference: &str) -> Result<()> {
    let user = resolve(pool, reference).await?;
    print_users(&repo::followers(pool, user.id).await?)
}

pub(crate) async fn following(pool: &DbPool, reference: &str) -> Result<()> {
    let user = resolve(pool, reference).await?;
    print_users(&repo::following(pool, user.id).await?)
}

pub(crate) async fn work(pool: &DbPool, command: WorkCommand) -> Result<()> {
    match command {
        WorkCommand::Add(args) => {
            let work = record_work(pool, args).await?;
            print_json(&work)
        }
        WorkCommand::List { user } => {
            let user = resolve(pool, &user).await?;
            print_json(&works_of(pool, &user).await?)
        }
        WorkCommand::Delete { user, work_id } => {
            let user = resolve(pool, &user).await?;
            delete_work(pool, user.id, work_id)
                .await
                .with_context(|| format!("cannot delete work {work_id} of {}", user.name))?;
            info!(work_id, "work removed");
            Ok(())
        }
    }
}

async fn record_work(pool: &DbPool, args: AddWorkArgs) -> Result<works::Model> {
    let user = resolve(pool, &args.user).await?;
    let work = add_work(
        pool,
        user.id,
        NewWork {
            to_when: args.to,
            company: args.company,
            job_type: args.job_type,
            job_title: args.job_title,
            description: args.description,
            ..NewWork::starting(args.from)
        },
    )
    .await?;
    Ok(work)
}
