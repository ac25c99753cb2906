mod commands;
mod config;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use entity::constants::{Role, Sex, Status};
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, connect};
use platform_obs::init_tracing;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use tracing::info;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "socialctl", version, about = "User accounts, follows and work history")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Manage user accounts.
    #[command(subcommand)]
    User(UserCommand),
    /// Make one user follow another.
    Follow(EdgeArgs),
    /// Make one user stop following another.
    Unfollow(EdgeArgs),
    /// List the users following someone.
    Followers { user: String },
    /// List the users someone follows.
    Following { user: String },
    /// Manage a user's work history.
    #[command(subcommand)]
    Work(WorkCommand),
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
    /// Show how many migrations are pending.
    Status,
}

#[derive(Subcommand, Debug)]
pub(crate) enum UserCommand {
    /// Register a new account.
    Create(CreateUserArgs),
    /// Show one account by id, name or email.
    Show { user: String },
    /// Find accounts whose name or email contains every keyword.
    Search {
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,
    },
    /// Check a login and password.
    Login {
        login: String,
        #[arg(long, env = "SOCIAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Replace a user's password.
    Passwd {
        user: String,
        #[arg(long, env = "SOCIAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Change profile attributes.
    Update(UpdateUserArgs),
    /// Check whether a user could take a name.
    CheckName { user: String, name: String },
    /// Issue a fresh activation key.
    IssueKey { user: String },
    /// Activate the account holding a key.
    Activate { key: String },
    /// Delete an account, its works and every follow that mentions it.
    Delete { user: String },
}

#[derive(Args, Debug)]
pub(crate) struct CreateUserArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "SOCIAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(long, default_value = "user")]
    pub role: Role,
    #[arg(long, default_value = "inactive")]
    pub status: Status,
    #[arg(long, default_value = "male")]
    pub sex: Sex,
}

#[derive(Args, Debug)]
pub(crate) struct UpdateUserArgs {
    pub user: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub bio: Option<String>,
    #[arg(long)]
    pub avatar: Option<String>,
    #[arg(long)]
    pub sex: Option<Sex>,
    #[arg(long)]
    pub deposit: Option<Decimal>,
}

#[derive(Args, Debug)]
pub(crate) struct EdgeArgs {
    /// Id, name or email of the user who acts.
    pub actor: String,
    /// Id, name or email of the other user.
    pub target: String,
}

#[derive(Subcommand, Debug)]
pub(crate) enum WorkCommand {
    /// Record an employment period.
    Add(AddWorkArgs),
    /// List employment periods, most recent first.
    List { user: String },
    /// Remove one employment period.
    Delete { user: String, work_id: i32 },
}

#[derive(Args, Debug)]
pub(crate) struct AddWorkArgs {
    pub user: String,
    /// Start, as RFC 3339 or YYYY-MM-DD.
    #[arg(long, value_parser = commands::parse_when)]
    pub from: DateTimeWithTimeZone,
    /// End; defaults to now.
    #[arg(long, value_parser = commands::parse_when)]
    pub to: Option<DateTimeWithTimeZone>,
    #[arg(long, default_value = "")]
    pub company: String,
    #[arg(long, default_value_t = 0)]
    pub job_type: i16,
    #[arg(long, default_value_t = 0)]
    pub job_title: i16,
    #[arg(long, default_value = "")]
    pub description: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    init_tracing(config.obs.clone())?;
    let pool = connect(&config.database).await?;
    if !matches!(cli.command, Command::Migrate(_)) {
        ensure_migrations(&pool).await?;
    }
    match cli.command {
        Command::Migrate(MigrateCommand::Up) => migrate_up(&pool).await,
        Command::Migrate(MigrateCommand::Down) => migrate_down(&pool).await,
        Command::Migrate(MigrateCommand::Status) => migrate_status(&pool).await,
        Command::User(cmd) => commands::user(&pool, cmd).await,
        Command::Follow(edge) => commands::follow(&pool, edge, true).await,
        Command::Unfollow(edge) => commands::follow(&pool, edge, false).await,
        Command::Followers { user } => commands::followers(&pool, &user).await,
        Command::Following { user } => commands::following(&pool, &user).await,
        Command::Work(cmd) => commands::work(&pool, cmd).await,
    }
}

async fn ensure_migrations(pool: &DbPool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() {
        anyhow::bail!(
            "{} pending migrations detected; run `socialctl migrate up` first",
            pending.len()
        );
    }
    Ok(())
}

async fn migrate_up(pool: &DbPool) -> Result<()> {
    Migrator::up(pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(pool: &DbPool) -> Result<()> {
    Migrator::down(pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn migrate_status(pool: &DbPool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    println!("{} pending migrations", pending.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_parses_code_labels() {
        let cli = Cli::try_parse_from([
            "socialctl", "user", "create", "--name", "ann", "--email", "ann@example.com",
            "--role", "admin", "--sex", "female",
        ])
        .unwrap();
        let Command::User(UserCommand::Create(args)) = cli.command else {
            panic!("expected user create");
        };
        assert_eq!(args.role, Role::Admin);
        assert_eq!(args.sex, Sex::Female);
        assert_eq!(args.status, Status::Inactive);
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let parsed = Cli::try_parse_from([
            "socialctl", "user", "create", "--name", "ann", "--email", "a@b.c", "--role", "king",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn search_needs_a_keyword() {
        assert!(Cli::try_parse_from(["socialctl", "user", "search"]).is_err());
    }
}
