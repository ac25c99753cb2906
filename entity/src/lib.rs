//! SeaORM entities for user accounts, their follow graph and work history.

pub mod constants;
pub mod denormalized;
mod follow_graph;
pub mod password;
pub mod users;
pub mod works;

use sea_orm::prelude::DateTimeWithTimeZone;

pub use denormalized::{CodecDecodeError, DenormalizedSet, IdSet};
pub use password::{HashedPassword, PasswordError};

pub mod prelude {
    pub use super::users::Entity as Users;
    pub use super::works::Entity as Works;
}

/// Timestamp used for `create_at`, `update_at` and open-ended work periods.
pub fn current_time() -> DateTimeWithTimeZone {
    chrono::Utc::now().fixed_offset()
}
