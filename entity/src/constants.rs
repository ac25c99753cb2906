use std::str::FromStr;

use sea_orm::{Iterable, entity::prelude::*};
use serde::{Deserialize, Serialize};

pub const STRING_LEN: u32 = 64;
pub const PASSWORD_LEN: u32 = 200;
pub const COMPANY_LEN: u32 = 50;
pub const WORK_DESCRIPTION_LEN: u32 = 1000;

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(num_value = 0)]
    Admin,
    #[sea_orm(num_value = 1)]
    Staff,
    #[default]
    #[sea_orm(num_value = 2)]
    User,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::User => "user",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    #[sea_orm(num_value = 0)]
    Inactive,
    #[sea_orm(num_value = 1)]
    New,
    #[sea_orm(num_value = 2)]
    Active,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Inactive => "inactive",
            Status::New => "new",
            Status::Active => "active",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    #[sea_orm(num_value = 1)]
    Male,
    #[sea_orm(num_value = 2)]
    Female,
    #[sea_orm(num_value = 9)]
    Other,
}

impl Sex {
    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
        }
    }
}

/// Unknown label passed where a code enumeration was expected.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! parse_by_label {
    ($ty:ty, $kind:literal) => {
        impl FromStr for $ty {
            type Err = UnknownCode;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                <$ty>::iter()
                    .find(|code| code.label().eq_ignore_ascii_case(value.trim()))
                    .ok_or_else(|| UnknownCode {
                        kind: $kind,
                        value: value.to_owned(),
                    })
            }
        }
    };
}

parse_by_label!(Role, "role");
parse_by_label!(Status, "status");
parse_by_label!(Sex, "sex");
