//! Records, identifiers and request bodies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

record_id!(
    /// Address-derived voter id.
    IdentityId
);
record_id!(PollId);
record_id!(OptionId);
record_id!(VoteId);

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 255;
/// Maximum option value length, in characters.
pub const MAX_OPTION_LEN: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Identity {
    pub id: IdentityId,
    #[serde(skip_serializing)]
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// How long a poll accepts votes after it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PollDuration {
    #[serde(rename = "1M")]
    OneMinute,
    #[default]
    #[serde(rename = "5M")]
    FiveMinutes,
    #[serde(rename = "10M")]
    TenMinutes,
    #[serde(rename = "UNLIMITED")]
    Unlimited,
}

impl PollDuration {
    /// Voting window in seconds, `None` when the poll never closes.
    pub fn as_secs(&self) -> Option<i64> {
        match self {
            PollDuration::OneMinute => Some(60),
            PollDuration::FiveMinutes => Some(5 * 60),
            PollDuration::TenMinutes => Some(10 * 60),
            PollDuration::Unlimited => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PollDuration::OneMinute => "1M",
            PollDuration::FiveMinutes => "5M",
            PollDuration::TenMinutes => "10M",
            PollDuration::Unlimited => "UNLIMITED",
        }
    }
}

impl FromStr for PollDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1M" => Ok(PollDuration::OneMinute),
            "5M" => Ok(PollDuration::FiveMinutes),
            "10M" => Ok(PollDuration::TenMinutes),
            "UNLIMITED" => Ok(PollDuration::Unlimited),
            other => Err(format!("unknown duration code {other:?}")),
        }
    }
}

impl fmt::Display for PollDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub duration: PollDuration,
    pub votes_visible: bool,
    pub votes_changeable: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PollOption {
    pub id: OptionId,
    #[serde(skip_serializing)]
    pub poll_id: PollId,
    #[serde(skip_serializing)]
    pub position: i32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Vote {
    pub id: VoteId,
    pub identity_id: IdentityId,
    pub poll_id: PollId,
    pub option_id: OptionId,
    pub cast_at: DateTime<Utc>,
}

/// A poll together with its options, as created.
#[derive(Debug, Clone, Serialize)]
pub struct PollWithOptions {
    #[serde(flatten)]
    pub poll: Poll,
    pub options: Vec<PollOption>,
}

/// User-provided details to create a poll.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPoll {
    pub title: String,
    pub options: Vec<NewOption>,
    #[serde(default)]
    pub duration: PollDuration,
    #[serde(default)]
    pub votes_visible: bool,
    #[serde(default)]
    pub votes_changeable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOption {
    pub value: String,
}

impl From<&str> for NewOption {
    fn from(value: &str) -> Self {
        NewOption {
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option_id: OptionId,
}
