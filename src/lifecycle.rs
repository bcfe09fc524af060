//! Poll lifecycle: remaining time, votability and result visibility.
//!
//! Everything here is a pure function of the poll and the current time.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::models::Poll;

/// Time left in a poll's voting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLeft {
    /// The poll never expires.
    Unlimited,
    Seconds(u64),
}

impl TimeLeft {
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            TimeLeft::Unlimited => None,
            TimeLeft::Seconds(s) => Some(*s),
        }
    }
}

// `null` stands for "no expiry".
impl Serialize for TimeLeft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_secs().serialize(serializer)
    }
}

pub fn remaining_seconds(poll: &Poll, now: DateTime<Utc>) -> TimeLeft {
    let Some(window) = poll.duration.as_secs() else {
        return TimeLeft::Unlimited;
    };
    // a creation time in the future counts as zero elapsed
    let elapsed = (now - poll.created_at).num_seconds().max(0);
    TimeLeft::Seconds(window.saturating_sub(elapsed).max(0) as u64)
}

pub fn is_votable(poll: &Poll, now: DateTime<Utc>) -> bool {
    match remaining_seconds(poll, now) {
        TimeLeft::Unlimited => true,
        TimeLeft::Seconds(left) => left > 0,
    }
}

/// Whether tallies may be shown to a viewer.
pub fn results_visible_to(poll: &Poll, has_voted: bool) -> bool {
    poll.votes_visible || has_voted
}
