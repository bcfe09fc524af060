//! Vote casting: identity resolution, poll checks and the ballot transition table.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::PollError;
use crate::identity::IdentityResolver;
use crate::lifecycle;
use crate::models::{IdentityId, OptionId, PollId, Vote, VoteId};
use crate::store::Store;

/// What happened to a ballot. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Created,
    Replaced,
    Duplicate,
    ChangeRejected,
    PollClosed,
}

impl VoteOutcome {
    /// Whether the ledger was written.
    pub fn mutated(&self) -> bool {
        matches!(self, VoteOutcome::Created | VoteOutcome::Replaced)
    }
}

impl fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoteOutcome::Created => "created",
            VoteOutcome::Replaced => "replaced",
            VoteOutcome::Duplicate => "duplicate",
            VoteOutcome::ChangeRejected => "change_rejected",
            VoteOutcome::PollClosed => "poll_closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteResult {
    pub outcome: VoteOutcome,
    /// The vote standing after the call, if any.
    pub vote: Option<Vote>,
}

/// A request to record `option_id` for an identity on a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot {
    pub identity_id: IdentityId,
    pub poll_id: PollId,
    pub option_id: OptionId,
    pub votes_changeable: bool,
}

impl Ballot {
    pub fn to_vote(&self, cast_at: DateTime<Utc>) -> Vote {
        Vote {
            id: VoteId::generate(),
            identity_id: self.identity_id,
            poll_id: self.poll_id,
            option_id: self.option_id,
            cast_at,
        }
    }
}

/// The write a ledger must perform to settle a ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    Keep,
    Insert,
    /// Delete `previous`, then insert the ballot's vote.
    Replace { previous: VoteId },
}

/// Decide a ballot against the identity's existing vote on the poll.
///
/// Ledgers call this while holding their per-(identity, poll) critical
/// section, so `existing` is the snapshot the resulting write is applied to.
pub fn transition(existing: Option<&Vote>, ballot: &Ballot) -> (VoteOutcome, LedgerWrite) {
    match existing {
        None => (VoteOutcome::Created, LedgerWrite::Insert),
        Some(vote) if vote.option_id == ballot.option_id => {
            (VoteOutcome::Duplicate, LedgerWrite::Keep)
        }
        Some(_) if !ballot.votes_changeable => (VoteOutcome::ChangeRejected, LedgerWrite::Keep),
        Some(vote) => (
            VoteOutcome::Replaced,
            LedgerWrite::Replace { previous: vote.id },
        ),
    }
}

#[derive(Clone)]
pub struct VotingCoordinator {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    identities: IdentityResolver,
}

impl VotingCoordinator {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identities: IdentityResolver::new(store.clone(), clock.clone()),
            store,
            clock,
        }
    }

    /// Cast a vote for `option_id` on behalf of the client at `address`.
    pub async fn cast_vote(
        &self,
        address: &str,
        poll_id: PollId,
        option_id: OptionId,
    ) -> Result<VoteResult, PollError> {
        let identity = self.identities.resolve(address).await?;

        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or(PollError::PollNotFound(poll_id))?;

        let options = self.store.list_options(poll_id).await?;
        if !options.iter().any(|o| o.id == option_id) {
            return Err(PollError::OptionNotFound {
                poll: poll_id,
                option: option_id,
            });
        }

        let now = self.clock.now();
        if !lifecycle::is_votable(&poll, now) {
            debug!(poll = %poll_id, identity = %identity.id, "ballot on closed poll");
            return Ok(VoteResult {
                outcome: VoteOutcome::PollClosed,
                vote: None,
            });
        }

        let ballot = Ballot {
            identity_id: identity.id,
            poll_id,
            option_id,
            votes_changeable: poll.votes_changeable,
        };
        let result = self.store.settle_ballot(&ballot, now).await?;

        if result.outcome.mutated() {
            info!(
                poll = %poll_id,
                identity = %identity.id,
                option = %option_id,
                outcome = %result.outcome,
                "vote recorded"
            );
        } else {
            debug!(
                poll = %poll_id,
                identity = %identity.id,
                outcome = %result.outcome,
                "ballot left ledger unchanged"
            );
        }
        Ok(result)
    }
}
