//! Storage traits for identities, polls and the vote ledger.
//!
//! Every backend (PostgreSQL, in-memory for tests) implements these traits.
//! The rest of the crate depends only on the traits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Identity, IdentityId, OptionId, Poll, PollId, PollOption, Vote};
use crate::voting::{Ballot, VoteResult};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_identity(&self, address: &str) -> Result<Option<Identity>, StoreError>;

    /// Insert a new identity. Fails with [`StoreError::Conflict`] when the
    /// address already has one.
    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Write a poll and all of its options as one atomic unit.
    async fn insert_poll(&self, poll: &Poll, options: &[PollOption]) -> Result<(), StoreError>;

    async fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError>;

    /// Options of a poll in creation order.
    async fn list_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StoreError>;

    /// Polls, newest first.
    async fn list_polls(&self, offset: u64, limit: u64) -> Result<Vec<Poll>, StoreError>;
}

#[async_trait]
pub trait VoteLedger: Send + Sync {
    async fn find_vote(
        &self,
        identity_id: IdentityId,
        poll_id: PollId,
    ) -> Result<Option<Vote>, StoreError>;

    /// Read the existing vote for the ballot's (identity, poll), decide with
    /// [`crate::voting::transition`] and apply the resulting write, all
    /// atomically with respect to other ballots on the same pair.
    async fn settle_ballot(
        &self,
        ballot: &Ballot,
        cast_at: DateTime<Utc>,
    ) -> Result<VoteResult, StoreError>;

    /// Vote count per option. Options without votes may be absent.
    async fn tally(&self, poll_id: PollId) -> Result<HashMap<OptionId, u64>, StoreError>;
}

pub trait Store: IdentityStore + PollStore + VoteLedger {}

impl<T: IdentityStore + PollStore + VoteLedger> Store for T {}
