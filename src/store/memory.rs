//! In-memory store for tests and database-less runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Identity, IdentityId, OptionId, Poll, PollId, PollOption, Vote};
use crate::store::{IdentityStore, PollStore, VoteLedger};
use crate::voting::{self, Ballot, LedgerWrite, VoteResult};

#[derive(Default)]
struct Tables {
    /// Keyed by address, which is the identity's unique key.
    identities: HashMap<String, Identity>,
    polls: HashMap<PollId, Poll>,
    options: HashMap<PollId, Vec<PollOption>>,
    /// Keyed by (identity, poll), which is the vote's unique key.
    votes: HashMap<(IdentityId, PollId), Vote>,
}

/// Thread-safe in-memory storage.
///
/// One mutex guards every table, so each trait call is a single atomic unit.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Number of vote rows held for a pair.
    pub fn vote_rows(&self, identity_id: IdentityId, poll_id: PollId) -> usize {
        self.tables()
            .map(|t| {
                t.votes
                    .values()
                    .filter(|v| v.identity_id == identity_id && v.poll_id == poll_id)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn identity_count(&self) -> usize {
        self.tables().map(|t| t.identities.len()).unwrap_or(0)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_identity(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.tables()?.identities.get(address).cloned())
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.identities.contains_key(&identity.address) {
            return Err(StoreError::Conflict("identities_address_key".to_string()));
        }
        tables
            .identities
            .insert(identity.address.clone(), identity.clone());
        Ok(())
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&self, poll: &Poll, options: &[PollOption]) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.polls.contains_key(&poll.id) {
            return Err(StoreError::Conflict("polls_pkey".to_string()));
        }
        let mut options = options.to_vec();
        options.sort_by_key(|o| o.position);
        tables.polls.insert(poll.id, poll.clone());
        tables.options.insert(poll.id, options);
        Ok(())
    }

    async fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        Ok(self.tables()?.polls.get(&id).cloned())
    }

    async fn list_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StoreError> {
        Ok(self
            .tables()?
            .options
            .get(&poll_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_polls(&self, offset: u64, limit: u64) -> Result<Vec<Poll>, StoreError> {
        let tables = self.tables()?;
        let mut polls: Vec<Poll> = tables.polls.values().cloned().collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(polls
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl VoteLedger for MemoryStore {
    async fn find_vote(
        &self,
        identity_id: IdentityId,
        poll_id: PollId,
    ) -> Result<Option<Vote>, StoreError> {
        Ok(self.tables()?.votes.get(&(identity_id, poll_id)).cloned())
    }

    async fn settle_ballot(
        &self,
        ballot: &Ballot,
        cast_at: DateTime<Utc>,
    ) -> Result<VoteResult, StoreError> {
        let mut tables = self.tables()?;
        let key = (ballot.identity_id, ballot.poll_id);
        let existing = tables.votes.get(&key).cloned();
        let (outcome, write) = voting::transition(existing.as_ref(), ballot);

        let vote = match write {
            LedgerWrite::Keep => existing,
            LedgerWrite::Insert => {
                let vote = ballot.to_vote(cast_at);
                tables.votes.insert(key, vote.clone());
                Some(vote)
            }
            LedgerWrite::Replace { previous } => {
                match tables.votes.remove(&key) {
                    Some(old) if old.id == previous => {}
                    _ => {
                        return Err(StoreError::Corruption(format!(
                            "vote {previous} vanished during replace"
                        )))
                    }
                }
                let vote = ballot.to_vote(cast_at);
                tables.votes.insert(key, vote.clone());
                Some(vote)
            }
        };
        Ok(VoteResult { outcome, vote })
    }

    async fn tally(&self, poll_id: PollId) -> Result<HashMap<OptionId, u64>, StoreError> {
        let tables = self.tables()?;
        let mut counts = HashMap::new();
        for vote in tables.votes.values().filter(|v| v.poll_id == poll_id) {
            *counts.entry(vote.option_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
