//! Poll detail view: options, caller's vote and gated tallies.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::error::PollError;
use crate::identity::IdentityResolver;
use crate::lifecycle::{self, TimeLeft};
use crate::models::{OptionId, Poll, PollId, PollOption};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub option_id: OptionId,
    pub votes: u64,
}

/// Tallies as shown to one viewer.
///
/// `Withheld` is not the same as a visible tally of zeros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum Results {
    Visible {
        tallies: Vec<OptionTally>,
        total_votes: u64,
    },
    Withheld,
}

impl Results {
    pub fn is_withheld(&self) -> bool {
        matches!(self, Results::Withheld)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PollDetailView {
    #[serde(flatten)]
    pub poll: Poll,
    pub options: Vec<PollOption>,
    pub remaining_seconds: TimeLeft,
    pub is_open: bool,
    /// Option the viewer voted for, if they have voted.
    pub voted_option: Option<OptionId>,
    pub results: Results,
}

#[derive(Clone)]
pub struct PollDetails {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    identities: IdentityResolver,
}

impl PollDetails {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identities: IdentityResolver::new(store.clone(), clock.clone()),
            store,
            clock,
        }
    }

    /// Detail view of a poll as seen from `address`, at the clock's now.
    pub async fn get_poll_detail(
        &self,
        poll_id: PollId,
        address: &str,
    ) -> Result<PollDetailView, PollError> {
        self.get_poll_detail_at(poll_id, address, self.clock.now())
            .await
    }

    pub async fn get_poll_detail_at(
        &self,
        poll_id: PollId,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<PollDetailView, PollError> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or(PollError::PollNotFound(poll_id))?;
        let options = self.store.list_options(poll_id).await?;

        // an unseen address has not voted; do not create an identity for it
        let voted_option = match self.identities.lookup(address).await? {
            Some(identity) => self
                .store
                .find_vote(identity.id, poll_id)
                .await?
                .map(|vote| vote.option_id),
            None => None,
        };

        let results = if lifecycle::results_visible_to(&poll, voted_option.is_some()) {
            let counts = self.store.tally(poll_id).await?;
            let tallies: Vec<OptionTally> = options
                .iter()
                .map(|o| OptionTally {
                    option_id: o.id,
                    votes: counts.get(&o.id).copied().unwrap_or(0),
                })
                .collect();
            let total_votes = tallies.iter().map(|t| t.votes).sum();
            Results::Visible {
                tallies,
                total_votes,
            }
        } else {
            Results::Withheld
        };

        Ok(PollDetailView {
            remaining_seconds: lifecycle::remaining_seconds(&poll, now),
            is_open: lifecycle::is_votable(&poll, now),
            poll,
            options,
            voted_option,
            results,
        })
    }
}
