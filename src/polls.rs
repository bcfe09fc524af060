//! Poll creation, validation and listing.

use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::error::{PollError, ValidationError};
use crate::models::{
    NewPoll, OptionId, Poll, PollId, PollOption, PollWithOptions, MAX_OPTIONS, MAX_OPTION_LEN,
    MAX_TITLE_LEN, MIN_OPTIONS,
};
use crate::store::Store;

/// Check a creation request before anything is written.
pub fn validate(new_poll: &NewPoll) -> Result<(), ValidationError> {
    let title = new_poll.title.trim();
    if title.is_empty() {
        return Err(ValidationError::new("title", "must not be blank"));
    }
    if new_poll.title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::new(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }

    let count = new_poll.options.len();
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
        return Err(ValidationError::new(
            "options",
            format!("option count should be between {MIN_OPTIONS} and {MAX_OPTIONS}, got {count}"),
        ));
    }

    for (i, option) in new_poll.options.iter().enumerate() {
        if option.value.trim().is_empty() {
            return Err(ValidationError::new(format!("options[{i}]"), "must not be blank"));
        }
        if option.value.chars().count() > MAX_OPTION_LEN {
            return Err(ValidationError::new(
                format!("options[{i}]"),
                format!("must be at most {MAX_OPTION_LEN} characters"),
            ));
        }
    }
    Ok(())
}

/// Creation and lookup of polls and their options.
#[derive(Clone)]
pub struct PollCatalog {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl PollCatalog {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_poll(&self, new_poll: NewPoll) -> Result<PollWithOptions, PollError> {
        validate(&new_poll)?;

        let poll = Poll {
            id: PollId::generate(),
            title: new_poll.title,
            duration: new_poll.duration,
            votes_visible: new_poll.votes_visible,
            votes_changeable: new_poll.votes_changeable,
            created_at: self.clock.now(),
        };
        let options: Vec<PollOption> = new_poll
            .options
            .into_iter()
            .enumerate()
            .map(|(position, option)| PollOption {
                id: OptionId::generate(),
                poll_id: poll.id,
                position: position as i32,
                value: option.value,
            })
            .collect();

        self.store.insert_poll(&poll, &options).await?;
        info!(poll = %poll.id, options = options.len(), duration = %poll.duration, "poll created");

        Ok(PollWithOptions { poll, options })
    }

    pub async fn get_poll(&self, id: PollId) -> Result<Poll, PollError> {
        self.store
            .get_poll(id)
            .await?
            .ok_or(PollError::PollNotFound(id))
    }

    /// Options of an existing poll, in creation order.
    pub async fn list_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, PollError> {
        self.get_poll(poll_id).await?;
        Ok(self.store.list_options(poll_id).await?)
    }

    /// Polls newest first.
    pub async fn list_polls(&self, offset: u64, limit: u64) -> Result<Vec<Poll>, PollError> {
        Ok(self.store.list_polls(offset, limit).await?)
    }
}
