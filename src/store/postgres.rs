//! PostgreSQL backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::error::StoreError;
use crate::models::{Identity, IdentityId, OptionId, Poll, PollId, PollOption, Vote, VoteId};
use crate::store::{IdentityStore, PollStore, VoteLedger};
use crate::voting::{self, Ballot, LedgerWrite, VoteResult};

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PollRow {
    id: PollId,
    title: String,
    duration: String,
    votes_visible: bool,
    votes_changeable: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PollRow> for Poll {
    type Error = StoreError;

    fn try_from(row: PollRow) -> Result<Self, Self::Error> {
        let duration = row
            .duration
            .parse()
            .map_err(|e| StoreError::Corruption(format!("poll {}: {e}", row.id)))?;
        Ok(Poll {
            id: row.id,
            title: row.title,
            duration,
            votes_visible: row.votes_visible,
            votes_changeable: row.votes_changeable,
            created_at: row.created_at,
        })
    }
}

const POLL_COLUMNS: &str = "id, title, duration, votes_visible, votes_changeable, created_at";

async fn insert_vote(conn: &mut PgConnection, vote: &Vote) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO votes (id, identity_id, poll_id, option_id, cast_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(vote.id)
    .bind(vote.identity_id)
    .bind(vote.poll_id)
    .bind(vote.option_id)
    .bind(vote.cast_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_identity(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT id, address, created_at FROM identities WHERE address = $1",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO identities (id, address, created_at) VALUES ($1, $2, $3)")
            .bind(identity.id)
            .bind(&identity.address)
            .bind(identity.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PollStore for PgStore {
    async fn insert_poll(&self, poll: &Poll, options: &[PollOption]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO polls (id, title, duration, votes_visible, votes_changeable, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(poll.id)
        .bind(&poll.title)
        .bind(poll.duration.code())
        .bind(poll.votes_visible)
        .bind(poll.votes_changeable)
        .bind(poll.created_at)
        .execute(&mut *tx)
        .await?;

        for option in options {
            sqlx::query("INSERT INTO options (id, poll_id, position, value) VALUES ($1, $2, $3, $4)")
                .bind(option.id)
                .bind(option.poll_id)
                .bind(option.position)
                .bind(&option.value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        let row = sqlx::query_as::<_, PollRow>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Poll::try_from).transpose()
    }

    async fn list_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StoreError> {
        let options = sqlx::query_as::<_, PollOption>(
            "SELECT id, poll_id, position, value FROM options WHERE poll_id = $1 ORDER BY position",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn list_polls(&self, offset: u64, limit: u64) -> Result<Vec<Poll>, StoreError> {
        let rows = sqlx::query_as::<_, PollRow>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Poll::try_from).collect()
    }
}

#[async_trait]
impl VoteLedger for PgStore {
    async fn find_vote(
        &self,
        identity_id: IdentityId,
        poll_id: PollId,
    ) -> Result<Option<Vote>, StoreError> {
        let vote = sqlx::query_as::<_, Vote>(
            "SELECT id, identity_id, poll_id, option_id, cast_at FROM votes \
             WHERE identity_id = $1 AND poll_id = $2",
        )
        .bind(identity_id)
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn settle_ballot(
        &self,
        ballot: &Ballot,
        cast_at: DateTime<Utc>,
    ) -> Result<VoteResult, StoreError> {
        let mut tx = self.pool.begin().await?;

        // serializes ballots on this (identity, poll) until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", ballot.identity_id, ballot.poll_id))
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, Vote>(
            "SELECT id, identity_id, poll_id, option_id, cast_at FROM votes \
             WHERE identity_id = $1 AND poll_id = $2",
        )
        .bind(ballot.identity_id)
        .bind(ballot.poll_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (outcome, write) = voting::transition(existing.as_ref(), ballot);
        let vote = match write {
            LedgerWrite::Keep => existing,
            LedgerWrite::Insert => {
                let vote = ballot.to_vote(cast_at);
                insert_vote(&mut *tx, &vote).await?;
                Some(vote)
            }
            LedgerWrite::Replace { previous } => {
                delete_vote(&mut *tx, previous).await?;
                let vote = ballot.to_vote(cast_at);
                insert_vote(&mut *tx, &vote).await?;
                Some(vote)
            }
        };

        tx.commit().await?;
        Ok(VoteResult { outcome, vote })
    }

    async fn tally(&self, poll_id: PollId) -> Result<HashMap<OptionId, u64>, StoreError> {
        let rows = sqlx::query_as::<_, (OptionId, i64)>(
            "SELECT option_id, COUNT(*) FROM votes WHERE poll_id = $1 GROUP BY option_id",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(option, count)| (option, count.max(0) as u64))
            .collect())
    }
}

async fn delete_vote(conn: &mut PgConnection, id: VoteId) -> Result<(), StoreError> {
    let deleted = sqlx::query("DELETE FROM votes WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?
        .rows_affected();
    if deleted != 1 {
        return Err(StoreError::NotFound(format!("vote {id}")));
    }
    Ok(())
}
