use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::config::VotePolicy;
use crate::db::DbPool;

/// A single stored vote for a (photo, voter) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct VoteRecord {
    pub photo_id: i64,
    pub voter: String,
    pub vote: i64,
    /// Unix seconds of the cast, absent on rows that predate vote timestamps.
    pub cast_at: Option<i64>,
}

impl VoteRecord {
    pub fn cast_time(&self) -> Option<DateTime<Utc>> {
        self.cast_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Recorded,
    Throttled,
}

/// A vote to write in place of a photo's whole history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticVote<'a> {
    pub voter: &'a str,
    pub vote: i64,
}

const UPSERT_REPLACE: &str = r#"
INSERT INTO votes (photo_id, voter, vote, cast_at) VALUES (?, ?, ?, ?)
ON CONFLICT (photo_id, voter) DO UPDATE SET
    vote = excluded.vote,
    cast_at = excluded.cast_at
"#;

// The WHERE on the conflict branch turns the update into a no-op while the stored vote
// is still inside the window, which leaves `changes()` at zero for the caller to detect.
const UPSERT_THROTTLED: &str = r#"
INSERT INTO votes (photo_id, voter, vote, cast_at) VALUES (?, ?, ?, ?)
ON CONFLICT (photo_id, voter) DO UPDATE SET
    vote = excluded.vote,
    cast_at = excluded.cast_at
WHERE votes.cast_at IS NULL OR excluded.cast_at - votes.cast_at >= ?
"#;

/// Persistent (photo, voter) → vote store. Cloning is cheap; clones share the pool.
#[derive(Clone)]
pub struct VoteLedger {
    pool: DbPool,
    policy: VotePolicy,
}

impl VoteLedger {
    pub fn new(pool: DbPool, policy: VotePolicy) -> Self {
        Self { pool, policy }
    }

    pub async fn get(&self, photo_id: i64, voter: &str) -> Result<Option<VoteRecord>, sqlx::Error> {
        sqlx::query_as::<_, VoteRecord>(
            "SELECT photo_id, voter, vote, cast_at FROM votes WHERE photo_id = ? AND voter = ?",
        )
        .bind(photo_id)
        .bind(voter)
        .fetch_optional(&self.pool)
        .await
    }

    /// Records `vote` for the pair according to the ledger's policy. The check and the
    /// write are one statement, so concurrent casts for the same pair serialize on the
    /// uniqueness constraint instead of racing.
    pub async fn put(
        &self,
        photo_id: i64,
        voter: &str,
        vote: i64,
        now: DateTime<Utc>,
    ) -> Result<PutOutcome, sqlx::Error> {
        let cast_at = now.timestamp();

        let affected = match self.policy {
            VotePolicy::Replace => sqlx::query(UPSERT_REPLACE)
                .bind(photo_id)
                .bind(voter)
                .bind(vote)
                .bind(cast_at)
                .execute(&self.pool)
                .await?
                .rows_affected(),
            VotePolicy::Throttled { window_secs } => sqlx::query(UPSERT_THROTTLED)
                .bind(photo_id)
                .bind(voter)
                .bind(vote)
                .bind(cast_at)
                .bind(window_secs)
                .execute(&self.pool)
                .await?
                .rows_affected(),
        };

        if affected == 0 {
            Ok(PutOutcome::Throttled)
        } else {
            Ok(PutOutcome::Recorded)
        }
    }

    /// Removes every vote on the photo through `conn`, so callers can fold it into a
    /// wider transaction.
    pub async fn delete_all(
        conn: &mut SqliteConnection,
        photo_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM votes WHERE photo_id = ?")
            .bind(photo_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn sum_by_photo(&self, photo_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COALESCE(SUM(vote), 0) FROM votes WHERE photo_id = ?")
            .bind(photo_id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_by_photo(&self, photo_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE photo_id = ?")
            .bind(photo_id)
            .fetch_one(&self.pool)
            .await
    }

    /// Drops every vote on the photo and, if given, writes `synthetic` as its only row.
    /// Both steps commit together; an error in either leaves the history untouched.
    pub async fn reset(
        &self,
        photo_id: i64,
        synthetic: Option<SyntheticVote<'_>>,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let cleared = Self::delete_all(&mut tx, photo_id).await?;

        if let Some(synthetic) = synthetic {
            sqlx::query("INSERT INTO votes (photo_id, voter, vote, cast_at) VALUES (?, ?, ?, ?)")
                .bind(photo_id)
                .bind(synthetic.voter)
                .bind(synthetic.vote)
                .bind(now.timestamp())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(cleared)
    }
}
