use serde::{Deserialize, Serialize};

use crate::db::{DbPool, Photo};
use crate::vote_ledger::VoteLedger;

/// Gallery entry as returned by `GET /photos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoredPhoto {
    pub id: i64,
    pub filename: String,
    pub name: Option<String>,
    pub score: i64,
}

const LIST_SCORED_SQL: &str = r#"
SELECT p.id, p.filename, p.name, COALESCE(SUM(v.vote), 0) AS score
FROM photos p
LEFT JOIN votes v ON v.photo_id = p.id
GROUP BY p.id, p.filename, p.name
ORDER BY p.id
"#;

/// Scores are always derived from the ledger at read time and never stored.
#[derive(Clone)]
pub struct ScoreAggregator {
    pool: DbPool,
    ledger: VoteLedger,
}

impl ScoreAggregator {
    pub fn new(pool: DbPool, ledger: VoteLedger) -> Self {
        Self { pool, ledger }
    }

    /// `None` when the photo does not exist; a photo without votes scores 0.
    pub async fn score(&self, photo_id: i64) -> Result<Option<i64>, sqlx::Error> {
        if !Photo::exists(&self.pool, photo_id).await? {
            return Ok(None);
        }
        self.ledger.sum_by_photo(photo_id).await.map(Some)
    }

    pub async fn list_scored(&self) -> Result<Vec<ScoredPhoto>, sqlx::Error> {
        sqlx::query_as::<_, ScoredPhoto>(LIST_SCORED_SQL)
            .fetch_all(&self.pool)
            .await
    }
}
