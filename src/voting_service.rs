use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::Value;

use crate::db::{DbPool, Photo};
use crate::error::{ServiceError, ServiceResult};
use crate::score::{ScoreAggregator, ScoredPhoto};
use crate::vote_ledger::{PutOutcome, VoteLedger};

/// Reads an integer from a JSON body field, accepting both `5` and `"5"` since HTML
/// forms post numbers as strings. Fractions such as `1.5` or `"42.7"` are rejected.
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Only up and down votes are accepted from the public endpoint.
pub fn parse_vote(value: &Value) -> ServiceResult<i64> {
    match parse_integer(value) {
        Some(vote @ (1 | -1)) => Ok(vote),
        _ => Err(ServiceError::Validation(
            "Vote must be either 1 or -1".to_string(),
        )),
    }
}

#[derive(Clone)]
pub struct VotingService {
    pool: DbPool,
    ledger: VoteLedger,
    scores: ScoreAggregator,
}

impl VotingService {
    pub fn new(pool: DbPool, ledger: VoteLedger) -> Self {
        let scores = ScoreAggregator::new(pool.clone(), ledger.clone());
        Self {
            pool,
            ledger,
            scores,
        }
    }

    pub async fn cast_vote(
        &self,
        photo_id: i64,
        voter: &str,
        raw_vote: &Value,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        let vote = parse_vote(raw_vote)?;

        if !Photo::exists(&self.pool, photo_id).await? {
            return Err(ServiceError::NotFound);
        }

        match self.ledger.put(photo_id, voter, vote, now).await? {
            PutOutcome::Recorded => {
                debug!("Recorded vote {} on photo {} from {}", vote, photo_id, voter);
                Ok(())
            }
            PutOutcome::Throttled => {
                warn!(
                    "Rejected re-vote on photo {} from {} inside the throttle window",
                    photo_id, voter
                );
                Err(ServiceError::RateLimited)
            }
        }
    }

    pub async fn list_photos(&self) -> ServiceResult<Vec<ScoredPhoto>> {
        Ok(self.scores.list_scored().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VotePolicy;
    use crate::db::create_in_memory_pool;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    async fn setup(policy: VotePolicy) -> (VotingService, i64) {
        let pool = create_in_memory_pool().await.unwrap();
        let photo = Photo::create(&pool, "test.jpg", None).await.unwrap();
        let ledger = VoteLedger::new(pool.clone(), policy);
        (VotingService::new(pool, ledger), photo.id)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    async fn score(service: &VotingService, photo_id: i64) -> i64 {
        service.scores.score(photo_id).await.unwrap().unwrap()
    }

    #[test]
    fn test_parse_integer_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_integer(&json!(42)), Some(42));
        assert_eq!(parse_integer(&json!("-3")), Some(-3));
        assert_eq!(parse_integer(&json!(" 7 ")), Some(7));
        assert_eq!(parse_integer(&json!("abc")), None);
        assert_eq!(parse_integer(&json!(1.5)), None);
        assert_eq!(parse_integer(&json!(42.0)), None);
        assert_eq!(parse_integer(&json!("42.7")), None);
        assert_eq!(parse_integer(&json!(null)), None);
        assert_eq!(parse_integer(&json!(true)), None);
    }

    #[test]
    fn test_parse_vote_domain() {
        assert_eq!(parse_vote(&json!(1)).unwrap(), 1);
        assert_eq!(parse_vote(&json!("-1")).unwrap(), -1);
        assert!(matches!(
            parse_vote(&json!(2)),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            parse_vote(&json!(0)),
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_cast_vote_on_unknown_photo() {
        let (service, photo_id) = setup(VotePolicy::Replace).await;

        let result = service.cast_vote(photo_id + 1, "a", &json!(1), t0()).await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
        assert_eq!(service.ledger.count_by_photo(photo_id + 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_vote_leaves_ledger_untouched() {
        let (service, photo_id) = setup(VotePolicy::Replace).await;

        let result = service.cast_vote(photo_id, "a", &json!(5), t0()).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(service.ledger.get(photo_id, "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_repeated_identical_vote_is_throttled() {
        let (service, photo_id) = setup(VotePolicy::throttled_daily()).await;

        service.cast_vote(photo_id, "a", &json!(1), t0()).await.unwrap();
        let again = service
            .cast_vote(photo_id, "a", &json!(1), t0() + Duration::minutes(5))
            .await;

        assert!(matches!(again, Err(ServiceError::RateLimited)));
        assert_eq!(score(&service, photo_id).await, 1);
    }

    #[tokio::test]
    async fn test_unthrottled_revote_replaces() {
        let (service, photo_id) = setup(VotePolicy::Replace).await;

        service.cast_vote(photo_id, "a", &json!(1), t0()).await.unwrap();
        service.cast_vote(photo_id, "a", &json!(-1), t0()).await.unwrap();

        assert_eq!(score(&service, photo_id).await, -1);
        assert_eq!(service.ledger.count_by_photo(photo_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_voting_scenario_with_window() {
        let (service, photo_id) = setup(VotePolicy::throttled_daily()).await;
        assert_eq!(score(&service, photo_id).await, 0);

        service.cast_vote(photo_id, "A", &json!(1), t0()).await.unwrap();
        assert_eq!(score(&service, photo_id).await, 1);

        service.cast_vote(photo_id, "B", &json!(-1), t0()).await.unwrap();
        assert_eq!(score(&service, photo_id).await, 0);

        let too_soon = service
            .cast_vote(photo_id, "A", &json!(1), t0() + Duration::hours(1))
            .await;
        assert!(matches!(too_soon, Err(ServiceError::RateLimited)));
        assert_eq!(score(&service, photo_id).await, 0);

        service
            .cast_vote(photo_id, "A", &json!(1), t0() + Duration::hours(25))
            .await
            .unwrap();
        assert_eq!(score(&service, photo_id).await, 0);

        let record = service.ledger.get(photo_id, "A").await.unwrap().unwrap();
        assert_eq!(record.cast_time(), Some(t0() + Duration::hours(25)));
    }

    #[tokio::test]
    async fn test_list_photos_reflects_votes() {
        let (service, photo_id) = setup(VotePolicy::Replace).await;
        service.cast_vote(photo_id, "a", &json!("1"), t0()).await.unwrap();

        let photos = service.list_photos().await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].id, photo_id);
        assert_eq!(photos[0].score, 1);
    }
}
