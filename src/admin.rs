use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::db::{DbPool, Photo};
use crate::error::{ServiceError, ServiceResult};
use crate::upload_storage::UploadStorage;
use crate::vote_ledger::{SyntheticVote, VoteLedger};
use crate::voting_service::parse_integer;

/// Voter identity recorded on votes written by a score override.
pub const ADMIN_VOTER: &str = "admin";

/// Largest magnitude an override may set. Public ±1 votes cast on top of it must not
/// overflow the SQLite `SUM` behind the gallery listing.
pub const MAX_OVERRIDE_SCORE: i64 = i32::MAX as i64;

/// The fixed username/password pair guarding destructive operations. Only digests are
/// kept, and comparisons run on digests so timing does not depend on the secret's bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    username_digest: Vec<u8>,
    password_digest: Vec<u8>,
}

impl AdminCredentials {
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        Self {
            username_digest: digest(username.as_ref()),
            password_digest: digest(password.as_ref()),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_ok = digest(username) == self.username_digest;
        let password_ok = digest(password) == self.password_digest;
        username_ok & password_ok
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminCredentials(<redacted>)")
    }
}

fn digest(value: &str) -> Vec<u8> {
    Sha256::digest(value.as_bytes()).to_vec()
}

#[derive(Clone)]
pub struct AdminService {
    pool: DbPool,
    ledger: VoteLedger,
    uploads: UploadStorage,
    credentials: AdminCredentials,
}

impl AdminService {
    pub fn new(
        pool: DbPool,
        ledger: VoteLedger,
        uploads: UploadStorage,
        credentials: AdminCredentials,
    ) -> Self {
        Self {
            pool,
            ledger,
            uploads,
            credentials,
        }
    }

    fn authorize(&self, username: &str, password: &str) -> ServiceResult<()> {
        if self.credentials.verify(username, password) {
            Ok(())
        } else {
            warn!("Rejected admin request with invalid credentials");
            Err(ServiceError::Forbidden)
        }
    }

    /// Replaces the photo's vote history so that its score becomes exactly the target.
    /// A target of 0 leaves the photo with no votes at all.
    pub async fn override_score(
        &self,
        photo_id: i64,
        username: &str,
        password: &str,
        raw_score: &Value,
        now: DateTime<Utc>,
    ) -> ServiceResult<()> {
        self.authorize(username, password)?;

        let target = parse_integer(raw_score)
            .ok_or_else(|| ServiceError::Validation("Invalid score".to_string()))?;
        if !(-MAX_OVERRIDE_SCORE..=MAX_OVERRIDE_SCORE).contains(&target) {
            return Err(ServiceError::Validation(format!(
                "Score must be between -{} and {}",
                MAX_OVERRIDE_SCORE, MAX_OVERRIDE_SCORE
            )));
        }

        if !Photo::exists(&self.pool, photo_id).await? {
            return Err(ServiceError::NotFound);
        }

        let synthetic = (target != 0).then_some(SyntheticVote {
            voter: ADMIN_VOTER,
            vote: target,
        });
        let cleared = self.ledger.reset(photo_id, synthetic, now).await?;

        info!(
            "Score of photo {} forced to {} ({} votes cleared)",
            photo_id, target, cleared
        );
        Ok(())
    }

    pub async fn delete_photo(
        &self,
        photo_id: i64,
        username: &str,
        password: &str,
    ) -> ServiceResult<()> {
        self.authorize(username, password)?;

        let photo = Photo::find_by_id(&self.pool, photo_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if !self.uploads.remove(&photo.filename).await? {
            warn!(
                "File {} for photo {} was already missing",
                photo.filename, photo_id
            );
        }

        let mut tx = self.pool.begin().await?;
        let cleared = VoteLedger::delete_all(&mut tx, photo_id).await?;
        if !Photo::delete(&mut tx, photo_id).await? {
            return Err(ServiceError::NotFound);
        }
        tx.commit().await?;

        info!(
            "Deleted photo {} ({}, {} votes)",
            photo_id, photo.filename, cleared
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VotePolicy;
    use crate::db::create_in_memory_pool;
    use crate::score::ScoreAggregator;
    use crate::voting_service::VotingService;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        admin: AdminService,
        ledger: VoteLedger,
        scores: ScoreAggregator,
        pool: DbPool,
        uploads: UploadStorage,
        _temp_dir: TempDir,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let pool = create_in_memory_pool().await.unwrap();
        let ledger = VoteLedger::new(pool.clone(), VotePolicy::throttled_daily());
        let uploads = UploadStorage::new(temp_dir.path()).unwrap();
        let admin = AdminService::new(
            pool.clone(),
            ledger.clone(),
            uploads.clone(),
            AdminCredentials::new("root", "hunter2"),
        );
        Fixture {
            admin,
            scores: ScoreAggregator::new(pool.clone(), ledger.clone()),
            ledger,
            pool,
            uploads,
            _temp_dir: temp_dir,
        }
    }

    async fn photo_with_votes(fx: &Fixture, votes: &[(&str, i64)]) -> i64 {
        let filename = fx.uploads.store("p.jpg", b"jpeg").await.unwrap();
        let photo = Photo::create(&fx.pool, &filename, None).await.unwrap();
        for (voter, vote) in votes {
            fx.ledger.put(photo.id, voter, *vote, Utc::now()).await.unwrap();
        }
        photo.id
    }

    #[test]
    fn test_credentials_require_both_values() {
        let creds = AdminCredentials::new("root", "hunter2");
        assert!(creds.verify("root", "hunter2"));
        assert!(!creds.verify("root", "hunter3"));
        assert!(!creds.verify("admin", "hunter2"));
        assert!(!creds.verify("", ""));
        assert_eq!(format!("{:?}", creds), "AdminCredentials(<redacted>)");
    }

    #[tokio::test]
    async fn test_override_forces_exact_score() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[("a", 1), ("b", 1), ("c", -1)]).await;

        fx.admin
            .override_score(photo_id, "root", "hunter2", &json!(42), Utc::now())
            .await
            .unwrap();

        assert_eq!(fx.scores.score(photo_id).await.unwrap(), Some(42));
        assert_eq!(fx.ledger.count_by_photo(photo_id).await.unwrap(), 1);
        let synthetic = fx.ledger.get(photo_id, ADMIN_VOTER).await.unwrap().unwrap();
        assert_eq!(synthetic.vote, 42);
    }

    #[tokio::test]
    async fn test_override_to_zero_leaves_no_rows() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[("a", 1), ("b", 1)]).await;

        fx.admin
            .override_score(photo_id, "root", "hunter2", &json!("0"), Utc::now())
            .await
            .unwrap();

        assert_eq!(fx.scores.score(photo_id).await.unwrap(), Some(0));
        assert_eq!(fx.ledger.count_by_photo(photo_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_override_with_bad_credentials_changes_nothing() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[("a", 1)]).await;

        let result = fx
            .admin
            .override_score(photo_id, "root", "wrong", &json!(10), Utc::now())
            .await;

        assert!(matches!(result, Err(ServiceError::Forbidden)));
        assert_eq!(fx.scores.score(photo_id).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_override_rejects_non_numeric_score() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[("a", 1)]).await;

        let result = fx
            .admin
            .override_score(photo_id, "root", "hunter2", &json!("lots"), Utc::now())
            .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(fx.scores.score(photo_id).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_override_rejects_score_beyond_limit() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[("a", 1)]).await;

        for score in [json!(i64::MAX), json!(MAX_OVERRIDE_SCORE + 1), json!(i64::MIN)] {
            let result = fx
                .admin
                .override_score(photo_id, "root", "hunter2", &score, Utc::now())
                .await;
            assert!(matches!(result, Err(ServiceError::Validation(_))));
        }
        assert_eq!(fx.scores.score(photo_id).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_votes_on_top_of_maximum_override_keep_listing_working() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[]).await;
        let other_id = photo_with_votes(&fx, &[("a", -1)]).await;
        let voting = VotingService::new(fx.pool.clone(), fx.ledger.clone());

        fx.admin
            .override_score(
                photo_id,
                "root",
                "hunter2",
                &json!(MAX_OVERRIDE_SCORE),
                Utc::now(),
            )
            .await
            .unwrap();
        voting
            .cast_vote(photo_id, "10.0.0.1", &json!(1), Utc::now())
            .await
            .unwrap();

        let photos = voting.list_photos().await.unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].id, photo_id);
        assert_eq!(photos[0].score, MAX_OVERRIDE_SCORE + 1);
        assert_eq!(photos[1].id, other_id);
        assert_eq!(photos[1].score, -1);
    }

    #[tokio::test]
    async fn test_override_unknown_photo() {
        let fx = setup().await;

        let result = fx
            .admin
            .override_score(404, "root", "hunter2", &json!(3), Utc::now())
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_admin_override_vote_is_subject_to_no_throttle() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[]).await;

        for target in [5, -3, 8] {
            fx.admin
                .override_score(photo_id, "root", "hunter2", &json!(target), Utc::now())
                .await
                .unwrap();
            assert_eq!(fx.scores.score(photo_id).await.unwrap(), Some(target));
        }
    }

    #[tokio::test]
    async fn test_delete_photo_removes_row_votes_and_file() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[("a", 1), ("b", -1)]).await;
        let photo = Photo::find_by_id(&fx.pool, photo_id).await.unwrap().unwrap();

        fx.admin
            .delete_photo(photo_id, "root", "hunter2")
            .await
            .unwrap();

        assert_eq!(Photo::find_by_id(&fx.pool, photo_id).await.unwrap(), None);
        assert_eq!(fx.ledger.count_by_photo(photo_id).await.unwrap(), 0);
        assert_eq!(fx.scores.score(photo_id).await.unwrap(), None);
        assert!(!fx.uploads.dir().join(&photo.filename).exists());
    }

    #[tokio::test]
    async fn test_delete_photo_errors() {
        let fx = setup().await;
        let photo_id = photo_with_votes(&fx, &[]).await;

        let forbidden = fx.admin.delete_photo(photo_id, "root", "nope").await;
        assert!(matches!(forbidden, Err(ServiceError::Forbidden)));
        assert!(Photo::exists(&fx.pool, photo_id).await.unwrap());

        let missing = fx.admin.delete_photo(photo_id + 1, "root", "hunter2").await;
        assert!(matches!(missing, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_photo_tolerates_missing_file() {
        let fx = setup().await;
        let photo = Photo::create(&fx.pool, "gone.jpg", None).await.unwrap();

        fx.admin
            .delete_photo(photo.id, "root", "hunter2")
            .await
            .unwrap();
        assert!(!Photo::exists(&fx.pool, photo.id).await.unwrap());
    }
}
