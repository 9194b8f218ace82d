use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use warp::{Filter, Rejection, Reply};

use crate::identity::voter_identity;
use crate::voting_service::VotingService;
use crate::warp_helpers::with_voting;

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub vote: Value,
}

/// Small request bodies posted either as JSON or as a urlencoded form.
pub fn json_or_form<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(
        warp::body::json::<T>()
            .or(warp::body::form::<T>())
            .unify(),
    )
}

pub async fn cast_vote(
    photo_id: i64,
    voter: String,
    request: VoteRequest,
    voting: VotingService,
) -> Result<impl Reply, Rejection> {
    voting
        .cast_vote(photo_id, &voter, &request.vote, Utc::now())
        .await?;
    Ok(warp::reply::json(&json!({ "success": true })))
}

pub fn build_vote_routes(
    voting: VotingService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("vote" / i64)
        .and(warp::post())
        .and(voter_identity())
        .and(json_or_form::<VoteRequest>())
        .and(with_voting(voting))
        .and_then(cast_vote)
}
