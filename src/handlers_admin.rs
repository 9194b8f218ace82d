use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use warp::{Filter, Rejection, Reply};

use crate::admin::AdminService;
use crate::handlers_vote::json_or_form;
use crate::warp_helpers::with_admin;

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub score: Value,
}

pub async fn delete_photo(
    photo_id: i64,
    request: DeleteRequest,
    admin: AdminService,
) -> Result<impl Reply, Rejection> {
    admin
        .delete_photo(photo_id, &request.username, &request.password)
        .await?;
    Ok(warp::reply::json(&json!({ "success": true })))
}

pub async fn update_score(
    photo_id: i64,
    request: UpdateScoreRequest,
    admin: AdminService,
) -> Result<impl Reply, Rejection> {
    admin
        .override_score(
            photo_id,
            &request.username,
            &request.password,
            &request.score,
            Utc::now(),
        )
        .await?;
    Ok(warp::reply::json(&json!({ "success": true })))
}

pub fn build_admin_routes(
    admin: AdminService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let delete_route = warp::path!("delete" / i64)
        .and(warp::post())
        .and(json_or_form::<DeleteRequest>())
        .and(with_admin(admin.clone()))
        .and_then(delete_photo);

    let update_score_route = warp::path!("admin" / "updateScore" / i64)
        .and(warp::post())
        .and(json_or_form::<UpdateScoreRequest>())
        .and(with_admin(admin))
        .and_then(update_score);

    delete_route.or(update_score_route)
}
