use serde::Serialize;
use std::convert::Infallible;

use warp::{reject, Filter, Rejection, Reply};

use crate::admin::AdminService;
use crate::db::DbPool;
use crate::error::ServiceError;
use crate::upload_storage::UploadStorage;
use crate::voting_service::VotingService;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub message: String,
}

impl reject::Reject for DatabaseError {}

#[derive(Debug)]
pub struct NotFoundError;
impl reject::Reject for NotFoundError {}

#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl reject::Reject for ValidationError {}

#[derive(Debug)]
pub struct ForbiddenError;
impl reject::Reject for ForbiddenError {}

#[derive(Debug)]
pub struct RateLimitedError {
    pub message: String,
}

impl reject::Reject for RateLimitedError {}

impl From<ServiceError> for Rejection {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(_) | ServiceError::Io(_) => {
                log::error!("{}", err);
                reject::custom(DatabaseError {
                    message: err.to_string(),
                })
            }
            ServiceError::Validation(message) => reject::custom(ValidationError { message }),
            ServiceError::Forbidden => reject::custom(ForbiddenError),
            ServiceError::NotFound => reject::custom(NotFoundError),
            ServiceError::RateLimited => reject::custom(RateLimitedError {
                message: err.to_string(),
            }),
        }
    }
}

pub fn with_db(db_pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

pub fn with_voting(
    voting: VotingService,
) -> impl Filter<Extract = (VotingService,), Error = Infallible> + Clone {
    warp::any().map(move || voting.clone())
}

pub fn with_admin(
    admin: AdminService,
) -> impl Filter<Extract = (AdminService,), Error = Infallible> + Clone {
    warp::any().map(move || admin.clone())
}

pub fn with_uploads(
    uploads: UploadStorage,
) -> impl Filter<Extract = (UploadStorage,), Error = Infallible> + Clone {
    warp::any().map(move || uploads.clone())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(database_error) = err.find::<DatabaseError>() {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = database_error.message.clone();
    } else if err.find::<NotFoundError>().is_some() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Photo not found".to_string();
    } else if let Some(validation_error) = err.find::<ValidationError>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = validation_error.message.clone();
    } else if err.find::<ForbiddenError>().is_some() {
        code = warp::http::StatusCode::FORBIDDEN;
        message = "Invalid credentials".to_string();
    } else if let Some(rate_limited) = err.find::<RateLimitedError>() {
        code = warp::http::StatusCode::TOO_MANY_REQUESTS;
        message = rate_limited.message.clone();
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = format!("Invalid request body: {}", body_error);
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = warp::http::StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        code = warp::http::StatusCode::LENGTH_REQUIRED;
        message = "Content-Length required".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = warp::http::StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
}
