use bytes::BufMut;
use futures_util::TryStreamExt;
use log::{info, warn};
use warp::multipart::{FormData, Part};
use warp::{reject, Filter, Rejection, Reply};

use crate::db::{DbPool, Photo};
use crate::error::ServiceError;
use crate::upload_storage::UploadStorage;
use crate::voting_service::VotingService;
use crate::warp_helpers::{with_db, with_uploads, with_voting, ValidationError};

pub async fn list_photos(voting: VotingService) -> Result<impl Reply, Rejection> {
    let photos = voting.list_photos().await?;
    Ok(warp::reply::json(&photos))
}

async fn read_part(part: Part) -> Result<Vec<u8>, warp::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut data, chunk| {
            data.put(chunk);
            async move { Ok(data) }
        })
        .await
}

fn malformed_upload(e: warp::Error) -> Rejection {
    reject::custom(ValidationError {
        message: format!("Invalid upload: {}", e),
    })
}

pub async fn upload_photo(
    form: FormData,
    db_pool: DbPool,
    uploads: UploadStorage,
) -> Result<impl Reply, Rejection> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut display_name: Option<String> = None;
    let mut parts = std::pin::pin!(form);

    while let Some(part) = parts.try_next().await.map_err(malformed_upload)? {
        let field = part.name().to_string();
        match field.as_str() {
            "photo" => {
                let original_name = part.filename().unwrap_or_default().to_string();
                let data = read_part(part).await.map_err(malformed_upload)?;
                file = Some((original_name, data));
            }
            "name" => {
                let data = read_part(part).await.map_err(malformed_upload)?;
                display_name = String::from_utf8(data)
                    .ok()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty());
            }
            _ => {}
        }
    }

    let Some((original_name, data)) = file.filter(|(_, data)| !data.is_empty()) else {
        return Err(reject::custom(ValidationError {
            message: "No photo uploaded".to_string(),
        }));
    };

    let filename = uploads
        .store(&original_name, &data)
        .await
        .map_err(ServiceError::from)?;

    let photo = match Photo::create(&db_pool, &filename, display_name.as_deref()).await {
        Ok(photo) => photo,
        Err(e) => {
            if let Err(cleanup) = uploads.remove(&filename).await {
                warn!("Failed to remove orphaned upload {}: {}", filename, cleanup);
            }
            return Err(ServiceError::from(e).into());
        }
    };

    info!(
        "Uploaded photo {} as {} ({} bytes)",
        photo.id,
        photo.filename,
        data.len()
    );
    Ok(warp::reply::json(&photo))
}

pub fn build_photo_routes(
    db_pool: DbPool,
    voting: VotingService,
    uploads: UploadStorage,
    max_upload_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let list_route = warp::path("photos")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_voting(voting))
        .and_then(list_photos);

    let upload_route = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload_bytes))
        .and(with_db(db_pool))
        .and(with_uploads(uploads))
        .and_then(upload_photo);

    list_route.or(upload_route)
}
