use std::convert::Infallible;
use std::path::PathBuf;
use warp::Filter;

use crate::admin::AdminService;
use crate::config::Config;
use crate::db::DbPool;
use crate::handlers_admin::build_admin_routes;
use crate::handlers_health::build_health_routes;
use crate::handlers_photo::build_photo_routes;
use crate::handlers_vote::build_vote_routes;
use crate::upload_storage::UploadStorage;
use crate::vote_ledger::VoteLedger;
use crate::voting_service::VotingService;
use crate::warp_helpers::{cors, handle_rejection};

/// Everything the HTTP layer hands out to handlers.
#[derive(Clone)]
pub struct AppServices {
    pub db_pool: DbPool,
    pub voting: VotingService,
    pub admin: AdminService,
    pub uploads: UploadStorage,
    pub public_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl AppServices {
    pub fn from_config(
        config: &Config,
        db_pool: DbPool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let uploads = UploadStorage::new(&config.upload_dir)?;
        let ledger = VoteLedger::new(db_pool.clone(), config.vote_policy);
        let voting = VotingService::new(db_pool.clone(), ledger.clone());
        let admin = AdminService::new(
            db_pool.clone(),
            ledger,
            uploads.clone(),
            config.admin.clone(),
        );

        Ok(Self {
            db_pool,
            voting,
            admin,
            uploads,
            public_dir: PathBuf::from(&config.public_dir),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

fn build_static_routes(
    public_dir: PathBuf,
    uploads: &UploadStorage,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let public = warp::fs::dir(public_dir);
    let uploaded = warp::fs::dir(uploads.dir().to_path_buf());

    warp::get().and(public.or(uploaded))
}

pub fn build_routes(
    services: AppServices,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let health_routes = build_health_routes(services.db_pool.clone());
    let photo_routes = build_photo_routes(
        services.db_pool.clone(),
        services.voting.clone(),
        services.uploads.clone(),
        services.max_upload_bytes,
    );
    let vote_routes = build_vote_routes(services.voting.clone());
    let admin_routes = build_admin_routes(services.admin.clone());
    let static_routes = build_static_routes(services.public_dir, &services.uploads);

    health_routes
        .or(photo_routes)
        .or(vote_routes)
        .or(admin_routes)
        .or(static_routes)
        .with(cors())
        .with(warp::log("photo_vote"))
        .recover(handle_rejection)
}
