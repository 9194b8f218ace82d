use log::{error, info};
use std::net::{IpAddr, TcpListener};

use photo_vote::config::Config;
use photo_vote::db;
use photo_vote::routes::{build_routes, AppServices};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let host: IpAddr = config.host.parse()?;
    let port = config.port;

    info!("Starting photo-vote server on {}:{}", host, port);
    info!("Database: {}", config.db_path);
    info!("Upload directory: {}", config.upload_dir);
    info!("Public directory: {}", config.public_dir);
    info!("Vote policy: {}", config.vote_policy);

    // Check if port is available BEFORE initializing services
    if !is_port_available(host, port) {
        error!(
            "Port {} is already in use. Stop the other process or set PHOTO_VOTE_PORT.",
            port
        );
        return Err(format!("Port {} is already in use", port).into());
    }

    let db_pool = db::create_db_pool(&config.db_path).await?;
    info!("Database initialized successfully");

    let services = AppServices::from_config(&config, db_pool)?;
    let routes = build_routes(services);

    info!(
        "Server started successfully, listening on http://{}:{}",
        host, port
    );

    warp::serve(routes).run((host, port)).await;

    Ok(())
}

fn is_port_available(host: IpAddr, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}
