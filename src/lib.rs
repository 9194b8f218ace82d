pub mod admin;
pub mod config;
pub mod db;
pub mod db_pool;
pub mod db_schema;
pub mod error;
pub mod handlers_admin;
pub mod handlers_health;
pub mod handlers_photo;
pub mod handlers_vote;
pub mod identity;
pub mod routes;
pub mod score;
pub mod upload_storage;
pub mod vote_ledger;
pub mod voting_service;
pub mod warp_helpers;
