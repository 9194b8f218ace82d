use std::env;
use std::fmt;
use std::str::FromStr;

use crate::admin::AdminCredentials;

const DEFAULT_VOTE_WINDOW_SECS: i64 = 24 * 60 * 60;

/// How the vote ledger treats a second vote from the same voter on the same photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotePolicy {
    /// Last vote wins, no time restriction.
    Replace,
    /// A re-vote is only accepted once `window_secs` have passed since the stored vote.
    Throttled { window_secs: i64 },
}

impl VotePolicy {
    pub fn throttled_daily() -> Self {
        VotePolicy::Throttled {
            window_secs: DEFAULT_VOTE_WINDOW_SECS,
        }
    }
}

impl Default for VotePolicy {
    fn default() -> Self {
        VotePolicy::throttled_daily()
    }
}

impl fmt::Display for VotePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VotePolicy::Replace => write!(f, "replace"),
            VotePolicy::Throttled { window_secs } => write!(f, "throttled ({}s)", window_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicy(pub String);

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown vote policy '{}', expected 'throttled' or 'replace'",
            self.0
        )
    }
}

impl std::error::Error for UnknownPolicy {}

impl FromStr for VotePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "throttled" => Ok(VotePolicy::throttled_daily()),
            "replace" | "unthrottled" => Ok(VotePolicy::Replace),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub db_path: String,
    pub upload_dir: String,
    pub public_dir: String,
    pub admin: AdminCredentials,
    pub vote_policy: VotePolicy,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mut vote_policy: VotePolicy = env::var("PHOTO_VOTE_VOTE_POLICY")
            .unwrap_or_else(|_| "throttled".to_string())
            .parse()?;

        if let VotePolicy::Throttled { window_secs } = &mut vote_policy {
            *window_secs = env::var("PHOTO_VOTE_VOTE_WINDOW_SECS")
                .unwrap_or_else(|_| DEFAULT_VOTE_WINDOW_SECS.to_string())
                .parse()?;
        }

        let admin_username = env::var("PHOTO_VOTE_ADMIN_USERNAME").ok();
        let admin_password = env::var("PHOTO_VOTE_ADMIN_PASSWORD").ok();
        if admin_username.is_none() || admin_password.is_none() {
            log::warn!("Admin credentials not fully configured, falling back to built-in defaults");
        }

        let max_upload_mb: u64 = env::var("PHOTO_VOTE_MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "20".to_string())
            .parse()?;

        Ok(Config {
            port: env::var("PHOTO_VOTE_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            host: env::var("PHOTO_VOTE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            db_path: env::var("PHOTO_VOTE_DB_PATH")
                .unwrap_or_else(|_| "./data/photo-vote.db".to_string()),
            upload_dir: env::var("PHOTO_VOTE_UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".to_string()),
            public_dir: env::var("PHOTO_VOTE_PUBLIC_DIR")
                .unwrap_or_else(|_| "./public".to_string()),
            admin: AdminCredentials::new(
                admin_username.unwrap_or_else(|| "15963".to_string()),
                admin_password.unwrap_or_else(|| "75321".to_string()),
            ),
            vote_policy,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}
