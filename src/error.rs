#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("File storage error: {0}")]
    Io(#[from] anyhow::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    Forbidden,
    #[error("Photo not found")]
    NotFound,
    #[error("You have already voted on this photo recently, try again later")]
    RateLimited,
}

pub type ServiceResult<T> = Result<T, ServiceError>;
