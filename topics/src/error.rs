use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopicManagerError {
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("topic manager backend error: {0}")]
    Backend(String),
}
