#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to decode input: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("an interaction session is already active ({active})")]
    SessionActive { active: String },
    #[error("no interaction session is active")]
    NoSession,
    #[error("{target} cannot be dragged: {reason}")]
    TargetUnavailable { target: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
