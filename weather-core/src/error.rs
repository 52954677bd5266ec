use thiserror::Error;

/// Failure of a single fetch. The controller only ever shows its message.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Parse(String),
}

impl FetchError {
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::Parse(_))
    }
}
