use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The underlying byte stream failed mid-read
    #[error("Stream read error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StreamError {
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StreamError::Transport(err.into())
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
