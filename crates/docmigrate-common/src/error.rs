use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("metadata query error: {0}")]
    Metadata(String),

    #[error("ddl error: {0}")]
    Ddl(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the failure happened before the server accepted a session.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}
