use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] rocksdb::Error),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Marker file error: {0}")]
    Marker(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Another instance is already running (lock file: {0})")]
    Locked(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
