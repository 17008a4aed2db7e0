use thiserror::Error;

pub type BinResult<T> = Result<T, BinError>;

#[derive(Error, Debug)]
pub enum BinError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for BinError {
    fn from(err: config::ConfigError) -> Self {
        BinError::Config(err.to_string())
    }
}
