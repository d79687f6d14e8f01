use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("unknown matcher key: {0}")]
    UnknownKey(String),
    #[error("unknown matcher group: {0}")]
    UnknownGroup(String),
    #[error("matcher config invalid: {0}")]
    InvalidConfig(String),
    #[error("duplicate matcher key at load: {0}")]
    DuplicateKey(String),
    #[error("expression references unknown leaf: {0}")]
    UnknownLeaf(String),
}

pub type Result<T> = std::result::Result<T, MatcherError>;
