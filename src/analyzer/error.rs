use thiserror::Error;

use crate::matcher::MatcherError;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Matcher(#[from] MatcherError),
    #[error("ocr failure: {0}")]
    Ocr(String),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
