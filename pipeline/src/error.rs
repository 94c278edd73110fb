use std::path::PathBuf;

/// Fatal start-of-run conditions. Everything downstream of a successfully
/// opened input recovers locally (skip the line, drop the record) instead
/// of surfacing an error.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("input path {0} does not exist")]
    MissingInput(PathBuf),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}
