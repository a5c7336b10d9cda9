use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a pull. A window that simply carries no `value`
/// field is not an error; the fetcher records it and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error fetching {code} ({start_year}-{end_year})")]
    Transport {
        code: String,
        start_year: i32,
        end_year: i32,
        #[source]
        source: reqwest::Error,
    },

    #[error("BLS API returned {status} for {code} ({start_year}-{end_year}).\nBody:\n{body}")]
    Status {
        code: String,
        start_year: i32,
        end_year: i32,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid JSON from BLS API for {code} ({start_year}-{end_year})")]
    MalformedResponse {
        code: String,
        start_year: i32,
        end_year: i32,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected BLS response for {code} ({start_year}-{end_year}): missing 'Results.series'")]
    MissingSeries {
        code: String,
        start_year: i32,
        end_year: i32,
    },

    #[error("Failed to read series table {path}")]
    Input {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Column '{column}' not found in {path} (available: {available})")]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: String,
    },

    #[error("Failed to write {path}")]
    Output {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write progress to the console")]
    Console(#[source] std::io::Error),

    #[error("Failed to create output directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// True for the errors raised while talking to the remote API.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. }
                | FetchError::Status { .. }
                | FetchError::MalformedResponse { .. }
                | FetchError::MissingSeries { .. }
        )
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
