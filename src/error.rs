use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading PGN input, querying the opening
/// explorer, or writing feature rows.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("failed to open '{path}': {source}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path pattern '{pattern}': {source}")]
    PathPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("PGN read error in '{path}': {source}")]
    PgnRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid compression value '{0}'; supported values: 'zstd' or omitted")]
    Compression(String),

    #[error("illegal SAN '{san}' at ply {ply}")]
    IllegalSan { san: String, ply: usize },

    #[error("opening explorer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("opening explorer returned a malformed payload: {0}")]
    ExplorerPayload(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {0}")]
    ProgressTemplate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for Results using the crate's error type.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Collects per-game diagnostics into a single `; `-separated message.
/// Games with recoverable header problems keep their row; the message
/// lands in the `parse_error` field instead of aborting the batch.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}
