use reqwest::StatusCode;
use thiserror::Error;

const BODY_EXCERPT_CHARS: usize = 200;

/// Why a single indexer call did not produce a result.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Request failed with status {status}")]
    Http { status: StatusCode },

    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse response: {source} (body: {body_excerpt})")]
    Parse {
        source: serde_json::Error,
        body_excerpt: String,
    },
}

impl SyncError {
    pub fn parse(source: serde_json::Error, body: &str) -> Self {
        Self::Parse {
            source,
            body_excerpt: body.chars().take(BODY_EXCERPT_CHARS).collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Transport(_) => "transport",
            Self::Parse { .. } => "parse",
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status } => Some(*status),
            Self::Transport(e) => e.status(),
            Self::Parse { .. } => None,
        }
    }
}
