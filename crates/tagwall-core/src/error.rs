use thiserror::Error;

/// Transient failure talking to the listing site. Aborts the current
/// fill or enrichment cycle only; callers may retry manually.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn transport(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        FetchError::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        FetchError::Status {
            url: url.into(),
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("task was dropped before it produced a result")]
    Dropped,
}

#[derive(Debug, Error)]
pub enum WallError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("store: {0:#}")]
    Store(#[from] anyhow::Error),
}
