use thiserror::Error;

pub const CONNECTIVITY_MESSAGE: &str = "Couldn't communicate with server.";

/// Why a list or detail request produced no usable content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No response reached the client (network failure or timeout).
    #[error("Couldn't communicate with server. ({cause})")]
    Connectivity { cause: String },

    /// A response arrived with a failing status.
    #[error("{status} {reason}: {detail}")]
    Server {
        status: u16,
        reason: String,
        detail: String,
    },

    /// A successful response whose body could not be understood.
    #[error("Invalid response: {detail}")]
    InvalidPayload { detail: String },
}

/// What the user sees for a failed fetch: a short title and a detail line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub detail: String,
}

impl FetchError {
    pub fn connectivity(cause: impl Into<String>) -> Self {
        Self::Connectivity {
            cause: cause.into(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    pub fn notice(&self) -> Notice {
        match self {
            Self::Connectivity { .. } => Notice {
                title: "Connection error".to_string(),
                detail: CONNECTIVITY_MESSAGE.to_string(),
            },
            Self::Server {
                status,
                reason,
                detail,
            } => Notice {
                title: format!("{status} {reason}").trim_end().to_string(),
                detail: detail.clone(),
            },
            Self::InvalidPayload { detail } => Notice {
                title: "Invalid response".to_string(),
                detail: detail.clone(),
            },
        }
    }
}

impl Notice {
    /// Single-line form used by toasts and list placeholders.
    pub fn message(&self) -> String {
        if self.detail.is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.detail)
        }
    }
}
