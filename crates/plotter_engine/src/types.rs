use std::fmt;

pub type JobId = u64;
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PresignedUrl {
        job_id: JobId,
        result: Result<PresignReply, ApiError>,
    },
    Uploaded {
        job_id: JobId,
        result: Result<u16, ApiError>,
    },
    Triggered {
        job_id: JobId,
        result: Result<TriggerReply, ApiError>,
    },
    Channel {
        generation: Generation,
        event: ChannelEvent,
    },
}

/// Transport events of one channel connection, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Message(String),
    Errored(String),
    Closed,
}

/// Response of `POST /get-presigned-url`, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignReply {
    pub status: u16,
    pub presigned_url: Option<String>,
    pub error: Option<String>,
}

/// Response of `POST /process-csv`. The body shape is not part of the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerReply {
    pub status: u16,
    pub error: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiFailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: ApiFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFailureKind {
    InvalidUrl,
    Timeout,
    Network,
    FileRead,
}

impl fmt::Display for ApiFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFailureKind::InvalidUrl => write!(f, "invalid url"),
            ApiFailureKind::Timeout => write!(f, "timeout"),
            ApiFailureKind::Network => write!(f, "network error"),
            ApiFailureKind::FileRead => write!(f, "could not read file"),
        }
    }
}
