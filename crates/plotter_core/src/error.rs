use thiserror::Error;

/// Terminal failure of an upload job, tagged by the step that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("presigned URL missing: {detail}")]
    PresignedUrlMissing { detail: String },
    #[error("upload rejected: {detail}")]
    UploadRejected { status: Option<u16>, detail: String },
    #[error("processing trigger rejected: {detail}")]
    ProcessingTriggerRejected { status: Option<u16>, detail: String },
    #[error("connection id not known yet, processing trigger not sent")]
    MissingCorrelationKey,
}

/// Transport-level condition of the message channel. Observed through state only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelFault {
    #[error("channel error: {0}")]
    ChannelError(String),
    #[error("channel closed")]
    ChannelClosed,
}
