use crate::{Generation, JobId, SelectedFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a file; replaces any previous job.
    FileSelected(SelectedFile),
    /// User asked to upload the selected file.
    UploadSubmitted,
    /// Reply of the URL-issuing API.
    PresignedUrlReceived {
        job_id: JobId,
        presigned_url: Option<String>,
        error: Option<String>,
    },
    /// Object storage answered the PUT.
    UploadCompleted { job_id: JobId, status: u16 },
    /// Processing-trigger API answered.
    TriggerCompleted {
        job_id: JobId,
        status: u16,
        error: Option<String>,
    },
    /// A request of the current step never produced a response.
    RequestFailed { job_id: JobId, message: String },
    /// Observer has read the results of a job awaiting them.
    ResultsAcknowledged,
    /// Open a fresh channel connection.
    ConnectRequested,
    ChannelOpened { generation: Generation },
    ChannelClosed { generation: Generation },
    ChannelErrored {
        generation: Generation,
        message: String,
    },
    ChannelMessage { generation: Generation, raw: String },
    /// User typed a chat line.
    ChatSubmitted(String),
    /// Owner is tearing down; close the channel.
    ShutdownRequested,
    /// Render tick.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
