use std::path::PathBuf;

use crate::{Generation, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// POST the file name to the URL-issuing API.
    RequestPresignedUrl { job_id: JobId, filename: String },
    /// PUT the file bytes to the presigned URL.
    UploadFile {
        job_id: JobId,
        presigned_url: String,
        path: PathBuf,
        content_type: String,
    },
    /// POST the processing trigger, correlated by connection id.
    TriggerProcessing {
        job_id: JobId,
        csv_filename: String,
        connection_id: String,
    },
    OpenChannel { generation: Generation },
    SendFrame {
        generation: Generation,
        frame: OutboundFrame,
    },
    CloseChannel { generation: Generation },
}

/// Client-originated channel messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    SendMessage { message: String },
    GetConnectionId,
}

impl OutboundFrame {
    /// Wire form: a JSON object with an `action` discriminator.
    pub fn encode(&self) -> String {
        let value = match self {
            OutboundFrame::SendMessage { message } => serde_json::json!({
                "action": "sendmessage",
                "message": message,
            }),
            OutboundFrame::GetConnectionId => serde_json::json!({
                "action": "get_connection_id",
            }),
        };
        value.to_string()
    }
}
