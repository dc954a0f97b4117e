use crate::{ChannelFault, JobId, Phase, UploadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionView {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closed,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub connection: ConnectionView,
    pub connection_id: Option<String>,
    pub selected_file: Option<String>,
    pub job_id: Option<JobId>,
    pub phase: Option<Phase>,
    pub status: String,
    pub error: Option<UploadError>,
    pub channel_fault: Option<ChannelFault>,
    pub messages: Vec<String>,
    /// Named result URLs, ordered by name.
    pub result_slots: Vec<(String, String)>,
    pub processed_message: Option<String>,
    pub can_submit: bool,
    pub can_send: bool,
    pub dirty: bool,
}
