//! Plotter engine: HTTP upload client, message channel transport and effect execution.
mod api;
mod channel;
mod engine;
mod settings;
mod types;

pub use api::{ReqwestUploadApi, UploadApi};
pub use channel::{spawn_channel, ChannelHandle, ChannelSink};
pub use engine::{EngineError, EngineHandle, EventReceiver};
pub use settings::ClientSettings;
pub use types::{
    ApiError, ApiFailureKind, ChannelEvent, EngineEvent, Generation, JobId, PresignReply,
    TriggerReply,
};
