//! Plotter core: pure upload/correlation state machine and view-model helpers.
mod effect;
mod error;
mod inbound;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, OutboundFrame};
pub use error::{ChannelFault, UploadError};
pub use inbound::InboundPayload;
pub use msg::Msg;
pub use state::{
    AppState, Connection, ConnectionState, CorrelationStore, Generation, JobId, Phase, ResultSet,
    SelectedFile, UploadJob, DEFAULT_CONTENT_TYPE,
};
pub use update::update;
pub use view_model::{AppViewModel, ConnectionView};
