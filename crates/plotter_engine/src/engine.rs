use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use thiserror::Error;

use crate::api::{ReqwestUploadApi, UploadApi};
use crate::channel::{spawn_channel, ChannelHandle, ChannelSink};
use crate::{
    ApiError, ApiFailureKind, ChannelEvent, ClientSettings, EngineEvent, Generation, JobId,
};

const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("invalid client settings: {0}")]
    Settings(ApiError),
}

enum EngineCommand {
    RequestPresignedUrl {
        job_id: JobId,
        filename: String,
    },
    Upload {
        job_id: JobId,
        presigned_url: String,
        path: PathBuf,
        content_type: String,
    },
    Trigger {
        job_id: JobId,
        csv_filename: String,
        connection_id: String,
    },
    OpenChannel {
        generation: Generation,
    },
    SendFrame {
        generation: Generation,
        text: String,
    },
    CloseChannel {
        generation: Generation,
    },
}

/// Command side of the engine. Dropping it closes every open channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

/// Event side of the engine; events arrive in the order they happened.
pub struct EventReceiver {
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EventReceiver {
    /// Blocks until the next event; `None` once the engine is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl EngineHandle {
    pub fn start(settings: ClientSettings) -> Result<(Self, EventReceiver), EngineError> {
        let api = ReqwestUploadApi::new(&settings).map_err(EngineError::Settings)?;
        Self::with_api(settings, Arc::new(api))
    }

    /// Starts the engine with a custom API implementation.
    pub fn with_api(
        settings: ClientSettings,
        api: Arc<dyn UploadApi>,
    ) -> Result<(Self, EventReceiver), EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let mut channels: HashMap<Generation, ChannelHandle> = HashMap::new();
            {
                let _guard = runtime.enter();
                while let Ok(command) = cmd_rx.recv() {
                    handle_command(&runtime, &settings, &api, &event_tx, &mut channels, command);
                }
            }
            runtime.block_on(async {
                for (_, channel) in channels.drain() {
                    let _ = tokio::time::timeout(CLOSE_GRACE, channel.close()).await;
                }
            });
        });

        Ok((Self { cmd_tx }, EventReceiver { event_rx }))
    }

    pub fn request_presigned_url(&self, job_id: JobId, filename: impl Into<String>) {
        self.submit(EngineCommand::RequestPresignedUrl {
            job_id,
            filename: filename.into(),
        });
    }

    pub fn upload(
        &self,
        job_id: JobId,
        presigned_url: impl Into<String>,
        path: impl Into<PathBuf>,
        content_type: impl Into<String>,
    ) {
        self.submit(EngineCommand::Upload {
            job_id,
            presigned_url: presigned_url.into(),
            path: path.into(),
            content_type: content_type.into(),
        });
    }

    pub fn trigger_processing(
        &self,
        job_id: JobId,
        csv_filename: impl Into<String>,
        connection_id: impl Into<String>,
    ) {
        self.submit(EngineCommand::Trigger {
            job_id,
            csv_filename: csv_filename.into(),
            connection_id: connection_id.into(),
        });
    }

    pub fn open_channel(&self, generation: Generation) {
        self.submit(EngineCommand::OpenChannel { generation });
    }

    pub fn send_frame(&self, generation: Generation, text: impl Into<String>) {
        self.submit(EngineCommand::SendFrame {
            generation,
            text: text.into(),
        });
    }

    pub fn close_channel(&self, generation: Generation) {
        self.submit(EngineCommand::CloseChannel { generation });
    }

    fn submit(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_warn!("engine thread is gone; command dropped");
        }
    }
}

struct GenerationSink {
    generation: Generation,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ChannelSink for GenerationSink {
    fn emit(&self, event: ChannelEvent) {
        let _ = self.event_tx.send(EngineEvent::Channel {
            generation: self.generation,
            event,
        });
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    settings: &ClientSettings,
    api: &Arc<dyn UploadApi>,
    event_tx: &mpsc::Sender<EngineEvent>,
    channels: &mut HashMap<Generation, ChannelHandle>,
    command: EngineCommand,
) {
    match command {
        EngineCommand::RequestPresignedUrl { job_id, filename } => {
            let api = api.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = api.request_presigned_url(&filename).await;
                let _ = event_tx.send(EngineEvent::PresignedUrl { job_id, result });
            });
        }
        EngineCommand::Upload {
            job_id,
            presigned_url,
            path,
            content_type,
        } => {
            let api = api.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = match tokio::fs::read(&path).await {
                    Ok(body) => api.upload(&presigned_url, body, &content_type).await,
                    Err(err) => Err(ApiError::new(
                        ApiFailureKind::FileRead,
                        format!("{}: {err}", path.display()),
                    )),
                };
                let _ = event_tx.send(EngineEvent::Uploaded { job_id, result });
            });
        }
        EngineCommand::Trigger {
            job_id,
            csv_filename,
            connection_id,
        } => {
            let api = api.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = api.trigger_processing(&csv_filename, &connection_id).await;
                let _ = event_tx.send(EngineEvent::Triggered { job_id, result });
            });
        }
        EngineCommand::OpenChannel { generation } => {
            channels.retain(|_, channel| !channel.is_finished());
            let sink = Arc::new(GenerationSink {
                generation,
                event_tx: event_tx.clone(),
            });
            let channel = spawn_channel(settings.channel_url.clone(), settings.connect_timeout, sink);
            if let Some(previous) = channels.insert(generation, channel) {
                previous.request_close();
            }
        }
        EngineCommand::SendFrame { generation, text } => match channels.get(&generation) {
            Some(channel) => channel.send(text),
            None => engine_debug!("no channel {generation}; frame dropped"),
        },
        EngineCommand::CloseChannel { generation } => {
            if let Some(channel) = channels.remove(&generation) {
                channel.request_close();
            }
        }
    }
}
