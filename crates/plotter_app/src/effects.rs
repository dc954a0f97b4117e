use std::sync::mpsc;
use std::thread;

use engine_logging::{engine_debug, engine_warn};
use plotter_core::{Effect, Msg};
use plotter_engine::{
    ChannelEvent, ClientSettings, EngineError, EngineEvent, EngineHandle, EventReceiver,
};

/// Executes core effects on the engine and feeds engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: ClientSettings, msg_tx: mpsc::Sender<Msg>) -> Result<Self, EngineError> {
        let (engine, events) = EngineHandle::start(settings)?;
        spawn_event_loop(events, msg_tx);
        Ok(Self { engine })
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RequestPresignedUrl { job_id, filename } => {
                    engine_debug!("RequestPresignedUrl job_id={} filename={}", job_id, filename);
                    self.engine.request_presigned_url(job_id, filename);
                }
                Effect::UploadFile {
                    job_id,
                    presigned_url,
                    path,
                    content_type,
                } => {
                    engine_debug!("UploadFile job_id={} path={:?}", job_id, path);
                    self.engine.upload(job_id, presigned_url, path, content_type);
                }
                Effect::TriggerProcessing {
                    job_id,
                    csv_filename,
                    connection_id,
                } => {
                    engine_debug!(
                        "TriggerProcessing job_id={} connection_id={}",
                        job_id,
                        connection_id
                    );
                    self.engine
                        .trigger_processing(job_id, csv_filename, connection_id);
                }
                Effect::OpenChannel { generation } => self.engine.open_channel(generation),
                Effect::SendFrame { generation, frame } => {
                    self.engine.send_frame(generation, frame.encode());
                }
                Effect::CloseChannel { generation } => self.engine.close_channel(generation),
            }
        }
    }
}

fn spawn_event_loop(events: EventReceiver, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while let Some(event) = events.recv() {
            if msg_tx.send(map_event(event)).is_err() {
                break;
            }
        }
    });
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::PresignedUrl { job_id, result } => match result {
            Ok(reply) => Msg::PresignedUrlReceived {
                job_id,
                presigned_url: reply.presigned_url,
                error: reply.error,
            },
            Err(err) => request_failed(job_id, err),
        },
        EngineEvent::Uploaded { job_id, result } => match result {
            Ok(status) => Msg::UploadCompleted { job_id, status },
            Err(err) => request_failed(job_id, err),
        },
        EngineEvent::Triggered { job_id, result } => match result {
            Ok(reply) => Msg::TriggerCompleted {
                job_id,
                status: reply.status,
                error: reply.error,
            },
            Err(err) => request_failed(job_id, err),
        },
        EngineEvent::Channel { generation, event } => match event {
            ChannelEvent::Opened => Msg::ChannelOpened { generation },
            ChannelEvent::Message(raw) => Msg::ChannelMessage { generation, raw },
            ChannelEvent::Errored(message) => Msg::ChannelErrored {
                generation,
                message,
            },
            ChannelEvent::Closed => Msg::ChannelClosed { generation },
        },
    }
}

fn request_failed(job_id: u64, err: plotter_engine::ApiError) -> Msg {
    engine_warn!("job {} request failed: {}", job_id, err);
    Msg::RequestFailed {
        job_id,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotter_engine::{PresignReply, TriggerReply};

    #[test]
    fn replies_map_to_core_messages() {
        let msg = map_event(EngineEvent::PresignedUrl {
            job_id: 3,
            result: Ok(PresignReply {
                status: 400,
                presigned_url: None,
                error: Some("Missing filename".to_string()),
            }),
        });
        assert_eq!(
            msg,
            Msg::PresignedUrlReceived {
                job_id: 3,
                presigned_url: None,
                error: Some("Missing filename".to_string()),
            }
        );

        let msg = map_event(EngineEvent::Triggered {
            job_id: 3,
            result: Ok(TriggerReply {
                status: 202,
                error: None,
                body: None,
            }),
        });
        assert_eq!(
            msg,
            Msg::TriggerCompleted {
                job_id: 3,
                status: 202,
                error: None,
            }
        );
    }

    #[test]
    fn channel_events_keep_generation() {
        let msg = map_event(EngineEvent::Channel {
            generation: 2,
            event: ChannelEvent::Message("hello".to_string()),
        });
        assert_eq!(
            msg,
            Msg::ChannelMessage {
                generation: 2,
                raw: "hello".to_string(),
            }
        );
    }
}
