use engine_logging::{engine_debug, engine_trace, engine_warn};

use crate::{
    AppState, ChannelFault, ConnectionState, Effect, InboundPayload, JobId, Msg, OutboundFrame,
    Phase, UploadError,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(file) => {
            state.select_file(file);
            Vec::new()
        }
        Msg::UploadSubmitted => submit(&mut state),
        Msg::PresignedUrlReceived {
            job_id,
            presigned_url,
            error,
        } => {
            let Some(job) = state.job_at(job_id, Phase::RequestingUrl) else {
                engine_trace!("ignoring presigned URL reply for job {job_id}");
                return (state, Vec::new());
            };
            match presigned_url.filter(|raw| is_usable_url(raw)) {
                Some(presigned_url) => {
                    job.enter(Phase::Uploading, "Uploading...");
                    vec![Effect::UploadFile {
                        job_id,
                        presigned_url,
                        path: job.file.path.clone(),
                        content_type: job.file.upload_content_type().to_string(),
                    }]
                }
                None => {
                    let detail = error.unwrap_or_else(|| "No presigned URL returned".to_string());
                    job.fail(UploadError::PresignedUrlMissing { detail });
                    Vec::new()
                }
            }
        }
        Msg::UploadCompleted { job_id, status } => {
            let key = state.correlation().correlation_key().map(ToOwned::to_owned);
            let Some(job) = state.job_at(job_id, Phase::Uploading) else {
                engine_trace!("ignoring upload reply for job {job_id}");
                return (state, Vec::new());
            };
            if !(200..300).contains(&status) {
                job.fail(UploadError::UploadRejected {
                    status: Some(status),
                    detail: format!("storage responded with status {status}"),
                });
                return (state, Vec::new());
            }
            job.enter(Phase::TriggeringProcessing, "Uploaded! Starting processing...");
            match key {
                Some(connection_id) => vec![Effect::TriggerProcessing {
                    job_id,
                    csv_filename: job.file.name.clone(),
                    connection_id,
                }],
                None => {
                    job.fail(UploadError::MissingCorrelationKey);
                    Vec::new()
                }
            }
        }
        Msg::TriggerCompleted {
            job_id,
            status,
            error,
        } => {
            let Some(job) = state.job_at(job_id, Phase::TriggeringProcessing) else {
                engine_trace!("ignoring trigger reply for job {job_id}");
                return (state, Vec::new());
            };
            if status == 202 {
                job.enter(
                    Phase::AwaitingResults,
                    "Processing started, waiting for results...",
                );
            } else {
                let detail = error.unwrap_or_else(|| format!("processing API responded with status {status}"));
                job.fail(UploadError::ProcessingTriggerRejected {
                    status: Some(status),
                    detail,
                });
            }
            Vec::new()
        }
        Msg::RequestFailed { job_id, message } => {
            request_failed(&mut state, job_id, message);
            Vec::new()
        }
        Msg::ResultsAcknowledged => {
            if let Some(job) = state.job_mut() {
                if job.phase == Phase::AwaitingResults {
                    job.enter(Phase::Succeeded, "Done.");
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::ConnectRequested => {
            if state.connection().is_some_and(|conn| conn.is_live()) {
                return (state, Vec::new());
            }
            let generation = state.open_connection();
            engine_debug!("opening channel generation {generation}");
            vec![Effect::OpenChannel { generation }]
        }
        Msg::ChannelOpened { generation } => {
            let request_id = state.requests_connection_id_on_open();
            let Some(conn) = state.connection_at(generation) else {
                return (state, Vec::new());
            };
            if conn.state != ConnectionState::Connecting {
                return (state, Vec::new());
            }
            conn.state = ConnectionState::Open;
            engine_debug!("channel generation {generation} open");
            if request_id {
                vec![Effect::SendFrame {
                    generation,
                    frame: OutboundFrame::GetConnectionId,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::ChannelErrored {
            generation,
            message,
        } => {
            if let Some(conn) = state.connection_at(generation) {
                if conn.state != ConnectionState::Closed {
                    engine_warn!("channel generation {generation} errored: {message}");
                    conn.state = ConnectionState::Errored;
                    conn.fault = Some(ChannelFault::ChannelError(message));
                }
            }
            Vec::new()
        }
        Msg::ChannelClosed { generation } => {
            if let Some(conn) = state.connection_at(generation) {
                engine_debug!("channel generation {generation} closed");
                conn.state = ConnectionState::Closed;
                if conn.fault.is_none() {
                    conn.fault = Some(ChannelFault::ChannelClosed);
                }
            }
            Vec::new()
        }
        Msg::ChannelMessage { generation, raw } => {
            if state.connection_at(generation).is_none() {
                engine_trace!("dropping message for stale channel generation {generation}");
                return (state, Vec::new());
            }
            let payload = InboundPayload::parse(&raw);
            state.log_line(raw);
            if let Some(payload) = payload {
                state.apply_inbound(payload);
            }
            Vec::new()
        }
        Msg::ChatSubmitted(text) => {
            let generation = match state.connection() {
                Some(conn) if conn.state == ConnectionState::Open => conn.generation,
                _ => return (state, Vec::new()),
            };
            if text.trim().is_empty() {
                return (state, Vec::new());
            }
            state.log_line(format!("You: {text}"));
            vec![Effect::SendFrame {
                generation,
                frame: OutboundFrame::SendMessage { message: text },
            }]
        }
        Msg::ShutdownRequested => match state.connection() {
            Some(conn) if conn.is_live() => vec![Effect::CloseChannel {
                generation: conn.generation,
            }],
            _ => Vec::new(),
        },
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState) -> Vec<Effect> {
    if state.job().is_some_and(|job| job.phase.is_in_flight()) {
        return Vec::new();
    }
    let Some(job) = state.start_job() else {
        return Vec::new();
    };
    job.enter(Phase::RequestingUrl, "Requesting presigned URL...");
    vec![Effect::RequestPresignedUrl {
        job_id: job.id,
        filename: job.file.name.clone(),
    }]
}

/// Transport failure of whichever request the job is currently waiting on.
fn request_failed(state: &mut AppState, job_id: JobId, message: String) {
    let Some(job) = state.job_mut().filter(|job| job.id == job_id) else {
        return;
    };
    let error = match job.phase {
        Phase::RequestingUrl => UploadError::PresignedUrlMissing { detail: message },
        Phase::Uploading => UploadError::UploadRejected {
            status: None,
            detail: message,
        },
        Phase::TriggeringProcessing => UploadError::ProcessingTriggerRejected {
            status: None,
            detail: message,
        },
        _ => return,
    };
    job.fail(error);
    state.mark_dirty();
}

fn is_usable_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"))
}
