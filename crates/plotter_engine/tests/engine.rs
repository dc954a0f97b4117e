use std::io::Write;
use std::time::Duration;

use plotter_engine::{
    ApiFailureKind, ChannelEvent, ClientSettings, EngineEvent, EngineHandle, EventReceiver,
};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn next(events: &EventReceiver) -> EngineEvent {
    events.recv_timeout(WAIT).expect("engine event")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn engine_runs_upload_protocol_steps() {
    let rt = runtime();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-presigned-url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "presigned_url": format!("{}/bucket/data.csv", server.uri()),
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/bucket/data.csv"))
            .and(header("content-type", "text/csv"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/process-csv"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        server
    });

    let settings = ClientSettings {
        api_base_url: server.uri(),
        ..ClientSettings::default()
    };
    let (engine, events) = EngineHandle::start(settings).unwrap();

    engine.request_presigned_url(1, "data.csv");
    let presigned_url = match next(&events) {
        EngineEvent::PresignedUrl {
            job_id: 1,
            result: Ok(reply),
        } => reply.presigned_url.expect("url"),
        other => panic!("unexpected event {other:?}"),
    };

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"x,y\n1,2\n").unwrap();
    engine.upload(1, presigned_url, file.path(), "text/csv");
    assert_eq!(
        next(&events),
        EngineEvent::Uploaded {
            job_id: 1,
            result: Ok(200)
        }
    );

    engine.trigger_processing(1, "data.csv", "conn-1");
    match next(&events) {
        EngineEvent::Triggered {
            job_id: 1,
            result: Ok(reply),
        } => assert_eq!(reply.status, 202),
        other => panic!("unexpected event {other:?}"),
    }
    drop(server);
}

#[test]
fn missing_local_file_is_reported_as_upload_failure() {
    let (engine, events) = EngineHandle::start(ClientSettings::default()).unwrap();

    engine.upload(
        4,
        "http://127.0.0.1:9/bucket/data.csv",
        "/definitely/not/here.csv",
        "text/csv",
    );

    match next(&events) {
        EngineEvent::Uploaded {
            job_id: 4,
            result: Err(err),
        } => assert_eq!(err.kind, ApiFailureKind::FileRead),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn channel_events_are_tagged_with_generation() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let settings = ClientSettings {
        channel_url: url,
        ..ClientSettings::default()
    };
    let (engine, events) = EngineHandle::start(settings).unwrap();

    engine.open_channel(7);

    assert!(matches!(
        next(&events),
        EngineEvent::Channel {
            generation: 7,
            event: ChannelEvent::Errored(_)
        }
    ));
    assert_eq!(
        next(&events),
        EngineEvent::Channel {
            generation: 7,
            event: ChannelEvent::Closed
        }
    );
}

#[test]
fn invalid_api_base_is_rejected_at_start() {
    let settings = ClientSettings {
        api_base_url: "not a url".to_string(),
        ..ClientSettings::default()
    };

    assert!(EngineHandle::start(settings).is_err());
}
