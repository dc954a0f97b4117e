use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use engine_logging::{engine_info, engine_warn};
use plotter_core::{update, AppState, Msg, Phase, SelectedFile};

use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::render::TerminalRenderer;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Owns the state and applies messages one at a time, in arrival order.
pub struct App {
    state: AppState,
    msg_rx: mpsc::Receiver<Msg>,
    msg_tx: mpsc::Sender<Msg>,
    runner: EffectRunner,
    renderer: TerminalRenderer,
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(config.client_settings(), msg_tx.clone())
            .context("failed to start engine")?;
        let state = AppState::new().with_connection_id_request(config.request_connection_id_on_open);
        Ok(Self {
            state,
            msg_rx,
            msg_tx,
            runner,
            renderer: TerminalRenderer::new(),
            config,
        })
    }

    /// Connects, uploads `path`, and waits for result URLs.
    pub fn upload(&mut self, path: &Path, wait: Option<Duration>) -> anyhow::Result<()> {
        let file = select_file(path)?;
        let grace = Duration::from_secs(self.config.connect_grace_secs);
        let wait = wait.unwrap_or(Duration::from_secs(self.config.result_wait_secs));

        self.dispatch(Msg::ConnectRequested);
        self.pump_until(Some(Instant::now() + grace), |state| {
            state.correlation().correlation_key().is_some() || !channel_live(state)
        });
        if self.state.correlation().correlation_key().is_none() {
            engine_warn!("no connection id yet; submitting anyway");
        }

        self.dispatch(Msg::FileSelected(file));
        self.dispatch(Msg::UploadSubmitted);
        self.pump_until(Some(Instant::now() + wait), upload_settled);

        let phase = self.state.job().map(|job| job.phase);
        let error = self.state.job().and_then(|job| job.error.clone());
        let outcome = match phase {
            Some(Phase::Failed) => Err(match error {
                Some(error) => anyhow!("upload failed: {error}"),
                None => anyhow!("upload failed"),
            }),
            Some(Phase::AwaitingResults) if !self.state.correlation().result_slots().is_empty() => {
                self.dispatch(Msg::ResultsAcknowledged);
                Ok(())
            }
            Some(Phase::AwaitingResults) => Err(anyhow!(
                "processing started but no results arrived within {}s",
                wait.as_secs()
            )),
            Some(phase) => Err(anyhow!("upload stopped in phase {phase:?}")),
            None => Err(anyhow!("upload was not started")),
        };
        self.shutdown();
        outcome
    }

    /// Connects and relays stdin lines as chat messages until stdin ends or the channel closes.
    pub fn chat(&mut self) -> anyhow::Result<()> {
        self.dispatch(Msg::ConnectRequested);

        let msg_tx = self.msg_tx.clone();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if msg_tx.send(Msg::ChatSubmitted(line)).is_err() {
                    return;
                }
            }
            let _ = msg_tx.send(Msg::ShutdownRequested);
        });

        self.pump_until(None, |state| !channel_live(state));
        engine_info!("chat finished");
        self.shutdown();
        Ok(())
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            for line in self.renderer.render(&state.view()) {
                println!("{line}");
            }
        }
        self.state = state;
        self.runner.run(effects);
    }

    /// Applies incoming messages until `done` holds or `deadline` passes.
    fn pump_until(&mut self, deadline: Option<Instant>, done: impl Fn(&AppState) -> bool) {
        loop {
            if done(&self.state) {
                return;
            }
            let msg = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return;
                    }
                    match self.msg_rx.recv_timeout(remaining) {
                        Ok(msg) => msg,
                        Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return,
                    }
                }
                None => match self.msg_rx.recv() {
                    Ok(msg) => msg,
                    Err(_) => return,
                },
            };
            self.dispatch(msg);
        }
    }

    fn shutdown(&mut self) {
        self.dispatch(Msg::ShutdownRequested);
        self.pump_until(Some(Instant::now() + SHUTDOWN_GRACE), |state| {
            !channel_live(state)
        });
    }
}

fn channel_live(state: &AppState) -> bool {
    state.connection().is_some_and(|conn| conn.is_live())
}

fn upload_settled(state: &AppState) -> bool {
    match state.job().map(|job| job.phase) {
        Some(Phase::Failed | Phase::Succeeded) => true,
        Some(Phase::AwaitingResults) => {
            !state.correlation().result_slots().is_empty() || !channel_live(state)
        }
        _ => false,
    }
}

fn select_file(path: &Path) -> anyhow::Result<SelectedFile> {
    let metadata =
        fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a file", path.display());
    }
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("file name is not valid UTF-8")?
        .to_string();
    Ok(SelectedFile {
        name,
        path: path.to_path_buf(),
        size: metadata.len(),
        content_type: declared_content_type(path).map(ToOwned::to_owned),
    })
}

fn declared_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Some("text/csv"),
        "tsv" => Some("text/tab-separated-values"),
        "json" => Some("application/json"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(declared_content_type(Path::new("a/data.CSV")), Some("text/csv"));
        assert_eq!(
            declared_content_type(Path::new("data.tsv")),
            Some("text/tab-separated-values")
        );
        assert_eq!(declared_content_type(Path::new("data.xlsx")), None);
        assert_eq!(declared_content_type(Path::new("README")), None);
    }

    #[test]
    fn selected_file_carries_name_and_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.csv");
        fs::write(&path, "x,y\n1,2\n").unwrap();

        let file = select_file(&path).unwrap();

        assert_eq!(file.name, "data.csv");
        assert_eq!(file.size, 8);
        assert_eq!(file.content_type.as_deref(), Some("text/csv"));
    }

    #[test]
    fn directories_cannot_be_selected() {
        let temp = TempDir::new().unwrap();
        assert!(select_file(temp.path()).is_err());
    }
}
