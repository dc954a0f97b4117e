use std::collections::BTreeMap;
use std::path::PathBuf;

use engine_logging::{engine_debug, engine_info};

use crate::view_model::{AppViewModel, ConnectionView};
use crate::{ChannelFault, InboundPayload, UploadError};

pub type JobId = u64;
pub type Generation = u64;

/// Content type sent to object storage when the file declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Errored,
}

/// One channel instance. Never reused after `Closed`/`Errored`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub generation: Generation,
    pub state: ConnectionState,
    pub fault: Option<ChannelFault>,
}

impl Connection {
    pub fn is_live(&self) -> bool {
        matches!(self.state, ConnectionState::Connecting | ConnectionState::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    RequestingUrl,
    Uploading,
    TriggeringProcessing,
    AwaitingResults,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }

    /// Phases with a request outstanding or about to be issued.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Phase::RequestingUrl | Phase::Uploading | Phase::TriggeringProcessing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: Option<String>,
}

impl SelectedFile {
    pub fn upload_content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub id: JobId,
    pub file: SelectedFile,
    pub phase: Phase,
    /// Every phase entered, in order, starting with `Idle`.
    pub trail: Vec<Phase>,
    pub status: String,
    pub error: Option<UploadError>,
}

impl UploadJob {
    fn new(id: JobId, file: SelectedFile) -> Self {
        Self {
            id,
            file,
            phase: Phase::Idle,
            trail: vec![Phase::Idle],
            status: String::new(),
            error: None,
        }
    }

    pub(crate) fn enter(&mut self, phase: Phase, status: impl Into<String>) {
        self.phase = phase;
        self.trail.push(phase);
        self.status = status.into();
        engine_debug!("job {} -> {:?}: {}", self.id, phase, self.status);
    }

    pub(crate) fn fail(&mut self, error: UploadError) {
        let status = format!("Error: {error}");
        self.enter(Phase::Failed, status);
        self.error = Some(error);
    }
}

/// Connection id and named result URLs. Written only by the inbound-message handler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrelationStore {
    connection_id: Option<String>,
    result_slots: BTreeMap<String, String>,
}

impl CorrelationStore {
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Connection id usable as a correlation key; empty counts as absent.
    pub fn correlation_key(&self) -> Option<&str> {
        self.connection_id().filter(|id| !id.is_empty())
    }

    pub fn result_slots(&self) -> &BTreeMap<String, String> {
        &self.result_slots
    }

    pub fn result(&self, name: &str) -> Option<&str> {
        self.result_slots.get(name).map(String::as_str)
    }
}

/// Append-only message log plus the last echoed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    messages: Vec<String>,
    processed_message: Option<String>,
}

impl ResultSet {
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn processed_message(&self) -> Option<&str> {
        self.processed_message.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    selected: Option<SelectedFile>,
    job: Option<UploadJob>,
    next_job_id: JobId,
    connection: Option<Connection>,
    next_generation: Generation,
    correlation: CorrelationStore,
    results: ResultSet,
    request_connection_id_on_open: bool,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            selected: None,
            job: None,
            next_job_id: 1,
            connection: None,
            next_generation: 1,
            correlation: CorrelationStore::default(),
            results: ResultSet::default(),
            request_connection_id_on_open: true,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a `get_connection_id` frame is sent as soon as the channel opens.
    pub fn with_connection_id_request(mut self, enabled: bool) -> Self {
        self.request_connection_id_on_open = enabled;
        self
    }

    pub fn view(&self) -> AppViewModel {
        let connection = match &self.connection {
            None => ConnectionView::Disconnected,
            Some(conn) => match conn.state {
                ConnectionState::Connecting => ConnectionView::Connecting,
                ConnectionState::Open => ConnectionView::Open,
                ConnectionState::Closed => ConnectionView::Closed,
                ConnectionState::Errored => ConnectionView::Errored,
            },
        };
        AppViewModel {
            connection,
            connection_id: self.correlation.connection_id.clone(),
            selected_file: self.selected.as_ref().map(|file| file.name.clone()),
            job_id: self.job.as_ref().map(|job| job.id),
            phase: self.job.as_ref().map(|job| job.phase),
            status: self
                .job
                .as_ref()
                .map(|job| job.status.clone())
                .unwrap_or_default(),
            error: self.job.as_ref().and_then(|job| job.error.clone()),
            channel_fault: self.connection.as_ref().and_then(|conn| conn.fault.clone()),
            messages: self.results.messages.clone(),
            result_slots: self
                .correlation
                .result_slots
                .iter()
                .map(|(name, url)| (name.clone(), url.clone()))
                .collect(),
            processed_message: self.results.processed_message.clone(),
            can_submit: self.selected.is_some()
                && !self.job.as_ref().is_some_and(|job| job.phase.is_in_flight()),
            can_send: self.is_open(),
            dirty: self.dirty,
        }
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn job(&self) -> Option<&UploadJob> {
        self.job.as_ref()
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn correlation(&self) -> &CorrelationStore {
        &self.correlation
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn requests_connection_id_on_open(&self) -> bool {
        self.request_connection_id_on_open
    }

    pub(crate) fn is_open(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|conn| conn.state == ConnectionState::Open)
    }

    pub(crate) fn select_file(&mut self, file: SelectedFile) {
        engine_info!("file selected: {} ({} bytes)", file.name, file.size);
        self.selected = Some(file);
        self.job = None;
        self.mark_dirty();
    }

    /// Creates a job for the selected file, leaving it in `Idle`.
    pub(crate) fn start_job(&mut self) -> Option<&mut UploadJob> {
        let file = self.selected.clone()?;
        let id = self.next_job_id;
        self.next_job_id += 1;
        self.mark_dirty();
        Some(self.job.insert(UploadJob::new(id, file)))
    }

    /// The current job, but only if it is `job_id` and sits in `phase`.
    pub(crate) fn job_at(&mut self, job_id: JobId, phase: Phase) -> Option<&mut UploadJob> {
        let dirty = &mut self.dirty;
        self.job
            .as_mut()
            .filter(|job| job.id == job_id && job.phase == phase)
            .inspect(|_| *dirty = true)
    }

    pub(crate) fn job_mut(&mut self) -> Option<&mut UploadJob> {
        self.job.as_mut()
    }

    /// Replaces any previous connection with a fresh one in `Connecting`.
    pub(crate) fn open_connection(&mut self) -> Generation {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.connection = Some(Connection {
            generation,
            state: ConnectionState::Connecting,
            fault: None,
        });
        self.correlation = CorrelationStore::default();
        self.results = ResultSet::default();
        self.mark_dirty();
        generation
    }

    /// The current connection, but only if it is `generation`.
    pub(crate) fn connection_at(&mut self, generation: Generation) -> Option<&mut Connection> {
        let dirty = &mut self.dirty;
        self.connection
            .as_mut()
            .filter(|conn| conn.generation == generation)
            .inspect(|_| *dirty = true)
    }

    pub(crate) fn log_line(&mut self, line: String) {
        self.results.messages.push(line);
        self.mark_dirty();
    }

    pub(crate) fn apply_inbound(&mut self, payload: InboundPayload) {
        if let Some(id) = payload.connection_id {
            engine_debug!("connection id assigned: {id}");
            self.correlation.connection_id = Some(id);
        }
        for (name, url) in payload.result_urls {
            engine_debug!("result slot {name} = {url}");
            self.correlation.result_slots.insert(name, url);
        }
        if let Some(message) = payload.processed_message {
            self.results.processed_message = Some(message);
        }
        self.mark_dirty();
    }
}
