use crate::api::{self, ApiError, Transport};
use crate::form::{FormField, FormPhase, OperationForm, Submission};
use crate::models::{HealthStatus, LogEntry, Operation, OperationResponse};
use crate::viewer::{FetchRequest, LogViewer};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Encrypt,
    Decrypt,
    Logs,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Pane::Encrypt => Pane::Decrypt,
            Pane::Decrypt => Pane::Logs,
            Pane::Logs => Pane::Encrypt,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Encrypt => Pane::Logs,
            Pane::Decrypt => Pane::Encrypt,
            Pane::Logs => Pane::Decrypt,
        }
    }

    fn operation(self) -> Option<Operation> {
        match self {
            Pane::Encrypt => Some(Operation::Encrypt),
            Pane::Decrypt => Some(Operation::Decrypt),
            Pane::Logs => None,
        }
    }
}

/// Field currently being typed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    Key,
    Data,
    Size,
    Offset,
}

impl InputTarget {
    pub fn label(self) -> &'static str {
        match self {
            InputTarget::Key => "Key",
            InputTarget::Data => "Data",
            InputTarget::Size => "Page size",
            InputTarget::Offset => "Offset",
        }
    }

    fn numeric(self) -> bool {
        matches!(self, InputTarget::Size | InputTarget::Offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Input(InputTarget),
    Details,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceHealth {
    Unknown,
    Online(String),
    Offline(String),
}

/// Completed network work, delivered back to the UI task.
#[derive(Debug)]
pub enum AppEvent {
    OperationFinished {
        operation: Operation,
        ticket: u64,
        outcome: Result<OperationResponse, ApiError>,
    },
    LogsFetched {
        request: FetchRequest,
        outcome: Result<Vec<LogEntry>, ApiError>,
    },
    HealthChecked(Result<HealthStatus, ApiError>),
}

pub struct App {
    pub pane: Pane,
    pub mode: Mode,
    pub input_buffer: String,
    pub encrypt_form: OperationForm,
    pub decrypt_form: OperationForm,
    pub viewer: LogViewer,
    pub health: ServiceHealth,
    pub api_url: String,
    pub should_quit: bool,
    transport: Arc<dyn Transport>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(api_url: String, transport: Arc<dyn Transport>, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            pane: Pane::Encrypt,
            mode: Mode::Normal,
            input_buffer: String::new(),
            encrypt_form: OperationForm::new(Operation::Encrypt),
            decrypt_form: OperationForm::new(Operation::Decrypt),
            viewer: LogViewer::new(),
            health: ServiceHealth::Unknown,
            api_url,
            should_quit: false,
            transport,
            events,
        }
    }

    /// Kicks off the health probe and the log viewer's first fetch.
    pub fn start(&mut self) {
        self.spawn_health_check();
        let request = self.viewer.mount();
        self.spawn_fetch(request);
    }

    pub fn form(&self, operation: Operation) -> &OperationForm {
        match operation {
            Operation::Encrypt => &self.encrypt_form,
            Operation::Decrypt => &self.decrypt_form,
        }
    }

    fn form_mut(&mut self, operation: Operation) -> &mut OperationForm {
        match operation {
            Operation::Encrypt => &mut self.encrypt_form,
            Operation::Decrypt => &mut self.decrypt_form,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.viewer.is_loading()
            || self.encrypt_form.phase() == FormPhase::Submitting
            || self.decrypt_form.phase() == FormPhase::Submitting
    }

    fn spawn_submission(&self, operation: Operation, submission: Submission) {
        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = api::perform(transport.as_ref(), operation, &submission.request).await;
            // receiver is gone once the app has shut down
            let _ = events.send(AppEvent::OperationFinished {
                operation,
                ticket: submission.ticket,
                outcome,
            });
        });
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = api::fetch_logs(transport.as_ref(), request.window).await;
            let _ = events.send(AppEvent::LogsFetched { request, outcome });
        });
    }

    fn spawn_health_check(&self) {
        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = api::check_health(transport.as_ref()).await;
            let _ = events.send(AppEvent::HealthChecked(outcome));
        });
    }

    fn maybe_fetch(&self, request: Option<FetchRequest>) {
        if let Some(request) = request {
            self.spawn_fetch(request);
        }
    }

    pub fn submit(&mut self, operation: Operation) {
        if let Some(submission) = self.form_mut(operation).begin_submit() {
            self.spawn_submission(operation, submission);
        }
    }

    pub fn reload_logs(&mut self) {
        let request = self.viewer.reload();
        self.spawn_fetch(request);
    }

    pub fn previous_page(&mut self) {
        let request = self.viewer.go_to_previous_page();
        self.maybe_fetch(request);
    }

    pub fn next_page(&mut self) {
        let request = self.viewer.go_to_next_page();
        self.maybe_fetch(request);
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::OperationFinished {
                operation,
                ticket,
                outcome,
            } => {
                self.form_mut(operation).complete(ticket, outcome);
            }
            AppEvent::LogsFetched { request, outcome } => {
                self.viewer.apply(request, outcome);
            }
            AppEvent::HealthChecked(Ok(health)) => {
                log::info!("Service at {} reports status {}", self.api_url, health.status);
                self.health = ServiceHealth::Online(health.status);
            }
            AppEvent::HealthChecked(Err(e)) => {
                log::warn!("Service at {} not available at startup ({})", self.api_url, e);
                self.health = ServiceHealth::Offline(e.to_string());
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.mode {
            Mode::Normal => self.handle_normal_key(key.code),
            Mode::Input(target) => self.handle_input_key(target, key.code),
            Mode::Details => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    self.mode = Mode::Normal;
                }
            }
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.pane = self.pane.next(),
            KeyCode::BackTab => self.pane = self.pane.previous(),
            _ => match self.pane.operation() {
                Some(operation) => self.handle_form_key(operation, code),
                None => self.handle_logs_key(code),
            },
        }
    }

    fn handle_form_key(&mut self, operation: Operation, code: KeyCode) {
        match code {
            KeyCode::Char('k') => self.enter_input(InputTarget::Key),
            KeyCode::Char('d') => self.enter_input(InputTarget::Data),
            KeyCode::Enter | KeyCode::Char('s') => self.submit(operation),
            KeyCode::Char('x') => self.form_mut(operation).reset(),
            _ => {}
        }
    }

    fn handle_logs_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('r') => self.reload_logs(),
            KeyCode::Char('p') | KeyCode::Left => self.previous_page(),
            KeyCode::Char('n') | KeyCode::Right => self.next_page(),
            KeyCode::Char('z') => self.enter_input(InputTarget::Size),
            KeyCode::Char('o') => self.enter_input(InputTarget::Offset),
            KeyCode::Up => self.viewer.move_selection_up(),
            KeyCode::Down => self.viewer.move_selection_down(),
            KeyCode::Enter => {
                if self.viewer.selected_entry().is_some() {
                    self.mode = Mode::Details;
                }
            }
            _ => {}
        }
    }

    fn enter_input(&mut self, target: InputTarget) {
        self.input_buffer = match (target, self.pane.operation()) {
            (InputTarget::Key, Some(op)) => self.form(op).field(FormField::Key).to_string(),
            (InputTarget::Data, Some(op)) => self.form(op).field(FormField::Data).to_string(),
            (InputTarget::Size, _) => self.viewer.window().size.to_string(),
            (InputTarget::Offset, _) => self.viewer.window().offset.to_string(),
            _ => String::new(),
        };
        self.mode = Mode::Input(target);
    }

    fn handle_input_key(&mut self, target: InputTarget, code: KeyCode) {
        match code {
            KeyCode::Enter => self.commit_input(target),
            KeyCode::Esc => self.exit_input(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) if !target.numeric() || c.is_ascii_digit() => {
                self.input_buffer.push(c);
            }
            _ => {}
        }
    }

    fn exit_input(&mut self) {
        self.mode = Mode::Normal;
        self.input_buffer.clear();
    }

    fn commit_input(&mut self, target: InputTarget) {
        let value = std::mem::take(&mut self.input_buffer);
        self.mode = Mode::Normal;

        match target {
            InputTarget::Key | InputTarget::Data => {
                let field = if target == InputTarget::Key {
                    FormField::Key
                } else {
                    FormField::Data
                };
                if let Some(operation) = self.pane.operation() {
                    self.form_mut(operation).set_field(field, value);
                }
            }
            InputTarget::Size | InputTarget::Offset => {
                // an empty field counts as zero
                let Ok(number) = parse_number(&value) else {
                    log::warn!("Ignoring out of range {}: {}", target.label(), value);
                    return;
                };
                let request = if target == InputTarget::Size {
                    self.viewer.set_size(number)
                } else {
                    self.viewer.set_offset(number)
                };
                self.maybe_fetch(request);
            }
        }
    }
}

fn parse_number(value: &str) -> Result<u64, std::num::ParseIntError> {
    if value.is_empty() {
        Ok(0)
    } else {
        value.parse()
    }
}
