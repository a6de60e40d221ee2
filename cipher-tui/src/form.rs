use crate::api::{self, ApiError, Transport};
use crate::models::{Operation, OperationRequest, OperationResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Key,
    Data,
}

/// A request that has left the form. `ticket` identifies it when the
/// outcome comes back.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub ticket: u64,
    pub request: OperationRequest,
}

/// Key/data form bound to one remote operation.
///
/// Submitting is split in two so the caller can run the request wherever
/// it likes: [`OperationForm::begin_submit`] clears the previous outcome and
/// hands out the request, [`OperationForm::complete`] stores what came back.
/// [`OperationForm::submit`] does both against a transport in one go.
pub struct OperationForm {
    operation: Operation,
    key: String,
    data: String,
    result: String,
    error: String,
    phase: FormPhase,
    ticket: u64,
}

impl OperationForm {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            key: String::new(),
            data: String::new(),
            result: String::new(),
            error: String::new(),
            phase: FormPhase::Idle,
            ticket: 0,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Key => &self.key,
            FormField::Data => &self.data,
        }
    }

    pub fn result(&self) -> Option<&str> {
        (!self.result.is_empty()).then_some(self.result.as_str())
    }

    pub fn error(&self) -> Option<&str> {
        (!self.error.is_empty()).then_some(self.error.as_str())
    }

    /// The submit control is disabled only while a request is pending.
    pub fn can_submit(&self) -> bool {
        self.phase != FormPhase::Submitting
    }

    /// Editing a settled form puts it back to idle. The last outcome stays
    /// visible until the next submission.
    pub fn set_field(&mut self, field: FormField, value: String) {
        match field {
            FormField::Key => self.key = value,
            FormField::Data => self.data = value,
        }
        if self.phase != FormPhase::Submitting {
            self.phase = FormPhase::Idle;
        }
    }

    pub fn begin_submit(&mut self) -> Option<Submission> {
        if !self.can_submit() {
            return None;
        }

        self.phase = FormPhase::Submitting;
        self.result.clear();
        self.error.clear();
        self.ticket += 1;

        log::info!(
            "{} request submitted ({} byte key, {} byte payload)",
            self.operation.title(),
            self.key.len(),
            self.data.len()
        );

        Some(Submission {
            ticket: self.ticket,
            request: OperationRequest {
                key: self.key.clone(),
                data: self.data.clone(),
            },
        })
    }

    /// Stores the outcome of submission `ticket`. Returns `false` when the
    /// ticket is stale and the outcome was dropped.
    pub fn complete(&mut self, ticket: u64, outcome: Result<OperationResponse, ApiError>) -> bool {
        if self.phase != FormPhase::Submitting || ticket != self.ticket {
            log::debug!(
                "Dropping stale {} outcome (ticket {})",
                self.operation.endpoint(),
                ticket
            );
            return false;
        }

        match outcome {
            Ok(response) => {
                log::info!("{} request succeeded", self.operation.title());
                self.result = response.data;
                self.phase = FormPhase::Succeeded;
            }
            Err(e) => {
                log::warn!("{} request failed: {}", self.operation.title(), e);
                self.error = e.to_string();
                self.phase = FormPhase::Failed;
            }
        }
        true
    }

    pub async fn submit(&mut self, transport: &dyn Transport) -> bool {
        let Some(submission) = self.begin_submit() else {
            return false;
        };
        let outcome = api::perform(transport, self.operation, &submission.request).await;
        self.complete(submission.ticket, outcome)
    }

    /// Clears every field. A request still in flight is forgotten.
    pub fn reset(&mut self) {
        self.key.clear();
        self.data.clear();
        self.result.clear();
        self.error.clear();
        self.phase = FormPhase::Idle;
        self.ticket += 1;
    }
}
