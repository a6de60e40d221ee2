use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// The two remote operations a form can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl Operation {
    /// Endpoint name below `/api/v1/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Operation::Encrypt => "Encrypt",
            Operation::Decrypt => "Decrypt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub key: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub data: String,
}

/// One audit record as stored by the service. Never modified client side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub ip: String,
    pub data: String,
}

impl LogEntry {
    /// Timestamp rendered in the local timezone. Falls back to the raw
    /// number when it is outside chrono's representable range.
    pub fn local_time(&self) -> String {
        DateTime::from_timestamp(self.timestamp, 0)
            .map(|utc| {
                utc.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// The `(size, offset)` slice of the log collection currently requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub size: u64,
    pub offset: u64,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            size: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PageWindow {
    pub fn previous(self) -> Self {
        Self {
            offset: self.offset.saturating_sub(self.size),
            ..self
        }
    }

    /// No upper bound: past the end the service answers with an empty page.
    pub fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.size),
            ..self
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("size", self.size.to_string()),
            ("offset", self.offset.to_string()),
        ]
    }
}
