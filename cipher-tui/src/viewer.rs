use crate::api::ApiError;
use crate::models::{LogEntry, PageWindow};

/// A fetch the viewer needs issued, tagged with the window it is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub window: PageWindow,
}

/// Windowed view over the remote audit log.
///
/// The viewer never talks to the network itself. Every operation that
/// changes the window returns the [`FetchRequest`] it requires, and the
/// caller feeds the outcome back through [`LogViewer::apply`]. Outcomes for
/// a window other than the current one are dropped, so a slow response for
/// an old page can never overwrite a newer one.
pub struct LogViewer {
    window: PageWindow,
    entries: Vec<LogEntry>,
    error: Option<String>,
    selected: usize,
    in_flight: usize,
}

impl Default for LogViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogViewer {
    pub fn new() -> Self {
        Self {
            window: PageWindow::default(),
            entries: Vec::new(),
            error: None,
            selected: 0,
            in_flight: 0,
        }
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// False both before the first successful fetch and after an empty page.
    pub fn has_data(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn can_go_previous(&self) -> bool {
        self.window.offset > 0
    }

    /// Initial fetch with the default window.
    pub fn mount(&mut self) -> FetchRequest {
        self.issue()
    }

    pub fn reload(&mut self) -> FetchRequest {
        self.issue()
    }

    pub fn set_size(&mut self, size: u64) -> Option<FetchRequest> {
        self.move_to(PageWindow {
            size,
            ..self.window
        })
    }

    pub fn set_offset(&mut self, offset: u64) -> Option<FetchRequest> {
        self.move_to(PageWindow {
            offset,
            ..self.window
        })
    }

    pub fn go_to_previous_page(&mut self) -> Option<FetchRequest> {
        self.move_to(self.window.previous())
    }

    pub fn go_to_next_page(&mut self) -> Option<FetchRequest> {
        self.move_to(self.window.next())
    }

    fn move_to(&mut self, window: PageWindow) -> Option<FetchRequest> {
        if window == self.window {
            return None;
        }
        self.window = window;
        Some(self.issue())
    }

    fn issue(&mut self) -> FetchRequest {
        self.in_flight += 1;
        self.error = None;
        log::debug!(
            "Fetching logs (size={}, offset={})",
            self.window.size,
            self.window.offset
        );
        FetchRequest {
            window: self.window,
        }
    }

    /// Applies a finished fetch. Returns `false` if it was for a stale window.
    pub fn apply(&mut self, request: FetchRequest, outcome: Result<Vec<LogEntry>, ApiError>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        if request.window != self.window {
            log::debug!(
                "Discarding logs for stale window (size={}, offset={})",
                request.window.size,
                request.window.offset
            );
            return false;
        }

        match outcome {
            Ok(entries) => {
                log::debug!("Received {} log entries", entries.len());
                self.entries = entries;
                self.selected = 0;
                self.error = None;
            }
            Err(e) => {
                // the previous page stays on screen
                log::warn!("Failed to fetch logs: {}", e);
                self.error = Some(format!("Failed to fetch logs: {}", e));
            }
        }
        true
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&LogEntry> {
        self.entries.get(self.selected)
    }

    pub fn move_selection_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_selection_down(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }
}
