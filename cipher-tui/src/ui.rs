use crate::app::{App, Mode, Pane, ServiceHealth};
use crate::form::{FormField, FormPhase, OperationForm};
use crate::models::Operation;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

const DATA_COLUMN_WIDTH: usize = 48;

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(10),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.size());

    let forms = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    draw_header(f, chunks[0], app);
    draw_form(f, forms[0], &app.encrypt_form, app.pane == Pane::Encrypt);
    draw_form(f, forms[1], &app.decrypt_form, app.pane == Pane::Decrypt);
    draw_logs(f, chunks[2], app);
    draw_footer(f, chunks[3], app);

    match app.mode {
        Mode::Input(_) => draw_input_popup(f, app),
        Mode::Details => draw_detail_popup(f, app),
        Mode::Normal => {}
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let (health_text, health_color) = match &app.health {
        ServiceHealth::Unknown => ("checking".to_string(), Color::Gray),
        ServiceHealth::Online(status) => (format!("online ({})", status), Color::Green),
        ServiceHealth::Offline(_) => ("offline".to_string(), Color::Red),
    };

    let status_text = if app.is_busy() {
        " [Loading...] "
    } else {
        ""
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "Cipher Console",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(app.api_url.clone(), Style::default().fg(Color::Magenta)),
        Span::raw(" | "),
        Span::styled(health_text, Style::default().fg(health_color)),
        Span::styled(status_text, Style::default().fg(Color::Yellow)),
    ]))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_form(f: &mut Frame, area: Rect, form: &OperationForm, focused: bool) {
    let operation = form.operation();
    let label = Style::default().add_modifier(Modifier::BOLD);

    let button = match (form.phase(), operation) {
        (FormPhase::Submitting, Operation::Encrypt) => "Encrypting...",
        (FormPhase::Submitting, Operation::Decrypt) => "Decrypting...",
        (_, op) => op.title(),
    };
    let button_style = if form.can_submit() {
        Style::default().fg(Color::Black).bg(Color::Blue)
    } else {
        Style::default().fg(Color::Gray).bg(Color::DarkGray)
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Key:  ", label),
            Span::raw(form.field(FormField::Key).to_string()),
        ]),
        Line::from(vec![
            Span::styled("Data: ", label),
            Span::raw(form.field(FormField::Data).to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled(format!("[ {} ]", button), button_style)),
    ];

    if let Some(error) = form.error() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    if let Some(result) = form.result() {
        let heading = match operation {
            Operation::Encrypt => "Encrypted result:",
            Operation::Decrypt => "Decrypted result:",
        };
        lines.push(Line::from(Span::styled(heading, Style::default().fg(Color::Gray))));
        lines.push(Line::from(Span::styled(
            result.to_string(),
            Style::default().fg(Color::Green),
        )));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(pane_block(format!("{} Data", operation.title()), focused))
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

fn draw_logs(f: &mut Frame, area: Rect, app: &App) {
    let viewer = &app.viewer;
    let window = viewer.window();
    let mut title = format!("Logs (size {}, offset {})", window.size, window.offset);
    if let Some(error) = viewer.error() {
        title.push_str(&format!(" [{}]", error));
    }
    let block = pane_block(title, app.pane == Pane::Logs);

    if !viewer.has_data() {
        let paragraph = Paragraph::new("No logs available")
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
        return;
    }

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let columns = Paragraph::new(Line::from(Span::styled(
        format!("{:<36} {:<19} {:<15} {}", "ID", "TIMESTAMP", "IP ADDRESS", "DATA"),
        Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(columns, rows[0]);

    let items: Vec<ListItem> = viewer
        .entries()
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<36}", entry.id), Style::default().fg(Color::Cyan)),
                Span::raw(" "),
                Span::styled(
                    format!("{:<19}", entry.local_time()),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(" "),
                Span::styled(format!("{:<15}", entry.ip), Style::default().fg(Color::Magenta)),
                Span::raw(" "),
                Span::raw(truncate(&entry.data, DATA_COLUMN_WIDTH)),
            ]))
        })
        .collect();

    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));

    let mut list_state = ListState::default();
    list_state.select(Some(viewer.selected()));

    f.render_stateful_widget(list, rows[1], &mut list_state);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let help_text = match (app.mode, app.pane) {
        (Mode::Input(_), _) => "Type value | Enter: Apply | Esc: Cancel".to_string(),
        (Mode::Details, _) => "Enter/Esc: Close details".to_string(),
        (Mode::Normal, Pane::Logs) => {
            let previous = if app.viewer.can_go_previous() {
                "p/←: Previous"
            } else {
                "p/←: Previous (disabled)"
            };
            format!(
                "Tab: Switch pane | r: Reload | {} | n/→: Next | z: Size | o: Offset | ↑/↓: Select | Enter: Details | q: Quit",
                previous
            )
        }
        (Mode::Normal, _) => {
            "Tab: Switch pane | k: Edit key | d: Edit data | Enter/s: Submit | x: Reset | q: Quit"
                .to_string()
        }
    };

    let footer = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(footer, area);
}

fn draw_input_popup(f: &mut Frame, app: &App) {
    let Mode::Input(target) = app.mode else {
        return;
    };

    let area = centered_rect(60, 20, f.size());
    f.render_widget(Clear, area);

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(target.label()));

    f.render_widget(input, area);

    // keep the cursor inside the popup however long the value gets
    let cursor = u16::try_from(app.input_buffer.chars().count())
        .unwrap_or(u16::MAX)
        .min(area.width.saturating_sub(2));
    f.set_cursor(area.x.saturating_add(cursor).saturating_add(1), area.y + 1);
}

fn draw_detail_popup(f: &mut Frame, app: &App) {
    if let Some(entry) = app.viewer.selected_entry() {
        let area = centered_rect(80, 50, f.size());
        f.render_widget(Clear, area);

        let label = Style::default().add_modifier(Modifier::BOLD);
        let content = Text::from(vec![
            Line::from(vec![
                Span::styled("ID: ", label),
                Span::styled(entry.id.clone(), Style::default().fg(Color::Cyan)),
            ]),
            Line::from(vec![
                Span::styled("Timestamp: ", label),
                Span::raw(format!("{} ({})", entry.local_time(), entry.timestamp)),
            ]),
            Line::from(vec![
                Span::styled("IP Address: ", label),
                Span::styled(entry.ip.clone(), Style::default().fg(Color::Magenta)),
            ]),
            Line::from(vec![
                Span::styled("Data: ", label),
                Span::raw(entry.data.clone()),
            ]),
        ]);

        let detail = Paragraph::new(content)
            .block(Block::default().borders(Borders::ALL).title("Log Details"))
            .wrap(Wrap { trim: true });

        f.render_widget(detail, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppEvent, InputTarget};
    use crate::fake_transport::FakeTransport;
    use crate::models::{LogEntry, OperationResponse};
    use crate::viewer::FetchRequest;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn new_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(
            "http://localhost:8000".to_string(),
            Arc::new(FakeTransport::new()),
            tx,
        )
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 32)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_viewer_shows_no_logs_available() {
        let mut app = new_app();
        app.pane = Pane::Logs;
        let request = FetchRequest {
            window: app.viewer.window(),
        };
        app.handle_event(AppEvent::LogsFetched {
            request,
            outcome: Ok(Vec::new()),
        });

        let screen = render(&mut app);
        assert!(screen.contains("No logs available"));
        assert!(screen.contains("Previous (disabled)"));
        assert!(screen.contains("n/→: Next"));
    }

    #[test]
    fn loaded_page_renders_one_row_per_entry() {
        let mut app = new_app();
        let request = FetchRequest {
            window: app.viewer.window(),
        };
        let entries = vec![
            LogEntry {
                id: "first-id".into(),
                timestamp: 1_700_000_000,
                ip: "10.1.1.1".into(),
                data: "POST /api/v1/encrypt".into(),
            },
            LogEntry {
                id: "second-id".into(),
                timestamp: 1_700_000_100,
                ip: "10.2.2.2".into(),
                data: "x".repeat(200),
            },
        ];
        app.handle_event(AppEvent::LogsFetched {
            request,
            outcome: Ok(entries),
        });

        let screen = render(&mut app);
        assert!(!screen.contains("No logs available"));
        assert!(screen.contains("first-id"));
        assert!(screen.contains("10.2.2.2"));
        assert!(!screen.contains(&"x".repeat(DATA_COLUMN_WIDTH + 1)));
    }

    #[test]
    fn form_shows_result_and_disabled_button_while_pending() {
        let mut app = new_app();
        let submission = app.encrypt_form.begin_submit().unwrap();

        let screen = render(&mut app);
        assert!(screen.contains("Encrypting..."));

        app.handle_event(AppEvent::OperationFinished {
            operation: Operation::Encrypt,
            ticket: submission.ticket,
            outcome: Ok(OperationResponse {
                data: "ENC(hello)".into(),
            }),
        });
        let screen = render(&mut app);
        assert!(screen.contains("ENC(hello)"));
        assert!(screen.contains("[ Encrypt ]"));
    }

    #[test]
    fn very_long_input_keeps_cursor_inside_popup() {
        let mut app = new_app();
        app.mode = Mode::Input(InputTarget::Data);
        app.input_buffer = "a".repeat(65_530);

        let mut terminal = Terminal::new(TestBackend::new(140, 32)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();

        let popup = centered_rect(60, 20, Rect::new(0, 0, 140, 32));
        let (x, y) = terminal.get_cursor().unwrap();
        assert!(x < popup.x + popup.width);
        assert_eq!(y, popup.y + 1);
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5).chars().count(), 5);
    }
}
