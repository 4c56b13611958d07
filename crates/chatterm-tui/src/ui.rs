use chatterm_core::{ChatMessage, ChatRole, NoticeLevel, SessionPhase};
use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current_text = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };

        current_text.push_str(&rest[..open]);
        let bold_text = &after_open[..close];
        if bold_text.is_empty() {
            // "****" renders literally
            current_text.push_str("****");
        } else {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(
                bold_text.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        rest = &after_open[close + 2..];
    }

    // No closing ** (or no markers at all): the rest is literal
    current_text.push_str(rest);
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn format_time(message: &ChatMessage) -> String {
    message
        .timestamp
        .with_timezone(&Local)
        .format("%I:%M %p")
        .to_string()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, input, footer
    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let chat_area = if let Some(error) = app.session.session_error() {
        let [banner_area, chat_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(body_area);
        let banner = Paragraph::new(error.to_string())
            .style(Style::default().fg(Color::Red))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(banner, banner_area);
        chat_area
    } else {
        body_area
    };

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.session.is_initializing() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!("Starting session{}", dots)
    } else {
        app.session.phase().label().to_string()
    };
    let status_color = match app.session.phase() {
        SessionPhase::SessionActive => Color::Green,
        SessionPhase::SessionError => Color::Red,
        SessionPhase::CreatingSession => Color::Yellow,
        SessionPhase::NoSession => Color::Gray,
    };

    let title = Line::from(vec![
        Span::styled(" Chat Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(status, Style::default().fg(status_color)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    // Inner size minus borders, used for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_to_bottom();
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let session = &app.session;

    if session.messages().is_empty() && !session.is_initializing() && !session.is_loading() {
        let (heading, hint) = if session.phase() == SessionPhase::SessionActive {
            (
                "Start a Conversation",
                "Press Enter and send a message to begin chatting with the AI assistant",
            )
        } else {
            ("Ready to Chat", "Press 's' to initialize a new chat session")
        };

        let vertical_pad = area.height.saturating_sub(4) / 2;
        let mut lines: Vec<Line> = (0..vertical_pad).map(|_| Line::default()).collect();
        lines.push(Line::from(Span::styled(heading, Style::default().bold())));
        lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));

        let empty = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .block(chat_block)
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();

    for msg in session.messages() {
        match msg.sender {
            ChatRole::User => {
                lines.push(
                    Line::from(vec![
                        Span::styled(format_time(msg), Style::default().fg(Color::DarkGray)),
                        Span::raw(" "),
                        Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                    ])
                    .alignment(Alignment::Right),
                );
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()).alignment(Alignment::Right));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "Assistant",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                    Span::styled(format_time(msg), Style::default().fg(Color::DarkGray)),
                ]));
                // Split response into lines and parse markdown
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if session.is_loading() {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Assistant is typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if app.input_enabled() {
        Color::Gray
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() && !editing {
        Paragraph::new(Span::styled(
            app.input_placeholder(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else {
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(active) = &app.notice {
        let style = match active.notice.level {
            NoticeLevel::Info => Style::default().bg(Color::Green).fg(Color::Black),
            NoticeLevel::Error => Style::default().bg(Color::Red).fg(Color::White),
        };
        let line = Line::from(vec![
            Span::styled(format!(" {} ", active.notice.title), style.add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::raw(active.notice.body.clone()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " CHAT ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);

    let mut hints: Vec<(&str, &str)> = Vec::new();
    match app.input_mode {
        InputMode::Editing => {
            hints.push(("Enter", "send"));
            hints.push(("Esc", "stop typing"));
        }
        InputMode::Normal => {
            if app.session.can_start() {
                hints.push(("s", "start session"));
            }
            if app.input_enabled() {
                hints.push(("i", "type"));
            }
            hints.push(("r", "reset"));
            hints.push(("j/k", "scroll"));
            hints.push(("q", "quit"));
        }
    }

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::raw(format!(" {}  ", label)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatterm_core::{ChatSession, MemoryStore};
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_markdown_bold() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "a **b");
    }

    #[test]
    fn test_renders_empty_state_without_session() {
        let mut app = App::new(ChatSession::new(None, Box::new(MemoryStore::new())));
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Ready to Chat"));
        assert!(text.contains("No active session"));
    }

    #[tokio::test]
    async fn test_renders_error_banner_and_messages() {
        let mut app = App::new(ChatSession::new(None, Box::new(MemoryStore::new())));
        app.start_session();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(buffer_text(&terminal).contains("API base URL not configured"));

        let mut app = App::new(ChatSession::new(None, Box::new(MemoryStore::with_session("abc"))));
        app.input = "hello".to_string();
        app.submit_input();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("You"));
        assert!(text.contains("hello"));
    }
}
