use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Session commands
        KeyCode::Char('s') => {
            if app.session.can_start() {
                app.start_session();
            }
        }
        KeyCode::Char('r') => app.reset_session(),

        // Start typing
        KeyCode::Char('i') | KeyCode::Enter => {
            if app.input_enabled() {
                app.input_mode = InputMode::Editing;
            }
        }

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::PageDown => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_half_page_up(),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    // The session may have become busy or been reset while editing
    if !app.input_enabled() && key.code != KeyCode::Esc {
        return;
    }

    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatterm_core::{ChatSession, MemoryStore, SessionPhase};
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app(id: Option<&str>) -> App {
        let store = id.map(MemoryStore::with_session).unwrap_or_default();
        App::new(ChatSession::new(None, Box::new(store)))
    }

    #[tokio::test]
    async fn test_typing_and_sending() {
        let mut app = app(Some("abc"));

        handle_event(&mut app, AppEvent::Key(key(KeyCode::Char('i')))).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);

        for c in "hey".chars() {
            handle_event(&mut app, AppEvent::Key(key(KeyCode::Char(c)))).await.unwrap();
        }
        // 'q' while editing is text, not quit
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Char('q')))).await.unwrap();
        assert!(!app.should_quit);
        assert_eq!(app.input, "heyq");

        handle_event(&mut app, AppEvent::Key(key(KeyCode::Enter))).await.unwrap();
        assert_eq!(app.session.messages()[0].text, "heyq");
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_editing_requires_session() {
        let mut app = app(None);
        handle_event(&mut app, AppEvent::Key(key(KeyCode::Enter))).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_start_and_reset_keys() {
        let mut app = app(None);

        handle_event(&mut app, AppEvent::Key(key(KeyCode::Char('s')))).await.unwrap();
        assert_eq!(app.session.phase(), SessionPhase::SessionError);

        handle_event(&mut app, AppEvent::Key(key(KeyCode::Char('r')))).await.unwrap();
        assert_eq!(app.session.phase(), SessionPhase::NoSession);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_editing() {
        let mut app = app(Some("abc"));
        app.input_mode = InputMode::Editing;
        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..key(KeyCode::Char('c'))
        };
        handle_event(&mut app, AppEvent::Key(ctrl_c)).await.unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 4);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 5, rect));
        assert!(!point_in_rect(6, 2, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
