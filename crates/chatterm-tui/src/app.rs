use chatterm_core::{ChatSession, Notice, SendOutcome, SessionPhase, StartOutcome};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::warn;

/// How many ticks (300ms each) a notice stays in the footer
const NOTICE_TICKS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Result of a background request, fed back into the session machine
pub enum TaskOutcome {
    Start(StartOutcome),
    Send(SendOutcome),
}

#[derive(Debug, Clone)]
pub struct ActiveNotice {
    pub notice: Notice,
    pub ticks_left: u8,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat area
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    // In-flight requests; never aborted, stale results are dropped by the session
    pub pending: Vec<JoinHandle<TaskOutcome>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub notice: Option<ActiveNotice>,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            session,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,
            chat_area: None,

            pending: Vec::new(),

            animation_frame: 0,

            notice: None,
        };
        app.collect_notices();
        app
    }

    /// The input accepts text only while a session is active and idle
    pub fn input_enabled(&self) -> bool {
        self.session.can_send()
    }

    pub fn input_placeholder(&self) -> &'static str {
        if self.session.is_initializing() {
            "Initializing session..."
        } else if self.session.is_loading() {
            "Waiting for response..."
        } else if self.session.phase() != SessionPhase::SessionActive {
            "Start a session to chat"
        } else {
            "Type your message..."
        }
    }

    pub fn start_session(&mut self) {
        if let Some(request) = self.session.begin_start_session() {
            self.pending
                .push(tokio::spawn(async move { TaskOutcome::Start(request.execute().await) }));
        }
        self.collect_notices();
    }

    pub fn reset_session(&mut self) {
        self.session.reset_session();
        self.input.clear();
        self.cursor = 0;
        self.input_mode = InputMode::Normal;
        self.chat_scroll = 0;
        self.follow_tail = true;
        self.collect_notices();
    }

    /// Send the input box contents. Blank input is left untouched.
    pub fn submit_input(&mut self) {
        if !self.input_enabled() || self.input.trim().is_empty() {
            return;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.input_mode = InputMode::Normal;
        self.follow_tail = true;

        if let Some(request) = self.session.begin_send(&text) {
            self.pending
                .push(tokio::spawn(async move { TaskOutcome::Send(request.execute().await) }));
        }
        self.collect_notices();
    }

    /// Apply the outcome of every finished background request
    pub async fn poll_tasks(&mut self) {
        let mut i = 0;
        while i < self.pending.len() {
            if !self.pending[i].is_finished() {
                i += 1;
                continue;
            }

            let handle = self.pending.remove(i);
            match handle.await {
                Ok(TaskOutcome::Start(outcome)) => self.session.finish_start_session(outcome),
                Ok(TaskOutcome::Send(outcome)) => {
                    self.session.finish_send(outcome);
                    self.follow_tail = true;
                }
                Err(e) => warn!(error = %e, "Background request task failed"),
            }
        }
        self.collect_notices();
    }

    /// Keep the newest notice for display
    pub fn collect_notices(&mut self) {
        if let Some(notice) = self.session.take_notices().pop() {
            self.notice = Some(ActiveNotice {
                notice,
                ticks_left: NOTICE_TICKS,
            });
        }
    }

    /// Tick animation frame and notice timeout (called by Tick event)
    pub fn tick(&mut self) {
        if self.session.is_loading() || self.session.is_initializing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        if let Some(active) = self.notice.as_mut() {
            active.ticks_left = active.ticks_left.saturating_sub(1);
            if active.ticks_left == 0 {
                self.notice = None;
            }
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll >= max;
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_tail = false;
        self.chat_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_tail = true;
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count().saturating_sub(visible_height)
    }

    /// Rendered height of the conversation, matching the layout in `ui`
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;

        for msg in self.session.messages() {
            total_lines = total_lines.saturating_add(1); // Sender + time line
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = char_count.div_ceil(wrap_width).max(1);
                total_lines = total_lines.saturating_add(wrapped);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.session.is_loading() {
            total_lines = total_lines.saturating_add(2); // "Assistant:" + "typing..."
        }

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}
