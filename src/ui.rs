use color_eyre::eyre::Result;
use crossterm::event::{
    Event,
    EventStream,
    KeyCode,
    KeyEvent,
    KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use dice_chamber::{
    dice::DieKind,
    dispatcher::MAX_DICE_PER_ROLL,
    history::HistoryEntry,
    session::Session,
    theme::Theme,
    transport::Publisher,
    tray::{
        Face,
        FaceRole,
    },
};
use futures::StreamExt;
use rand::Rng;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

const FACE_WIDTH: u16 = 8;
const MAX_NAME_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Roll { die: DieKind, count: u32 },
    RollPreset(usize),
    RollGm { die: DieKind, hidden: bool },
    OpenGmPrompt,
    SubmitGmPassword(String),
    CancelGmPrompt,
    ExitGm,
    ClearHistory,
    ToggleTheme,
    SetName(String),
}

pub struct UiState {
    mode: Mode,
    die: DieKind,
    count: u32,
    hidden_gm_roll: bool,
    gm_active: bool,
    error: Option<String>,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            die: DieKind::D20,
            count: 1,
            hidden_gm_roll: false,
            gm_active: false,
            error: None,
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
enum Mode {
    #[default]
    Normal,
    GmPrompt { password: String },
    NameEdit { name: String },
    ClearModal,
    QuitModal,
}

impl UiState {
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Leaves the GM prompt once the gate accepted the password.
    pub fn gm_entered(&mut self) {
        self.gm_active = true;
        self.mode = Mode::Normal;
    }

    pub fn gm_exited(&mut self) {
        self.gm_active = false;
    }

    /// Wrong password: keep the prompt open with an empty field.
    pub fn gm_rejected(&mut self) {
        self.mode = Mode::GmPrompt {
            password: String::new(),
        };
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    Ok(())
}

pub fn draw<P: Publisher, R: Rng>(state: &mut UiState, session: &Session<P, R>) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, session))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub async fn next_event(state: &mut UiState, input: &mut EventStream) -> Result<UserEvent> {
    loop {
        let Some(event) = input.next().await else {
            return Ok(UserEvent::Quit);
        };
        match event? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(ev) = handle_key(state, key) {
                    return Ok(ev);
                }
            }
            Event::Resize(..) => return Ok(UserEvent::Redraw),
            _ => {}
        }
    }
}

fn handle_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    // Raw mode delivers Ctrl+C as a key press instead of SIGINT.
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(UserEvent::Quit),
            _ => None,
        };
    }
    match &mut state.mode {
        Mode::GmPrompt { password } => {
            return match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::CancelGmPrompt)
                }
                KeyCode::Enter => Some(UserEvent::SubmitGmPassword(std::mem::take(password))),
                KeyCode::Backspace => {
                    password.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    password.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::NameEdit { name } => {
            return match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let name = std::mem::take(name);
                    state.mode = Mode::Normal;
                    Some(UserEvent::SetName(name))
                }
                KeyCode::Backspace => {
                    name.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if name.chars().count() < MAX_NAME_LEN => {
                    name.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::ClearModal => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::ClearHistory)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::QuitModal => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    Some(match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            UserEvent::Redraw
        }
        KeyCode::Right => {
            state.die = state.die.next();
            UserEvent::Redraw
        }
        KeyCode::Left => {
            state.die = state.die.prev();
            UserEvent::Redraw
        }
        KeyCode::Up | KeyCode::Char('+') => {
            state.count = (state.count + 1).min(MAX_DICE_PER_ROLL);
            UserEvent::Redraw
        }
        KeyCode::Down | KeyCode::Char('-') => {
            state.count = state.count.saturating_sub(1).max(1);
            UserEvent::Redraw
        }
        KeyCode::Enter | KeyCode::Char('r') => UserEvent::Roll {
            die: state.die,
            count: state.count,
        },
        KeyCode::Char(c @ '1'..='9') => UserEvent::RollPreset(c as usize - '1' as usize),
        KeyCode::Char('g') if state.gm_active => UserEvent::ExitGm,
        KeyCode::Char('g') => {
            state.mode = Mode::GmPrompt {
                password: String::new(),
            };
            UserEvent::OpenGmPrompt
        }
        KeyCode::Char('x') if state.gm_active => UserEvent::RollGm {
            die: state.die,
            hidden: state.hidden_gm_roll,
        },
        KeyCode::Char('h') if state.gm_active => {
            state.hidden_gm_roll = !state.hidden_gm_roll;
            UserEvent::Redraw
        }
        KeyCode::Char('c') => {
            state.mode = Mode::ClearModal;
            UserEvent::Redraw
        }
        KeyCode::Char('t') => UserEvent::ToggleTheme,
        KeyCode::Char('n') => {
            state.mode = Mode::NameEdit {
                name: String::new(),
            };
            UserEvent::Redraw
        }
        _ => return None,
    })
}

fn accent(theme: Theme) -> Color {
    match theme {
        Theme::Dnd => Color::Red,
        Theme::Warhammer => Color::Yellow,
    }
}

fn ui<P: Publisher, R: Rng>(f: &mut Frame, state: &UiState, session: &Session<P, R>) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // status
            Constraint::Length(5), // tray
            Constraint::Length(3), // selection + presets
            Constraint::Min(5),    // history
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_status(f, chunks[0], state, session);
    draw_tray(f, chunks[1], session);
    draw_selection(f, chunks[2], state, session);
    draw_history(f, chunks[3], session);
    draw_help(f, chunks[4], state);
    draw_modals(f, state, session);
}

fn draw_status<P: Publisher, R: Rng>(
    f: &mut Frame,
    area: Rect,
    state: &UiState,
    session: &Session<P, R>,
) {
    let name = match session.character().trim() {
        "" => "Anonymous",
        name => name,
    };
    let mode = if session.gate().is_active() {
        "GM"
    } else {
        "Player"
    };
    let mut text = format!(
        "{} | {} | {} | {}",
        name,
        session.theme(),
        mode,
        session.status()
    );
    if let Some(err) = &state.error {
        text.push_str(&format!(" | Error: {err}"));
    }
    let color = if state.error.is_some() {
        Color::Red
    } else if session.is_connected() {
        Color::Green
    } else {
        Color::DarkGray
    };
    let status = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

fn draw_tray<P: Publisher, R: Rng>(f: &mut Frame, area: Rect, session: &Session<P, R>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            "Dice Tray",
            Style::default().fg(accent(session.theme())),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let faces = session.tray().faces();
    if faces.is_empty() {
        let hint = Paragraph::new("Press r to roll").style(Style::default().fg(Color::DarkGray));
        f.render_widget(hint, inner);
        return;
    }
    let cols = (inner.width / FACE_WIDTH).max(1) as usize;
    for (i, face) in faces.iter().take(cols).enumerate() {
        let rect = Rect::new(
            inner.x + i as u16 * FACE_WIDTH,
            inner.y,
            FACE_WIDTH.min(inner.width),
            inner.height,
        );
        draw_face(f, rect, face);
    }
}

fn draw_face(f: &mut Frame, area: Rect, face: &Face) {
    let style = if face.settled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if face.rolling {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let title = match face.role {
        FaceRole::Standard { faces } => format!("d{faces}"),
        FaceRole::Tens => String::from("10s"),
        FaceRole::Ones => String::from("1s"),
    };
    // Shift the label by the jitter so spinning faces wobble.
    let pad = if face.rolling && face.rotation > 0.0 { " " } else { "" };
    let label = Paragraph::new(format!("{pad}{}", face.label))
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(label, area);
}

fn draw_selection<P: Publisher, R: Rng>(
    f: &mut Frame,
    area: Rect,
    state: &UiState,
    session: &Session<P, R>,
) {
    let mut spans = vec![Span::styled(
        format!("{}{} ", state.count, state.die),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if state.gm_active && state.hidden_gm_roll {
        spans.push(Span::styled("[hidden] ", Style::default().fg(Color::Magenta)));
    }
    for (i, preset) in session.theme().presets().iter().enumerate() {
        let dice = if preset.count > 1 {
            format!("{}{}", preset.count, preset.die)
        } else {
            preset.die.to_string()
        };
        spans.push(Span::raw(format!("| {} {} ({}) ", i + 1, preset.label, dice)));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Roll"));
    f.render_widget(p, area);
}

fn history_line(entry: &HistoryEntry, width: u16) -> Line<'static> {
    let mut spans = Vec::new();
    if entry.is_gm_roll {
        spans.push(Span::styled("[GM] ", Style::default().fg(Color::Magenta)));
    }
    if entry.is_hidden {
        spans.push(Span::styled("[hidden] ", Style::default().fg(Color::DarkGray)));
    }
    let style = if entry.fresh {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let used: usize = spans.iter().map(|s| s.content.width()).sum();
    let time = entry.time_of_day.clone().unwrap_or_default();
    let room = (width as usize).saturating_sub(used + time.width() + 1);
    let headline = truncate(&entry.headline, room);
    let gap = room.saturating_sub(headline.width()) + 1;
    spans.push(Span::styled(headline, style));
    if !time.is_empty() {
        spans.push(Span::raw(" ".repeat(gap)));
        spans.push(Span::styled(time, Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        if out.width() + 1 >= width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

fn draw_history<P: Publisher, R: Rng>(f: &mut Frame, area: Rect, session: &Session<P, R>) {
    let block = Block::default().borders(Borders::ALL).title("History");
    let inner = block.inner(area);
    let lines: Vec<Line> = if session.history().is_empty() {
        vec![Line::styled("No rolls yet", Style::default().fg(Color::DarkGray))]
    } else {
        session
            .history()
            .entries()
            .map(|entry| history_line(entry, inner.width))
            .collect()
    };
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_help(f: &mut Frame, area: Rect, state: &UiState) {
    let text = if state.gm_active {
        "←/→ die | ↑/↓ count | r roll | 1-5 preset | x GM roll | h hidden | g leave GM | c clear | t theme | n name | q quit"
    } else {
        "←/→ die | ↑/↓ count | r roll | 1-5 preset | g GM | c clear | t theme | n name | q quit"
    };
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn masked(password: &str) -> String {
    "*".repeat(password.chars().count())
}

fn draw_modals<P: Publisher, R: Rng>(f: &mut Frame, state: &UiState, session: &Session<P, R>) {
    match &state.mode {
        Mode::GmPrompt { password } => {
            let area = centered_rect(50, 25, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Game Master Login");
            let mut lines = vec![Line::from(format!("Password: {}", masked(password)))];
            if session.gate().prompt().error_visible {
                lines.push(Line::styled(
                    "Incorrect password",
                    Style::default().fg(Color::Red),
                ));
            }
            lines.push(Line::from("Enter=login Esc=cancel"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::NameEdit { name } => {
            let area = centered_rect(50, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Character Name");
            let p = Paragraph::new(format!("{name}_\nEnter=save Esc=cancel"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::ClearModal => {
            let area = centered_rect(50, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Clear History");
            let question = if state.gm_active {
                "Clear all roll history, including GM rolls? (Y/N)"
            } else {
                "Clear the shared roll history for everyone? (Y/N)"
            };
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(question), block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Leave the dice chamber? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
