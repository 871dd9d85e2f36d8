use crate::{
    client::{
        AppSnapshot,
        DisplayState,
        ViewState,
    },
    notifications::Notification,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    EnterRaffle,
    Refresh,
    Connect,
    DismissNotification,
    Redraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    spinner_frame: usize,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl UiState {
    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
    }

    fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

pub type InputEventReceiver = EventStream;

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(stream: &mut InputEventReceiver) -> Result<Event> {
    match stream.next().await {
        Some(Ok(event)) => Ok(event),
        Some(Err(err)) => Err(err.into()),
        None => Err(eyre!("terminal input stream closed")),
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
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| render(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to an action. Key releases and unbound keys yield
/// `None`.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) => k,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    // Raw mode delivers Ctrl+C as a key, not SIGINT.
    if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(UserEvent::Quit);
    }
    match state.mode {
        Mode::QuitModal => match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match k.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('e') | KeyCode::Enter => Some(UserEvent::EnterRaffle),
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Char('x') => Some(UserEvent::DismissNotification),
            _ => None,
        },
    }
}

pub fn render(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title + action
            Constraint::Length(3), // wallet
            Constraint::Min(7),    // raffle information
            Constraint::Length(6), // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_header(f, state, chunks[0], snap);
    draw_wallet_panel(f, chunks[1], snap);
    match &snap.view {
        ViewState::Raffle { display, .. } => draw_raffle_panel(f, state, chunks[2], snap, display),
        ViewState::NoContract { prompt } => draw_no_contract(f, chunks[2], prompt),
    }
    draw_bottom(f, chunks[3], chunks[4], snap);
    draw_notifications(f, &snap.notifications);
    if state.mode == Mode::QuitModal {
        draw_quit_modal(f);
    }
}

fn draw_header(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(30)])
        .split(inner);
    let title = Paragraph::new(Span::styled(
        "Lottery Entrance",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    f.render_widget(title, cols[0]);

    if let ViewState::Raffle { .. } = snap.view {
        let button = if snap.busy {
            Span::styled(
                format!("{} Entering raffle...", state.spinner()),
                Style::default().fg(Color::DarkGray),
            )
        } else {
            Span::styled(
                "[ Enter Raffle ]",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            )
        };
        f.render_widget(Paragraph::new(button).alignment(Alignment::Right), cols[1]);
    }
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let account = match snap.account {
        Some(account) => account.to_string(),
        None if snap.connected => String::from("configured account not exposed"),
        None => String::from("not connected (press c)"),
    };
    let mut text = format!("Network: {} | Account: {}", snap.network, account);
    if let ViewState::Raffle { address, .. } = &snap.view {
        text.push_str(&format!(" | Raffle: {address}"));
    }
    let widget =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_raffle_panel(
    f: &mut Frame,
    state: &UiState,
    area: Rect,
    snap: &AppSnapshot,
    display: &DisplayState,
) {
    let title = if snap.refreshing {
        format!("Lottery Information {}", state.spinner())
    } else {
        String::from("Lottery Information")
    };
    let label = Style::default().fg(Color::Cyan);
    let mut lines = vec![
        Line::from("Decentralized Smart Contract Lottery."),
        Line::from(""),
        Line::from(vec![
            Span::styled("Entrance Fee:      ", label),
            Span::raw(display.entrance_fee_text()),
        ]),
        Line::from(vec![
            Span::styled("Number of Players: ", label),
            Span::raw(display.number_of_players_text()),
        ]),
        Line::from(vec![
            Span::styled("Recent Winner:     ", label),
            Span::raw(display.recent_winner_text()),
        ]),
    ];
    if let Some(tx_hash) = snap.pending_tx {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Pending transaction: {tx_hash}"),
            Style::default().fg(Color::Yellow),
        )));
    }
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_no_contract(f: &mut Frame, area: Rect, prompt: &str) {
    let lines = vec![
        Line::from(Span::styled(
            prompt.to_string(),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from("No Raffle address detected!"),
    ];
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Lottery Information"));
    f.render_widget(widget, area);
}

fn draw_bottom(f: &mut Frame, status_area: Rect, help_area: Rect, snap: &AppSnapshot) {
    let status_widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, status_area);

    let help = Paragraph::new(
        "e/Enter enter raffle | r refresh | c connect wallet | x dismiss | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, help_area);
}

/// Toasts stack downwards from the top-right corner, newest first.
fn draw_notifications(f: &mut Frame, notifications: &[Notification]) {
    let screen = f.area();
    let mut y = screen.y + 1;
    for n in notifications.iter().rev() {
        let heading = format!("{} {}", n.icon.glyph(), n.title);
        let body = format!("{} ({})", n.message, n.raised_at.format("%H:%M:%S"));
        let content_width = heading.width().max(body.width()) as u16;
        let width = (content_width + 4).min(screen.width);
        let height = 4;
        if y + height > screen.bottom() {
            break;
        }
        let area = Rect {
            x: screen.right().saturating_sub(width + 1).max(screen.x),
            y,
            width,
            height,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue));
        let lines = vec![
            Line::from(Span::styled(heading, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(body),
        ];
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(lines).block(block).alignment(Alignment::Left),
            area,
        );
        y += height;
    }
}

fn draw_quit_modal(f: &mut Frame) {
    let area = centered_rect(40, 20, f.area());
    let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
    let p = Paragraph::new("Quit? (Y/N)");
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
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

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
