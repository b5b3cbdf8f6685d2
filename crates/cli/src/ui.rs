// Full-screen progress view

use anyhow::Result;
use convaudio_engine::{ActiveJobView, SchedulerView, TickSummary};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::{stdout, Stdout};
use std::time::Duration;

use crate::driver::Frontend;

/// The active pane never grows beyond this many rows, whatever the worker count.
pub const MAX_ACTIVE_ROWS: usize = 16;

const BAR_SEGMENTS: usize = 10;
const BAR_SYMBOL: &str = "▒";
const STATUS_HEIGHT: u16 = 1;

/// Redraw the whole screen from a scheduler snapshot.
pub fn draw(f: &mut Frame, view: &SchedulerView<'_>) {
    let area = f.area();
    let active_rows = view.worker_limit.min(MAX_ACTIVE_ROWS) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(2),                  // Completed log
            Constraint::Length(active_rows + 2), // Active jobs plus borders
            Constraint::Length(STATUS_HEIGHT),   // Summary
        ])
        .split(area);

    render_completed(f, view, chunks[0]);
    render_active(f, view, chunks[1]);
    render_status(f, view, chunks[2]);
}

/// Tail of the completed list, newest entry on the bottom row.
fn render_completed(f: &mut Frame, view: &SchedulerView<'_>, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let tail = &view.completed[view.completed.len().saturating_sub(visible)..];

    let mut lines: Vec<Line> = Vec::with_capacity(visible);
    lines.extend((tail.len()..visible).map(|_| Line::from("")));
    lines.extend(
        tail.iter()
            .map(|job| Line::from(job.source.display().to_string())),
    );

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_active(f: &mut Frame, view: &SchedulerView<'_>, area: Rect) {
    let visible = (area.height.saturating_sub(2) as usize).min(MAX_ACTIVE_ROWS);
    let lines: Vec<Line> = view
        .active
        .iter()
        .take(visible)
        .map(progress_line)
        .collect();

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_status(f: &mut Frame, view: &SchedulerView<'_>, area: Rect) {
    let status = format!(
        "Converted: {} of {}    Processes: {} / {}",
        view.completed.len(),
        view.total,
        view.active.len(),
        view.worker_limit
    );
    f.render_widget(Paragraph::new(status), area);
}

/// `│▒▒▒▒▒▒▒▒▒▒ 42%│ name`
fn progress_line(job: &ActiveJobView<'_>) -> Line<'static> {
    let percent = display_percent(job.progress.percent);
    let lit = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
    let unlit = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::with_capacity(BAR_SEGMENTS + 4);
    spans.push(Span::raw("│"));
    for segment in 0..BAR_SEGMENTS {
        let style = if segment_lit(percent, segment) { lit } else { unlit };
        spans.push(Span::styled(BAR_SYMBOL, style));
    }
    spans.push(Span::raw(format!("{:>3}%", percent as u32)));
    spans.push(Span::raw("│ "));
    spans.push(Span::raw(job.source.display().to_string()));
    Line::from(spans)
}

/// Encoders can briefly report more time than the media lasts; keep the bar in range.
fn display_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

fn segment_lit(percent: f64, segment: usize) -> bool {
    percent / 10.0 >= segment as f64
}

/// Alternate-screen frontend used in interactive mode.
pub struct TuiFrontend {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TuiFrontend {
    /// Raw mode keeps typed keys off the screen; Ctrl-C then arrives as a key
    /// event instead of SIGINT and is picked up by [`Frontend::interrupt_requested`].
    pub fn enter() -> Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = stdout();
        crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(Self { terminal })
    }

    pub fn restore(mut self) -> Result<()> {
        crossterm::terminal::disable_raw_mode()?;
        self.terminal.show_cursor()?;
        crossterm::execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        Ok(())
    }
}

impl Frontend for TuiFrontend {
    fn frame(&mut self, view: &SchedulerView<'_>, _summary: &TickSummary) -> Result<()> {
        self.terminal.draw(|f| draw(f, view))?;
        Ok(())
    }

    fn interrupt_requested(&mut self) -> Result<bool> {
        let mut stop = false;
        // Drain everything typed since the last frame without blocking
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                stop |= is_stop_key(&key);
            }
        }
        Ok(stop)
    }
}

/// Ctrl-C, `q` or Esc.
fn is_stop_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') | KeyCode::Esc => true,
        _ => false,
    }
}
