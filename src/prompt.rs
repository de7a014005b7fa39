//! Interactive terminal prompts.
//!
//! This module provides ratatui-based widgets for:
//! - Picking one option from a list
//! - Entering a line of text with inline validation
//! - Answering a yes/no question
//!
//! Each widget has a `*_with` variant that takes any ratatui backend and an
//! [`EventSource`], so tests can drive it with scripted key presses.
//! Esc cancels a prompt (`Ok(None)`); Ctrl+C exits the process.

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io::{self, Stdout};

/// Trait representing an event source (so tests can inject fake events).
pub trait EventSource {
    fn read_event(&mut self) -> anyhow::Result<Event>;
}

/// Real event source that delegates to `crossterm::event::read`.
pub struct CrosstermEventSource;

impl EventSource for CrosstermEventSource {
    fn read_event(&mut self) -> anyhow::Result<Event> {
        Ok(event::read()?)
    }
}

fn with_terminal<T>(
    run: impl FnOnce(&mut Terminal<CrosstermBackend<Stdout>>, &mut CrosstermEventSource) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All))?;
    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;

    let mut events = CrosstermEventSource;
    let res = run(&mut term, &mut events);

    // Restore terminal in all cases
    let _ = term.clear();
    let _ = term.show_cursor();
    terminal::disable_raw_mode()?;
    drop(term);

    res
}

fn exit_on_ctrl_c(code: KeyCode, modifiers: KeyModifiers) -> anyhow::Result<()> {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        terminal::disable_raw_mode()?;
        std::process::exit(130);
    }
    Ok(())
}

/// Pick one of `options`. Returns the chosen index.
pub fn select(title: &str, options: &[String]) -> anyhow::Result<Option<usize>> {
    with_terminal(|term, events| select_with(term, events, title, options))
}

pub fn select_with<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    events: &mut E,
    title: &str,
    options: &[String],
) -> anyhow::Result<Option<usize>> {
    if options.is_empty() {
        anyhow::bail!("Nothing to select");
    }

    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| {
            render_select_ui(frame, title, options, &mut list_state);
        })?;

        if let Event::Key(key) = events.read_event()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            exit_on_ctrl_c(key.code, key.modifiers)?;

            match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    if let Some(idx) = list_state.selected()
                        && idx > 0
                    {
                        list_state.select(Some(idx - 1));
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if let Some(idx) = list_state.selected()
                        && idx + 1 < options.len()
                    {
                        list_state.select(Some(idx + 1));
                    }
                }
                KeyCode::Enter => return Ok(list_state.selected()),
                KeyCode::Esc => return Ok(None),
                _ => {}
            }
        }
    }
}

pub fn render_select_ui(f: &mut Frame, title: &str, options: &[String], list_state: &mut ListState) {
    let size = f.size();

    let instructions_height = 3;
    let available_for_list = size.height.saturating_sub(instructions_height);

    let chunks = Layout::default()
        .constraints([
            Constraint::Max(available_for_list.max(3)),
            Constraint::Length(instructions_height),
        ])
        .split(size);

    let items: Vec<ListItem> = options.iter().map(|o| ListItem::new(o.as_str())).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, chunks[0], &mut *list_state);

    let instructions = Paragraph::new("↑/↓: navigate | Enter: select | Esc: cancel")
        .block(Block::default().borders(Borders::ALL).title("Instructions"))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[1]);
}

/// Read one line of text. `validate` runs on Enter; its message is shown
/// inline and the prompt stays open until it passes.
pub fn input(
    title: &str,
    description: &str,
    placeholder: &str,
    validate: &dyn Fn(&str) -> Result<(), String>,
) -> anyhow::Result<Option<String>> {
    with_terminal(|term, events| input_with(term, events, title, description, placeholder, validate))
}

pub fn input_with<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    events: &mut E,
    title: &str,
    description: &str,
    placeholder: &str,
    validate: &dyn Fn(&str) -> Result<(), String>,
) -> anyhow::Result<Option<String>> {
    let mut value = String::new();
    let mut message = String::new();

    loop {
        terminal.draw(|frame| {
            render_input_ui(frame, title, description, placeholder, &value, &message);
        })?;

        if let Event::Key(key) = events.read_event()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            exit_on_ctrl_c(key.code, key.modifiers)?;

            match key.code {
                KeyCode::Enter => match validate(&value) {
                    Ok(()) => return Ok(Some(value)),
                    Err(e) => message = format!("⚠️  {}", e),
                },
                KeyCode::Esc => return Ok(None),
                KeyCode::Char(c) => {
                    value.push(c);
                    message.clear();
                }
                KeyCode::Backspace => {
                    value.pop();
                    message.clear();
                }
                _ => {}
            }
        }
    }
}

pub fn render_input_ui(
    f: &mut Frame,
    title: &str,
    description: &str,
    placeholder: &str,
    value: &str,
    message: &str,
) {
    let size = f.size();
    let chunks = Layout::default()
        .constraints([
            Constraint::Length(if description.is_empty() { 0 } else { 2 }),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(size);

    if !description.is_empty() {
        f.render_widget(
            Paragraph::new(description.to_string()).style(Style::default().fg(Color::DarkGray)),
            chunks[0],
        );
    }

    let line = if value.is_empty() && !placeholder.is_empty() {
        Line::from(Span::styled(
            placeholder.to_string(),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(vec![
            Span::raw(value.to_string()),
            Span::styled("█", Style::default().fg(Color::Cyan)),
        ])
    };
    let field = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(field, chunks[1]);

    if !message.is_empty() {
        f.render_widget(
            Paragraph::new(message.to_string()).style(Style::default().fg(Color::Yellow)),
            chunks[2],
        );
    }
}

/// Ask a yes/no question.
pub fn confirm(title: &str, description: &str) -> anyhow::Result<Option<bool>> {
    with_terminal(|term, events| confirm_with(term, events, title, description))
}

/// Left/Right or Tab toggle, y/n answer directly, Enter accepts the
/// highlighted choice (Yes by default).
pub fn confirm_with<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    events: &mut E,
    title: &str,
    description: &str,
) -> anyhow::Result<Option<bool>> {
    let mut yes = true;

    loop {
        terminal.draw(|frame| {
            render_confirm_ui(frame, title, description, yes);
        })?;

        if let Event::Key(key) = events.read_event()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            exit_on_ctrl_c(key.code, key.modifiers)?;

            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(Some(true)),
                KeyCode::Char('n') | KeyCode::Char('N') => return Ok(Some(false)),
                KeyCode::Left | KeyCode::Right | KeyCode::Tab => yes = !yes,
                KeyCode::Enter => return Ok(Some(yes)),
                KeyCode::Esc => return Ok(None),
                _ => {}
            }
        }
    }
}

pub fn render_confirm_ui(f: &mut Frame, title: &str, description: &str, yes: bool) {
    let size = f.size();
    let chunks = Layout::default()
        .constraints([
            Constraint::Length(1),
            Constraint::Length(if description.is_empty() { 0 } else { 1 }),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(size);

    f.render_widget(
        Paragraph::new(title.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        chunks[0],
    );
    if !description.is_empty() {
        f.render_widget(
            Paragraph::new(description.to_string()).style(Style::default().fg(Color::DarkGray)),
            chunks[1],
        );
    }

    let active = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let inactive = Style::default().fg(Color::DarkGray);
    let buttons = Line::from(vec![
        Span::styled(" Yes ", if yes { active } else { inactive }),
        Span::raw("  "),
        Span::styled(" No ", if yes { inactive } else { active }),
    ]);
    f.render_widget(Paragraph::new(buttons), chunks[2]);
}
