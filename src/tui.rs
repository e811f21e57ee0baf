use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap,
    },
};
use std::io::stdout;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::app::App;
use crate::db::KeyValueStore;
use crate::error::Error;
use crate::form::Field;
use crate::presentation::{format_date, status_color, ActionKind, EMPTY_TABLE_MESSAGE};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    Form,
    ConfirmDelete,
}

struct UiState {
    mode: Mode,
    table_state: TableState,
}

impl UiState {
    fn new() -> Self {
        Self {
            mode: Mode::Browse,
            table_state: TableState::default().with_selected(Some(0)),
        }
    }

    fn selected(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    /// Keep the cursor on a real row after the table was rebuilt.
    fn clamp(&mut self, len: usize) {
        let selected = self.selected().min(len.saturating_sub(1));
        self.table_state.select(Some(selected));
    }

    fn next(&mut self, len: usize) {
        if len > 0 && self.selected() < len - 1 {
            self.table_state.select(Some(self.selected() + 1));
        }
    }

    fn prev(&mut self) {
        if self.selected() > 0 {
            self.table_state.select(Some(self.selected() - 1));
        }
    }
}

pub fn run_browse<K: KeyValueStore>(app: &mut App<K>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<K: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App<K>,
) -> Result<()> {
    let mut ui = UiState::new();

    loop {
        app.tick(Instant::now());
        terminal.draw(|frame| draw(frame, app, &mut ui))?;

        // Poll so notifications expire without input
        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if handle_key(app, &mut ui, key, Instant::now()) {
                break;
            }
        }
    }
    Ok(())
}

/// Returns true when the user asked to quit.
fn handle_key<K: KeyValueStore>(
    app: &mut App<K>,
    ui: &mut UiState,
    key: KeyEvent,
    now: Instant,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match ui.mode {
        Mode::Browse => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Down | KeyCode::Char('j') => ui.next(app.table().len()),
            KeyCode::Up | KeyCode::Char('k') => ui.prev(),
            KeyCode::Char('a') => {
                app.cancel_edit();
                ui.mode = Mode::Form;
            }
            KeyCode::Char('e') => {
                if app.row_action(ui.selected(), ActionKind::Edit).is_some() {
                    ui.mode = Mode::Form;
                }
            }
            KeyCode::Char('d') => {
                if app.row_action(ui.selected(), ActionKind::Delete).is_some() {
                    ui.mode = Mode::ConfirmDelete;
                }
            }
            KeyCode::Char('/') => ui.mode = Mode::Search,
            KeyCode::Char('f') => app.cycle_status_filter(),
            KeyCode::Char('x') => {
                if let Some(id) = app.notifications.visible(now).last().map(|n| n.id) {
                    app.notifications.dismiss(id);
                }
            }
            _ => {}
        },

        Mode::Search => match key.code {
            KeyCode::Enter => ui.mode = Mode::Browse,
            KeyCode::Esc => {
                app.set_search("");
                ui.mode = Mode::Browse;
            }
            KeyCode::Backspace => {
                let mut term = app.search().to_string();
                term.pop();
                app.set_search(&term);
            }
            KeyCode::Char(c) => {
                let term = format!("{}{}", app.search(), c);
                app.set_search(&term);
            }
            _ => {}
        },

        Mode::Form => match key.code {
            KeyCode::Esc => {
                app.cancel_edit();
                ui.mode = Mode::Browse;
            }
            KeyCode::Tab | KeyCode::Down => app.form.focus = app.form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => app.form.focus = app.form.focus.prev(),
            KeyCode::Left if app.form.focus == Field::Status => {
                app.form.status = app.form.status.prev()
            }
            KeyCode::Right if app.form.focus == Field::Status => {
                app.form.status = app.form.status.next()
            }
            KeyCode::Enter => match app.submit(now) {
                Ok(record) => {
                    ui.mode = Mode::Browse;
                    if let Some(idx) = app.table().position(record.id) {
                        ui.table_state.select(Some(idx));
                    }
                }
                Err(err) => {
                    app.notifications.notify(err.to_string(), now);
                    // The edit target is gone and the form is back in create mode
                    if matches!(err, Error::NotFound(_)) {
                        ui.mode = Mode::Browse;
                    }
                }
            },
            KeyCode::Backspace => {
                if let Some(value) = app.form.value_mut(app.form.focus) {
                    value.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(value) = app.form.value_mut(app.form.focus) {
                    value.push(c);
                }
            }
            _ => {}
        },

        Mode::ConfirmDelete => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(err) = app.confirm_delete(now) {
                    app.notifications.notify(err.to_string(), now);
                }
                ui.mode = Mode::Browse;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.cancel_delete();
                ui.mode = Mode::Browse;
            }
            _ => {}
        },
    }

    ui.clamp(app.table().len());
    false
}

fn draw<K: KeyValueStore>(frame: &mut Frame, app: &App<K>, ui: &mut UiState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(outer[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(12), Constraint::Min(0)])
        .split(chunks[1]);

    draw_table(frame, app, ui, chunks[0]);
    draw_chart(frame, app, side[0]);
    draw_detail(frame, app, ui, side[1]);

    let help = match ui.mode {
        Mode::Browse => {
            " j/k:navigate  a:add  e:edit  d:delete  /:search  f:filter  x:dismiss  q:quit"
        }
        Mode::Search => " type to search  enter:keep  esc:clear",
        Mode::Form => " tab:next field  left/right:status  enter:save  esc:cancel",
        Mode::ConfirmDelete => " y:delete  n:keep",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        outer[1],
    );

    match ui.mode {
        Mode::Form => draw_form(frame, app),
        Mode::ConfirmDelete => draw_confirm(frame, app),
        Mode::Browse | Mode::Search => {}
    }

    draw_notifications(frame, app);
}

fn draw_table<K: KeyValueStore>(frame: &mut Frame, app: &App<K>, ui: &mut UiState, area: Rect) {
    let mut title = format!(" Applications ({}) ", app.table().len());
    if !app.search().is_empty() || ui.mode == Mode::Search {
        title.push_str(&format!("[/{}] ", app.search()));
    }
    if let Some(status) = app.status_filter() {
        title.push_str(&format!("[{}] ", status));
    }
    let block = Block::default().borders(Borders::ALL).title(title);

    if app.table().is_empty() {
        let empty = Paragraph::new(EMPTY_TABLE_MESSAGE)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = app
        .table()
        .rows()
        .iter()
        .map(|row| {
            let company = if row.link.is_some() {
                format!("{} *", row.company)
            } else {
                row.company.clone()
            };
            Row::new(vec![
                Span::styled(company, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(row.title.clone()),
                Span::styled(row.status.clone(), Style::default().fg(hex_color(row.color))),
                Span::raw(row.date.clone()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(32),
            Constraint::Percentage(32),
            Constraint::Percentage(16),
            Constraint::Percentage(20),
        ],
    )
    .header(
        Row::new(vec!["Company", "Job Title", "Status", "Date"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut ui.table_state);
}

fn draw_chart<K: KeyValueStore>(frame: &mut Frame, app: &App<K>, area: Rect) {
    let chart = app.chart();
    let bars: Vec<Bar> = chart
        .labels
        .iter()
        .zip(&chart.values)
        .zip(&chart.colors)
        .enumerate()
        .map(|(i, ((label, value), color))| {
            Bar::default()
                .value(*value)
                .label(Line::from(*label))
                .text_value(format!("{} ({}%)", value, chart.share(i)))
                .style(Style::default().fg(hex_color(color)))
        })
        .collect();

    let widget = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" By Status "))
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(1);

    frame.render_widget(widget, area);
}

fn draw_detail<K: KeyValueStore>(frame: &mut Frame, app: &App<K>, ui: &UiState, area: Rect) {
    let record = app
        .table()
        .rows()
        .get(ui.selected())
        .and_then(|row| app.store().get(row.id));

    let text = match record {
        None => Text::raw("No application selected"),
        Some(record) => {
            let mut lines: Vec<Line> = vec![
                Line::from(Span::styled(
                    record.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(format!("at {}", record.company)),
                Line::from(Span::styled(
                    format!("Status: {}", record.status),
                    Style::default().fg(hex_color(status_color(&record.status))),
                )),
                Line::from(format!("Applied: {}", format_date(record.date))),
            ];
            if let Some(link) = &record.link {
                lines.push(Line::from(format!("Listing: {}", link)));
            }
            if let Some(notes) = &record.notes {
                lines.push(Line::from(""));
                let width = area.width.saturating_sub(4).max(10) as usize;
                for line in textwrap::fill(notes, width).lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Text::from(lines)
        }
    };

    let detail = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, area);
}

fn draw_form<K: KeyValueStore>(frame: &mut Frame, app: &App<K>) {
    let area = centered(frame.area(), 64, 10);
    let form = &app.form;

    let lines: Vec<Line> = Field::ORDER
        .iter()
        .map(|&field| {
            let marker = if field == form.focus { "> " } else { "  " };
            let value = match field {
                Field::Status => format!("< {} >", form.status),
                _ => form.display_value(field).to_string(),
            };
            let style = if field == form.focus {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{:<10}", field.label()), Style::default().fg(Color::Cyan)),
                Span::styled(value, style),
            ])
        })
        .collect();

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", form.submit_label())),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn draw_confirm<K: KeyValueStore>(frame: &mut Frame, app: &App<K>) {
    let Some(record) = app.pending_delete() else {
        return;
    };
    let area = centered(frame.area(), 56, 5);
    let popup = Paragraph::new(vec![
        Line::from("Are you sure you want to delete this application?"),
        Line::from(Span::styled(
            format!("{} - {}", record.company, record.title),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("y / n"),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(" Delete "));
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

/// Stacked top-right, oldest on top.
fn draw_notifications<K: KeyValueStore>(frame: &mut Frame, app: &App<K>) {
    let screen = frame.area();
    let width = 44.min(screen.width);
    let mut y = screen.y + 1;

    for note in app.notifications.visible(Instant::now()) {
        if y + 3 > screen.bottom() {
            break;
        }
        let area = Rect::new(screen.right().saturating_sub(width + 1), y, width, 3);
        let widget = Paragraph::new(note.message.as_str())
            .style(Style::default().fg(Color::White).bg(Color::Blue))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(Clear, area);
        frame.render_widget(widget, area);
        y += 3;
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn hex_color(hex: &str) -> Color {
    Color::from_str(hex).unwrap_or(Color::Gray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::form::FormMode;
    use crate::models::{sample_applications, Status};
    use crate::storage::{Storage, DEFAULT_KEY};
    use crate::store::Store;
    use ratatui::backend::TestBackend;

    fn app(seed: Vec<crate::models::ApplicationRecord>) -> App<Database> {
        let storage = Storage::new(Database::open_in_memory().unwrap(), DEFAULT_KEY);
        App::new(Store::open(storage, seed).unwrap(), Duration::from_secs(5))
    }

    fn press(app: &mut App<Database>, ui: &mut UiState, code: KeyCode) -> bool {
        handle_key(app, ui, KeyEvent::new(code, KeyModifiers::NONE), Instant::now())
    }

    fn type_text(app: &mut App<Database>, ui: &mut UiState, text: &str) {
        for c in text.chars() {
            press(app, ui, KeyCode::Char(c));
        }
    }

    fn screen(app: &App<Database>, ui: &mut UiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| draw(frame, app, ui)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_draw_lists_applications_and_chart() {
        let app = app(sample_applications());
        let mut ui = UiState::new();
        let text = screen(&app, &mut ui);
        assert!(text.contains("Applications (5)"));
        assert!(text.contains("Creative Tech"));
        assert!(text.contains("By Status"));
    }

    #[test]
    fn test_draw_empty_placeholder() {
        let app = app(Vec::new());
        let mut ui = UiState::new();
        let text = screen(&app, &mut ui);
        assert!(text.contains("No applications found"));
    }

    #[test]
    fn test_add_through_form() {
        let mut app = app(Vec::new());
        let mut ui = UiState::new();

        press(&mut app, &mut ui, KeyCode::Char('a'));
        assert_eq!(ui.mode, Mode::Form);
        type_text(&mut app, &mut ui, "Acme");
        press(&mut app, &mut ui, KeyCode::Tab);
        type_text(&mut app, &mut ui, "SRE");
        press(&mut app, &mut ui, KeyCode::Tab);
        press(&mut app, &mut ui, KeyCode::Right);
        press(&mut app, &mut ui, KeyCode::Enter);

        assert_eq!(ui.mode, Mode::Browse);
        let record = &app.store().list()[0];
        assert_eq!(record.company, "Acme");
        assert_eq!(record.status, Status::InReview);
        assert!(screen(&app, &mut ui).contains("added successfully"));
    }

    #[test]
    fn test_invalid_form_stays_open() {
        let mut app = app(Vec::new());
        let mut ui = UiState::new();
        press(&mut app, &mut ui, KeyCode::Char('a'));
        press(&mut app, &mut ui, KeyCode::Enter);
        assert_eq!(ui.mode, Mode::Form);
        assert!(app.store().list().is_empty());
    }

    #[test]
    fn test_delete_asks_first() {
        let mut app = app(sample_applications());
        let mut ui = UiState::new();

        press(&mut app, &mut ui, KeyCode::Char('d'));
        assert_eq!(ui.mode, Mode::ConfirmDelete);
        press(&mut app, &mut ui, KeyCode::Char('n'));
        assert_eq!(app.store().list().len(), 5);

        press(&mut app, &mut ui, KeyCode::Char('j'));
        press(&mut app, &mut ui, KeyCode::Char('d'));
        press(&mut app, &mut ui, KeyCode::Char('y'));
        assert_eq!(app.store().list().len(), 4);
        assert!(app.store().get(4).is_none());
    }

    #[test]
    fn test_search_mode_filters_table() {
        let mut app = app(sample_applications());
        let mut ui = UiState::new();
        press(&mut app, &mut ui, KeyCode::Char('j'));
        press(&mut app, &mut ui, KeyCode::Char('j'));

        press(&mut app, &mut ui, KeyCode::Char('/'));
        type_text(&mut app, &mut ui, "corp");
        assert_eq!(app.table().len(), 1);
        assert_eq!(ui.selected(), 0);

        press(&mut app, &mut ui, KeyCode::Esc);
        assert_eq!(ui.mode, Mode::Browse);
        assert_eq!(app.table().len(), 5);
    }

    #[test]
    fn test_edit_cancel_restores_create() {
        let mut app = app(sample_applications());
        let mut ui = UiState::new();
        press(&mut app, &mut ui, KeyCode::Char('e'));
        assert_eq!(app.form.mode(), FormMode::Update(5));
        press(&mut app, &mut ui, KeyCode::Esc);
        assert_eq!(app.form.mode(), FormMode::Create);
        assert!(!press(&mut app, &mut ui, KeyCode::Char('f')));
        assert!(press(&mut app, &mut ui, KeyCode::Char('q')));
    }
}
