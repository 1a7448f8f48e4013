use std::collections::VecDeque;
use std::fs;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{App, ProgressEvent, ProgressSink, QueryResult};
use crate::controller::{Completion, Controller, Dispatch, PageView, RequestToken};
use crate::domain::{ITEMS_PER_PAGE_CHOICES, Theme};
use crate::error::ExplorerError;
use crate::gateway::{QueryGateway, QueryResponse};
use crate::preferences::Preferences;
use crate::protein::Protein;
use crate::query::EXAMPLE_QUERY;

const EVENTS_MAX: usize = 6;
const LOGS_MAX: usize = 200;
const HINTS: &[&str] = &[
    "Tip: / searches accessions, Enter applies, Esc cancels",
    "Tip: Left/Right turn pages, Home/End jump to the ends",
    "Tip: e switches between GraphDB and Virtuoso",
    "Tip: F3 opens the query console, F4 the logs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Browser,
    Query,
    Logs,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    GotoPage,
    QueryFile,
}

enum WorkerMessage {
    Completed {
        token: RequestToken,
        result: Result<QueryResponse, ExplorerError>,
    },
    Console {
        id: u64,
        result: Result<QueryResult, ExplorerError>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    background: Color,
    text: Color,
    muted: Color,
    accent: Color,
    highlight: Color,
    ok: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: Color::White,
                text: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                highlight: Color::LightBlue,
                ok: Color::Green,
                error: Color::Red,
            },
            Theme::Dark => Palette {
                background: Color::Black,
                text: Color::White,
                muted: Color::Gray,
                accent: Color::Cyan,
                highlight: Color::DarkGray,
                ok: Color::Green,
                error: Color::LightRed,
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    fn title(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    fn label(&self) -> Style {
        Style::default().fg(self.muted)
    }
}

/// Progress text shared between the worker threads and the screen.
#[derive(Debug)]
struct ActivityState {
    status: String,
    latency_ms: Option<u128>,
    requests: u64,
    events: VecDeque<String>,
    logs: VecDeque<String>,
}

struct TuiProgress {
    state: Arc<Mutex<ActivityState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some(payload) = parse_phase(&message) {
                state.status = payload.to_string();
            } else if let Some(latency) = parse_latency(&message) {
                state.latency_ms = Some(latency);
            }
            if message.starts_with("endpoint.request") {
                state.requests = state.requests.saturating_add(1);
            }
            push_bounded(&mut state.events, message.clone(), EVENTS_MAX);
            push_bounded(&mut state.logs, format!("[{}] {message}", timestamp()), LOGS_MAX);
        }
    }
}

struct Console {
    text: String,
    source: String,
    result: Option<QueryResult>,
    error: Option<String>,
    running: Option<u64>,
    next_id: u64,
}

impl Console {
    fn new() -> Self {
        Self {
            text: EXAMPLE_QUERY.to_string(),
            source: "example".to_string(),
            result: None,
            error: None,
            running: None,
            next_id: 0,
        }
    }
}

/// Interactive registry browser.
///
/// The [`Controller`] lives on the UI thread. Every dispatch it hands out is
/// executed on its own worker thread, and the answers come back over a
/// channel in whatever order the endpoint produces them.
pub struct Tui<G: QueryGateway + 'static> {
    app: Arc<App<G>>,
    controller: Controller,
    preferences: Preferences,
    theme: Theme,
    activity: Arc<Mutex<ActivityState>>,
    view: View,
    input_mode: InputMode,
    input: String,
    selected: usize,
    console: Console,
    log_scroll: u16,
    hint_index: usize,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
}

impl<G: QueryGateway + 'static> Tui<G> {
    pub fn new(app: App<G>, controller: Controller, preferences: Preferences) -> Self {
        let theme = preferences.theme();
        let (tx, rx) = mpsc::channel();
        Self {
            app: Arc::new(app),
            controller,
            preferences,
            theme,
            activity: Arc::new(Mutex::new(ActivityState {
                status: "ready".to_string(),
                latency_ms: None,
                requests: 0,
                events: VecDeque::new(),
                logs: VecDeque::new(),
            })),
            view: View::Browser,
            input_mode: InputMode::Normal,
            input: String::new(),
            selected: 0,
            console: Console::new(),
            log_scroll: 0,
            hint_index: 0,
            tx,
            rx,
        }
    }

    pub fn run(&mut self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let dispatches = self.controller.start();
        self.spawn(dispatches);

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> miette::Result<()> {
        let mut tick = 0usize;
        loop {
            while let Ok(message) = self.rx.try_recv() {
                self.handle_message(message);
            }

            if tick % 40 == 0 {
                self.hint_index = (tick / 40) % HINTS.len();
            }

            terminal
                .draw(|frame| draw_ui(frame, self, tick))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(120)).into_diagnostic()?
                && let Event::Key(key) = event::read().into_diagnostic()?
                && self.handle_key(key)
            {
                return Ok(());
            }

            tick = tick.wrapping_add(1);
        }
    }

    fn sink(&self) -> TuiProgress {
        TuiProgress {
            state: self.activity.clone(),
        }
    }

    fn spawn(&self, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            let app = Arc::clone(&self.app);
            let tx = self.tx.clone();
            let sink = self.sink();
            thread::spawn(move || {
                sink.event(ProgressEvent {
                    message: format!(
                        "endpoint.request kind={} token={} endpoint={}",
                        dispatch.kind.as_str(),
                        dispatch.token,
                        dispatch.endpoint
                    ),
                    elapsed: None,
                });
                let result = app.gateway().execute(&dispatch.query, dispatch.endpoint);
                if let Ok(response) = &result {
                    sink.event(ProgressEvent {
                        message: format!(
                            "endpoint.response latency_ms={} token={}",
                            response.elapsed_ms, dispatch.token
                        ),
                        elapsed: None,
                    });
                }
                let _ = tx.send(WorkerMessage::Completed {
                    token: dispatch.token,
                    result,
                });
            });
        }
    }

    fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Completed { token, result } => {
                let failed = result.as_ref().err().map(ToString::to_string);
                match self.controller.complete(token, result) {
                    Completion::Applied => {
                        if let Some(error) = failed {
                            self.log(format!("phase=Failed; {error}"));
                        }
                        let count = self.controller.view().proteins().len();
                        self.selected = self.selected.min(count.saturating_sub(1));
                        if !self.controller.is_pending() {
                            self.log(format!(
                                "phase=Ready; page {} of {}",
                                self.controller.page(),
                                self.controller.total_pages()
                            ));
                        }
                    }
                    Completion::Stale => {
                        self.log(format!("dropped superseded response token={token}"));
                    }
                }
            }
            WorkerMessage::Console { id, result } => {
                if self.console.running != Some(id) {
                    return;
                }
                self.console.running = None;
                match result {
                    Ok(result) => {
                        self.console.result = Some(result);
                        self.console.error = None;
                    }
                    Err(err) => {
                        let status = err.status_code().unwrap_or(0);
                        self.console.result = None;
                        self.console.error = Some(format!("{err} (status {status})"));
                    }
                }
            }
        }
    }

    fn log(&self, message: String) {
        self.sink().event(ProgressEvent {
            message,
            elapsed: None,
        });
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if self.input_mode != InputMode::Normal {
            self.handle_input_key(key);
            return false;
        }

        match key.code {
            KeyCode::F(1) | KeyCode::Char('?') => self.view = View::Help,
            KeyCode::F(2) => self.view = View::Browser,
            KeyCode::F(3) => self.view = View::Query,
            KeyCode::F(4) => self.view = View::Logs,
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.view == View::Browser {
                    return true;
                }
                self.view = View::Browser;
            }
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('e') => {
                let endpoint = self.controller.endpoint().other();
                self.log(format!("switching endpoint to {endpoint}"));
                let dispatches = self.controller.set_endpoint(endpoint);
                self.selected = 0;
                self.spawn(dispatches);
            }
            _ => match self.view {
                View::Browser => self.handle_browser_key(key),
                View::Query => self.handle_query_key(key),
                View::Logs => match key.code {
                    KeyCode::PageUp | KeyCode::Up => self.scroll_logs(5),
                    KeyCode::PageDown | KeyCode::Down => self.scroll_logs(-5),
                    _ => {}
                },
                View::Help => {}
            },
        }
        false
    }

    fn handle_browser_key(&mut self, key: KeyEvent) {
        let dispatches = match key.code {
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Search;
                self.input = self.controller.search().as_str().to_string();
                return;
            }
            KeyCode::Char('g') => {
                self.input_mode = InputMode::GotoPage;
                self.input.clear();
                return;
            }
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                return;
            }
            KeyCode::Down => {
                let count = self.controller.view().proteins().len();
                if self.selected + 1 < count {
                    self.selected += 1;
                }
                return;
            }
            KeyCode::Right | KeyCode::Char('n') => self.controller.next_page(),
            KeyCode::Left | KeyCode::Char('p') => self.controller.previous_page(),
            KeyCode::Home => self.controller.first_page(),
            KeyCode::End => self.controller.last_page(),
            KeyCode::Char('r') => self.controller.start(),
            KeyCode::Char('+') | KeyCode::Char('-') => {
                let next = cycle_items_per_page(
                    self.controller.items_per_page(),
                    key.code == KeyCode::Char('+'),
                );
                match self.controller.set_items_per_page(next) {
                    Ok(dispatches) => dispatches,
                    Err(err) => {
                        self.log(err.to_string());
                        return;
                    }
                }
            }
            _ => return,
        };
        self.selected = 0;
        self.spawn(dispatches);
    }

    fn handle_query_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('r') => self.run_console(),
            KeyCode::Char('o') => {
                self.input_mode = InputMode::QueryFile;
                self.input.clear();
            }
            KeyCode::Char('x') => {
                self.console.text = EXAMPLE_QUERY.to_string();
                self.console.source = "example".to_string();
                self.console.result = None;
                self.console.error = None;
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input.clear();
            }
            KeyCode::Enter => {
                let value = std::mem::take(&mut self.input);
                let mode = self.input_mode;
                self.input_mode = InputMode::Normal;
                self.submit_input(mode, value);
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch) => {
                if self.input_mode != InputMode::GotoPage || ch.is_ascii_digit() {
                    self.input.push(ch);
                }
            }
            _ => {}
        }
    }

    fn submit_input(&mut self, mode: InputMode, value: String) {
        match mode {
            InputMode::Search => {
                self.log(format!("phase=Search; filtering on {value:?}"));
                let dispatches = self.controller.set_search(value);
                self.selected = 0;
                self.spawn(dispatches);
            }
            InputMode::GotoPage => {
                if let Ok(page) = value.parse::<usize>() {
                    let dispatches = self.controller.set_page(page);
                    self.selected = 0;
                    self.spawn(dispatches);
                }
            }
            InputMode::QueryFile => self.load_query_file(value.trim()),
            InputMode::Normal => {}
        }
    }

    fn load_query_file(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        match fs::read_to_string(path) {
            Ok(text) => {
                self.console.text = text;
                self.console.source = path.to_string();
                self.console.result = None;
                self.console.error = None;
                self.log(format!("loaded query from {path}"));
            }
            Err(err) => {
                self.console.error = Some(format!("failed to read {path}: {err}"));
            }
        }
    }

    fn run_console(&mut self) {
        self.console.next_id += 1;
        let id = self.console.next_id;
        self.console.running = Some(id);
        self.console.error = None;

        let app = Arc::clone(&self.app);
        let tx = self.tx.clone();
        let sink = self.sink();
        let text = self.console.text.clone();
        let endpoint = self.controller.endpoint();
        thread::spawn(move || {
            let result = app.query(&text, endpoint, &sink);
            let _ = tx.send(WorkerMessage::Console { id, result });
        });
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        match self.preferences.set_theme(self.theme) {
            Ok(()) => self.log(format!("theme set to {}", self.theme)),
            Err(err) => self.log(format!("failed to store theme: {err}")),
        }
    }

    fn scroll_logs(&mut self, delta: i16) {
        let max = self
            .activity
            .lock()
            .map(|state| state.logs.len())
            .unwrap_or(0);
        let max_scroll = max.saturating_sub(1) as i16;
        let next = (self.log_scroll as i16 + delta).clamp(0, max_scroll);
        self.log_scroll = next as u16;
    }
}

fn cycle_items_per_page(current: usize, forward: bool) -> usize {
    let len = ITEMS_PER_PAGE_CHOICES.len();
    let index = ITEMS_PER_PAGE_CHOICES
        .iter()
        .position(|choice| *choice == current)
        .unwrap_or(0);
    let next = if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    };
    ITEMS_PER_PAGE_CHOICES[next]
}

fn draw_ui<G: QueryGateway + 'static>(frame: &mut ratatui::Frame, tui: &Tui<G>, tick: usize) {
    let palette = Palette::for_theme(tui.theme);
    frame.render_widget(Block::default().style(palette.base()), frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    draw_header(frame, tui, &palette, tick, chunks[0]);
    match tui.view {
        View::Browser => draw_browser(frame, tui, &palette, chunks[1]),
        View::Query => draw_query(frame, tui, &palette, chunks[1]),
        View::Logs => draw_logs(frame, tui, &palette, chunks[1]),
        View::Help => draw_help(frame, &palette, chunks[1]),
    }
    draw_command_line(frame, tui, &palette, chunks[2]);
}

fn draw_header<G: QueryGateway + 'static>(
    frame: &mut ratatui::Frame,
    tui: &Tui<G>,
    palette: &Palette,
    tick: usize,
    area: Rect,
) {
    let controller = &tui.controller;
    let busy = controller.is_pending() || tui.console.running.is_some();
    let spinner = if busy {
        ["|", "/", "-", "\\"][tick % 4]
    } else {
        " "
    };
    let total = controller
        .total()
        .map(|total| total.to_string())
        .unwrap_or_else(|| "?".to_string());
    let title = Line::from(vec![
        Span::styled("IDP REGISTRY EXPLORER", palette.title()),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), palette.label()),
        Span::raw("   Endpoint: "),
        Span::styled(controller.endpoint().to_string(), Style::default().fg(palette.accent)),
        Span::raw(format!("   Theme: {}   ", tui.theme)),
        Span::styled(spinner, Style::default().fg(palette.ok)),
    ]);
    let search = if controller.search().is_empty() {
        "(none)".to_string()
    } else {
        format!("{:?}", controller.search().as_str())
    };
    let summary = Line::from(Span::styled(
        format!(
            "Proteins: {total}   Per page: {}   Search: {search}",
            controller.items_per_page()
        ),
        palette.label(),
    ));
    let header = Paragraph::new(vec![title, summary])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn draw_browser<G: QueryGateway + 'static>(
    frame: &mut ratatui::Frame,
    tui: &Tui<G>,
    palette: &Palette,
    area: Rect,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(area);
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let controller = &tui.controller;
    let mut lines = vec![Line::from(Span::styled("PROTEINS", palette.title()))];
    match controller.view() {
        PageView::Idle => lines.push(Line::from("")),
        PageView::Loading => lines.push(Line::from(Span::styled("Loading...", palette.label()))),
        PageView::Failed => lines.push(Line::from(Span::styled(
            "This page could not be loaded.",
            Style::default().fg(palette.error),
        ))),
        PageView::Loaded(proteins) if proteins.is_empty() => {
            lines.push(Line::from(Span::styled("No proteins found.", palette.label())))
        }
        PageView::Loaded(proteins) => {
            for (index, protein) in proteins.iter().enumerate() {
                let style = if index == tui.selected {
                    Style::default()
                        .bg(palette.highlight)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let mut title = vec![
                    Span::styled(format!("{:<10} ", protein.accession()), style.fg(palette.accent)),
                    Span::styled(protein.name.clone(), style),
                ];
                if protein.is_isoform() {
                    title.push(Span::styled(" [isoform]", palette.label()));
                }
                lines.push(Line::from(title));
                lines.push(Line::from(Span::styled(
                    format!(
                        "           {} (taxon {}) · {} sources",
                        protein.organism_name,
                        protein.taxonomy_number(),
                        protein.source_count()
                    ),
                    palette.label(),
                )));
            }
        }
    }
    let list = Paragraph::new(lines)
        .block(Block::default().borders(Borders::RIGHT))
        .wrap(Wrap { trim: false });
    frame.render_widget(list, main[0]);

    let selected = controller.view().proteins().get(tui.selected);
    let details = Paragraph::new(protein_details(selected, palette))
        .wrap(Wrap { trim: true });
    frame.render_widget(details, main[1]);

    draw_pagination(frame, tui, palette, rows[1]);
}

fn protein_details(protein: Option<&Protein>, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled("DETAILS", palette.title()))];
    let Some(protein) = protein else {
        return lines;
    };
    lines.push(Line::from(vec![
        Span::styled("UniProt: ", palette.label()),
        Span::raw(protein.uniprot_uri.clone()),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Taxonomy: ", palette.label()),
        Span::raw(protein.taxonomy_uri.clone()),
    ]));
    for source in protein.sources() {
        lines.push(Line::from(""));
        let url = source.url();
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} {}", source.name, source.source_id),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                if url.is_empty() {
                    String::new()
                } else {
                    format!("  {url}")
                },
                palette.label(),
            ),
        ]));
        for range in source.ranges() {
            lines.push(Line::from(Span::raw(format!(
                "  {}-{}",
                range.start, range.end
            ))));
            for term in &range.terms {
                lines.push(Line::from(vec![
                    Span::raw(format!("    {} ", term.name)),
                    Span::styled(format!("[{}]", term.code), palette.label()),
                ]));
            }
        }
    }
    lines
}

fn draw_pagination<G: QueryGateway + 'static>(
    frame: &mut ratatui::Frame,
    tui: &Tui<G>,
    palette: &Palette,
    area: Rect,
) {
    let controller = &tui.controller;
    let mut pages = vec![Span::styled("Pages: ", palette.label())];
    for number in controller.page_numbers() {
        if number == controller.page() {
            pages.push(Span::styled(
                format!("[{number}]"),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            pages.push(Span::raw(format!(" {number} ")));
        }
    }
    pages.push(Span::styled(
        format!(
            "   page {} of {}",
            controller.page(),
            controller.total_pages()
        ),
        palette.label(),
    ));
    if let Some(elapsed) = controller.elapsed_ms() {
        pages.push(Span::styled(format!("   {elapsed} ms"), palette.label()));
    }

    let status = if let Some(failure) = controller.error() {
        Line::from(Span::styled(
            format!(
                "{} query failed: {} (status {})",
                failure.kind.as_str(),
                failure.message,
                failure.status
            ),
            Style::default().fg(palette.error),
        ))
    } else if !controller.skipped().is_empty() {
        Line::from(Span::styled(
            format!("{} malformed rows skipped (see logs)", controller.skipped().len()),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::from(Span::styled(HINTS[tui.hint_index], palette.label()))
    };

    let widget = Paragraph::new(vec![Line::from(pages), status])
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(widget, area);
}

fn draw_query<G: QueryGateway + 'static>(
    frame: &mut ratatui::Frame,
    tui: &Tui<G>,
    palette: &Palette,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Min(4),
            Constraint::Length(4),
        ])
        .split(area);

    let console = &tui.console;
    let mut text = vec![Line::from(vec![
        Span::styled("QUERY ", palette.title()),
        Span::styled(format!("({})", console.source), palette.label()),
    ])];
    text.extend(console.text.lines().map(|line| Line::from(line.to_string())));
    let query = Paragraph::new(text)
        .block(Block::default().borders(Borders::BOTTOM))
        .wrap(Wrap { trim: false });
    frame.render_widget(query, chunks[0]);

    let mut results = vec![Line::from(Span::styled("RESULTS", palette.title()))];
    if console.running.is_some() {
        results.push(Line::from(Span::styled("Running...", palette.label())));
    } else if let Some(error) = &console.error {
        results.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(palette.error),
        )));
    } else if let Some(result) = &console.result {
        results.push(Line::from(Span::styled(
            format!(
                "{} rows in {} ms on {}",
                result.rows.len(),
                result.elapsed_ms,
                result.endpoint
            ),
            palette.label(),
        )));
        results.push(Line::from(Span::styled(
            result.header.join(" | "),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for row in &result.rows {
            results.push(Line::from(row.join(" | ")));
        }
        if !result.skipped.is_empty() {
            results.push(Line::from(Span::styled(
                format!("{} malformed rows skipped", result.skipped.len()),
                Style::default().fg(Color::Yellow),
            )));
        }
    }
    let table = Paragraph::new(results).wrap(Wrap { trim: false });
    frame.render_widget(table, chunks[1]);

    let curl = tui.app.curl(&console.text, tui.controller.endpoint());
    let export = Paragraph::new(vec![
        Line::from(Span::styled("curl", palette.label())),
        Line::from(curl),
    ])
    .block(Block::default().borders(Borders::TOP))
    .wrap(Wrap { trim: false });
    frame.render_widget(export, chunks[2]);
}

fn draw_logs<G: QueryGateway + 'static>(
    frame: &mut ratatui::Frame,
    tui: &Tui<G>,
    palette: &Palette,
    area: Rect,
) {
    let Ok(state) = tui.activity.lock() else {
        return;
    };
    let visible = area.height.saturating_sub(2).max(1) as usize;
    let total = state.logs.len();
    let start = total.saturating_sub(tui.log_scroll as usize + visible);
    let latency = state
        .latency_ms
        .map(|value| format!("{value} ms"))
        .unwrap_or_else(|| "--".to_string());
    let mut lines = Vec::with_capacity(visible + 1);
    lines.push(Line::from(vec![
        Span::styled("LOGS (scrollable)", palette.title()),
        Span::styled(
            format!(
                "   Requests: {}   Latency: {latency}   Status: {}",
                state.requests, state.status
            ),
            palette.label(),
        ),
    ]));
    for line in state.logs.iter().skip(start).take(visible) {
        lines.push(Line::from(line.clone()));
    }
    let logs = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(logs, area);
}

fn draw_help(frame: &mut ratatui::Frame, palette: &Palette, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled("Help", palette.title()));
    let lines = vec![
        Line::from("F1 Help  F2 Browser  F3 Query console  F4 Logs  q quit"),
        Line::from("Browser: / search   Left/Right page   Home/End first/last   g go to page"),
        Line::from("         Up/Down select   +/- items per page   r reload"),
        Line::from("Query:   Enter run   o open query file   x example query"),
        Line::from("Global:  e switch endpoint   t toggle theme"),
    ];
    let view = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(view, area);
}

fn draw_command_line<G: QueryGateway + 'static>(
    frame: &mut ratatui::Frame,
    tui: &Tui<G>,
    palette: &Palette,
    area: Rect,
) {
    let prefix = match tui.input_mode {
        InputMode::Normal => "",
        InputMode::Search => "/ ",
        InputMode::GotoPage => "page: ",
        InputMode::QueryFile => "open: ",
    };
    let recent = tui
        .activity
        .lock()
        .ok()
        .and_then(|state| state.events.back().cloned())
        .unwrap_or_default();
    let mut lines = vec![Line::from(vec![
        Span::styled(prefix, palette.title()),
        Span::styled(tui.input.clone(), Style::default().fg(palette.text)),
    ])];
    lines.push(Line::from(vec![
        Span::styled("= ", palette.label()),
        Span::styled(recent, palette.label()),
    ]));

    let block = Block::default().borders(Borders::TOP);
    frame.render_widget(Paragraph::new(lines).block(block), area);

    if tui.input_mode == InputMode::Normal {
        return;
    }
    let now_ms = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::from_millis(0))
        .as_millis();
    if (now_ms / 700) % 2 == 0 {
        let mut cursor_x = area
            .x
            .saturating_add((prefix.len() + tui.input.chars().count()) as u16);
        if cursor_x >= area.x.saturating_add(area.width) {
            cursor_x = area.x.saturating_add(area.width.saturating_sub(1));
        }
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

fn parse_phase(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("phase=")?;
    let (_, payload) = rest.split_once(';')?;
    Some(payload.trim())
}

fn parse_latency(message: &str) -> Option<u128> {
    message
        .split("latency_ms=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse::<u128>().ok())
}

fn push_bounded(buffer: &mut VecDeque<String>, item: String, max: usize) {
    buffer.push_back(item);
    while buffer.len() > max {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
