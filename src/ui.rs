use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{info, warn};

use crate::content::Content;
use crate::data::RepositoryService;
use crate::loader::{FetchState, RepoLoader};
use crate::page::{
    self, RepoView, COLOR_ACCENT, COLOR_BG, COLOR_BORDER_FOCUSED, COLOR_BORDER_IDLE,
    COLOR_ERROR, COLOR_PANEL_BG, COLOR_PANEL_FOCUSED_BG, COLOR_PANEL_SELECTED_BG,
    COLOR_TEXT_PRIMARY, COLOR_TEXT_SECONDARY,
};
use crate::present::{DisplayWindow, RepoCard};
use crate::toc::{self, Anchor};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TOC_MIN_TERMINAL_WIDTH: u16 = 80;
const TOC_WIDTH: u16 = 30;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pane {
    Contents,
    Page,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Contents => "Contents",
            Pane::Page => "Projects",
        }
    }

    fn toggle(self) -> Self {
        match self {
            Pane::Contents => Pane::Page,
            Pane::Page => Pane::Contents,
        }
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

#[derive(Clone)]
pub struct Options {
    pub content: Content,
    pub service: Arc<dyn RepositoryService + Send + Sync>,
    pub identity: String,
    pub window: DisplayWindow,
}

pub struct Model {
    content: Content,
    loader: RepoLoader,
    window: DisplayWindow,
    toc_entries: Vec<toc::Entry>,
    toc_selected: usize,
    toc_visible: bool,
    terminal_width: Option<u16>,
    focused_pane: Pane,
    scroll: usize,
    page_height: usize,
    page_len: usize,
    anchors: Vec<Anchor>,
    cards: Vec<RepoCard>,
    card_lines: Vec<usize>,
    selected_card: Option<usize>,
    identity_input: Option<String>,
    status_message: String,
    spinner: Spinner,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let toc_entries = toc::entries(&toc::structure(&opts.content.projects));
        let toc_visible = opts.content.projects.table_of_contents.display && !toc_entries.is_empty();
        let mut model = Self {
            loader: RepoLoader::new(opts.service),
            window: opts.window,
            toc_entries,
            toc_selected: 0,
            toc_visible,
            terminal_width: None,
            focused_pane: Pane::Page,
            scroll: 0,
            page_height: 0,
            page_len: 0,
            anchors: Vec::new(),
            cards: Vec::new(),
            card_lines: Vec::new(),
            selected_card: None,
            identity_input: None,
            status_message: String::new(),
            spinner: Spinner::new(),
            needs_redraw: true,
            content: opts.content,
        };
        model.watch_identity(&opts.identity);
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_loader() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                            }
                        }
                        self.mark_dirty();
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.loader.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_loader(&mut self) -> bool {
        if !self.loader.poll() {
            return false;
        }
        self.selected_card = None;
        self.refresh_status();
        true
    }

    fn refresh_status(&mut self) {
        let identity = self.loader.identity().unwrap_or_default().to_string();
        self.status_message = match self.loader.state() {
            FetchState::Loading => format!("Loading repositories for @{identity}..."),
            FetchState::Error(message) => format!("Failed to load @{identity}: {message}"),
            FetchState::Ready(items) => format!(
                "@{identity}: {} repositories. n/p page, [/] select, o code, d demo.",
                items.len()
            ),
        };
    }

    fn watch_identity(&mut self, identity: &str) {
        if self.loader.watch(identity) {
            info!(identity = %identity.trim(), "watching identity");
            self.selected_card = None;
            self.spinner.reset();
        }
        self.refresh_status();
    }

    fn ready_len(&self) -> Option<usize> {
        match self.loader.state() {
            FetchState::Ready(items) => Some(items.len()),
            _ => None,
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.identity_input.is_some() {
            self.handle_identity_key(code);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Tab | KeyCode::BackTab => {
                if self.contents_shown() {
                    self.focused_pane = self.focused_pane.toggle();
                }
            }
            KeyCode::Char('u') => {
                self.identity_input = Some(self.loader.identity().unwrap_or_default().to_string());
                self.status_message = "Enter a GitHub username. Enter applies, Esc cancels.".into();
            }
            KeyCode::Char('r') => {
                if self.loader.retry() {
                    self.spinner.reset();
                    self.refresh_status();
                } else {
                    self.status_message = "Nothing to retry.".into();
                }
            }
            KeyCode::Char('n') => self.change_window(true),
            KeyCode::Char('p') => self.change_window(false),
            KeyCode::Char(']') => self.select_card(1),
            KeyCode::Char('[') => self.select_card(-1),
            KeyCode::Char('o') => self.open_selected(false),
            KeyCode::Char('d') => self.open_selected(true),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll(),
            KeyCode::PageDown => self.scroll_by(self.page_height.max(1) as isize),
            KeyCode::PageUp => self.scroll_by(-(self.page_height.max(1) as isize)),
            KeyCode::Char('j') | KeyCode::Down => match self.focused_pane {
                Pane::Contents => self.move_toc(1),
                Pane::Page => self.scroll_by(1),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.focused_pane {
                Pane::Contents => self.move_toc(-1),
                Pane::Page => self.scroll_by(-1),
            },
            KeyCode::Enter => match self.focused_pane {
                Pane::Contents => {
                    if let Some(entry) = self.toc_entries.get(self.toc_selected) {
                        let id = entry.id.clone();
                        self.jump_to(&id);
                    }
                }
                Pane::Page => self.open_selected(false),
            },
            _ => {}
        }
        Ok(false)
    }

    fn handle_identity_key(&mut self, code: KeyCode) {
        let Some(input) = self.identity_input.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.identity_input = None;
                self.refresh_status();
            }
            KeyCode::Enter => {
                let identity = input.trim().to_string();
                self.identity_input = None;
                self.watch_identity(&identity);
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) if !ch.is_whitespace() => input.push(ch),
            _ => {}
        }
    }

    fn change_window(&mut self, forward: bool) {
        let Some(len) = self.ready_len() else {
            return;
        };
        let next = if forward {
            self.window.next_page(len)
        } else {
            self.window.previous_page()
        };
        match next {
            Some(window) => {
                self.window = window;
                self.selected_card = None;
                let title = self.content.projects.repositories.title.clone();
                self.jump_to(&title);
            }
            None => {
                self.status_message = if forward {
                    "Already showing the last repositories.".into()
                } else {
                    "Already showing the first repositories.".into()
                };
            }
        }
    }

    fn select_card(&mut self, delta: isize) {
        if self.cards.is_empty() {
            return;
        }
        let last = self.cards.len() - 1;
        let next = match self.selected_card {
            None if delta >= 0 => 0,
            None => last,
            Some(current) => current.saturating_add_signed(delta).min(last),
        };
        self.selected_card = Some(next);
        if let Some(&line) = self.card_lines.get(next) {
            if line < self.scroll || line + 4 > self.scroll + self.page_height {
                self.scroll = line.saturating_sub(toc::SCROLL_OFFSET).min(self.max_scroll());
            }
        }
    }

    fn open_selected(&mut self, demo: bool) {
        if self.selected_card.is_none() {
            self.select_card(1);
        }
        let Some(card) = self.selected_card.and_then(|idx| self.cards.get(idx)) else {
            self.status_message = "No repository selected.".into();
            return;
        };
        let (label, url) = if demo {
            match card.demo_url() {
                Some(url) => ("live demo", url.to_string()),
                None => {
                    self.status_message = format!("{} has no live demo.", card.name);
                    return;
                }
            }
        } else {
            ("code", card.code_url().to_string())
        };
        let name = card.name.clone();
        match webbrowser::open(&url) {
            Ok(_) => {
                self.status_message = format!("Opened {name} {label} in your browser.");
            }
            Err(err) => {
                warn!(url = %url, error = %err, "failed to open browser");
                self.status_message = format!("Failed to open {name} {label}: {err} (URL: {url})");
            }
        }
    }

    fn move_toc(&mut self, delta: isize) {
        if self.toc_entries.is_empty() {
            return;
        }
        let last = self.toc_entries.len() - 1;
        self.toc_selected = self.toc_selected.saturating_add_signed(delta).min(last);
    }

    fn jump_to(&mut self, id: &str) {
        if let Some(target) = toc::scroll_target(&self.anchors, id) {
            self.scroll = target.min(self.max_scroll());
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta).min(self.max_scroll());
    }

    fn max_scroll(&self) -> usize {
        self.page_len.saturating_sub(self.page_height.max(1))
    }

    /// Lays the page out for `width` and caches the anchors and card
    /// positions the key handlers navigate by.
    fn layout(&mut self, width: u16, height: u16) -> Vec<Line<'static>> {
        let view = RepoView {
            state: self.loader.state(),
            identity: self.loader.identity(),
            window: self.window,
            selected_card: self.selected_card,
            spinner: self.spinner.frame(),
        };
        let built = page::build(&self.content, &view, width);
        self.anchors = built.anchors;
        self.cards = built.cards;
        self.card_lines = built.card_lines;
        self.page_len = built.lines.len();
        self.page_height = usize::from(height);
        if self.selected_card.is_some_and(|idx| idx >= self.cards.len()) {
            self.selected_card = None;
        }
        self.scroll = self.scroll.min(self.max_scroll());
        built.lines
    }

    /// Whether the contents pane is on screen, judged by the last drawn width.
    fn contents_shown(&self) -> bool {
        self.toc_visible
            && self
                .terminal_width
                .map_or(true, |width| width >= TOC_MIN_TERMINAL_WIDTH)
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        self.terminal_width = Some(full.width);
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.loader.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        let status_color = if matches!(self.loader.state(), FetchState::Error(_)) {
            COLOR_ERROR
        } else {
            COLOR_TEXT_PRIMARY
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(status_color)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        if self.contents_shown() {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(TOC_WIDTH), Constraint::Min(0)])
                .split(layout[1]);
            self.draw_contents(frame, chunks[0]);
            self.draw_page(frame, chunks[1]);
        } else {
            self.focused_pane = Pane::Page;
            self.draw_page(frame, layout[1]);
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);
    }

    fn pane_block(&self, pane: Pane) -> Block<'static> {
        let focused = self.focused_pane == pane;
        let border_style = if focused {
            Style::default().fg(COLOR_BORDER_FOCUSED)
        } else {
            Style::default().fg(COLOR_BORDER_IDLE)
        };
        let title_style = if focused {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        Block::default()
            .title(Span::styled(pane.title(), title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1))
    }

    fn draw_contents(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Contents);
        let focused = self.focused_pane == Pane::Contents;
        let items: Vec<ListItem> = self
            .toc_entries
            .iter()
            .map(|entry| {
                let (prefix, style) = if entry.depth == 0 {
                    ("── ", Style::default().fg(COLOR_TEXT_PRIMARY))
                } else {
                    ("   ─ ", Style::default().fg(COLOR_TEXT_SECONDARY))
                };
                ListItem::new(Line::from(Span::styled(format!("{prefix}{}", entry.id), style)))
            })
            .collect();
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .fg(if focused { COLOR_ACCENT } else { COLOR_TEXT_PRIMARY })
                .bg(COLOR_PANEL_SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default();
        state.select(Some(self.toc_selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_page(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Page);
        let inner = block.inner(area);
        let lines = self.layout(inner.width, inner.height);
        let scroll = u16::try_from(self.scroll).unwrap_or(u16::MAX);
        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .scroll((scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn footer_text(&self) -> String {
        if let Some(input) = &self.identity_input {
            return format!("GitHub username: {input}▏");
        }

        let mut parts: Vec<&str> = Vec::new();
        match self.focused_pane {
            Pane::Contents => {
                parts.push("j/k select section");
                parts.push("Enter jump");
            }
            Pane::Page => {
                parts.push("j/k scroll");
                parts.push("[/] select repo");
                parts.push("o code · d demo");
            }
        }
        if self.ready_len().is_some() {
            parts.push("n/p page");
        }
        if matches!(self.loader.state(), FetchState::Error(_)) {
            parts.push("r retry");
        }
        parts.push("u user");
        if self.contents_shown() {
            parts.push("Tab switch pane");
        }
        parts.push("q quit");
        parts.join(" · ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_repo, StaticRepositoryService};
    use ratatui::backend::TestBackend;

    fn model_with(identity: &str, count: u64) -> Model {
        model_with_content(Content::builtin().unwrap(), identity, count)
    }

    fn model_with_content(content: Content, identity: &str, count: u64) -> Model {
        let service = StaticRepositoryService::new()
            .with_listing("octocat", (1..=count).map(|id| sample_repo(id, id as u32, false)).collect())
            .with_listing("hubot", vec![sample_repo(99, 1, false)]);
        let mut model = Model::new(Options {
            content,
            service: Arc::new(service),
            identity: identity.to_string(),
            window: DisplayWindow::default(),
        });
        model.loader.wait(Duration::from_secs(5));
        model.refresh_status();
        model
    }

    #[test]
    fn pages_through_windows() {
        let mut model = model_with("octocat", 9);
        model.layout(80, 20);
        assert_eq!(model.cards.len(), 6);

        model.handle_key(KeyCode::Char('n')).unwrap();
        assert_eq!(model.window, DisplayWindow::new(7, 12).unwrap());
        model.layout(80, 20);
        assert_eq!(model.cards.len(), 3);

        model.handle_key(KeyCode::Char('n')).unwrap();
        assert_eq!(model.window, DisplayWindow::new(7, 12).unwrap());
        model.handle_key(KeyCode::Char('p')).unwrap();
        assert_eq!(model.window, DisplayWindow::default());
    }

    #[test]
    fn selecting_cards_stays_in_range() {
        let mut model = model_with("octocat", 2);
        model.layout(80, 20);
        model.handle_key(KeyCode::Char(']')).unwrap();
        model.handle_key(KeyCode::Char(']')).unwrap();
        model.handle_key(KeyCode::Char(']')).unwrap();
        assert_eq!(model.selected_card, Some(1));
        model.handle_key(KeyCode::Char('[')).unwrap();
        assert_eq!(model.selected_card, Some(0));
    }

    #[test]
    fn editing_identity_refetches() {
        let mut model = model_with("octocat", 3);
        for code in [KeyCode::Char('u')]
            .into_iter()
            .chain(std::iter::repeat(KeyCode::Backspace).take(10))
            .chain("hubot".chars().map(KeyCode::Char))
            .chain([KeyCode::Enter])
        {
            assert!(!model.handle_key(code).unwrap());
        }
        assert_eq!(model.loader.identity(), Some("hubot"));
        assert!(model.loader.wait(Duration::from_secs(5)));
        match model.loader.state() {
            FetchState::Ready(items) => assert_eq!(items[0].id, 99),
            other => panic!("expected ready state, got {other:?}"),
        }
    }

    #[test]
    fn escape_cancels_identity_edit() {
        let mut model = model_with("octocat", 3);
        model.handle_key(KeyCode::Char('u')).unwrap();
        model.handle_key(KeyCode::Char('x')).unwrap();
        assert!(!model.handle_key(KeyCode::Esc).unwrap());
        assert!(model.identity_input.is_none());
        assert_eq!(model.loader.identity(), Some("octocat"));
        assert!(model.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn contents_jump_scrolls_to_section() {
        let mut model = model_with("octocat", 9);
        model.layout(80, 10);
        model.handle_key(KeyCode::Tab).unwrap();
        assert_eq!(model.focused_pane, Pane::Contents);
        let target = model
            .toc_entries
            .iter()
            .position(|entry| entry.id == "GitHub Repositories")
            .unwrap();
        for _ in 0..target {
            model.handle_key(KeyCode::Char('j')).unwrap();
        }
        model.handle_key(KeyCode::Enter).unwrap();
        let anchor = model
            .anchors
            .iter()
            .find(|anchor| anchor.id == "GitHub Repositories")
            .unwrap()
            .line;
        assert_eq!(model.scroll, anchor - toc::SCROLL_OFFSET);
    }

    #[test]
    fn renders_error_state() {
        let mut model = model_with("ghost", 0);
        let backend = TestBackend::new(100, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let rendered: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(rendered.contains("Failed to load @ghost"));
        assert!(model.handle_key(KeyCode::Char('r')).is_ok());
        assert!(model.loader.is_loading());
    }

    fn render(model: &mut Model, width: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, 40)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn contents_pane_needs_eighty_columns() {
        let mut model = model_with("octocat", 3);
        assert!(render(&mut model, 100).contains("Contents"));
        model.handle_key(KeyCode::Tab).unwrap();
        assert_eq!(model.focused_pane, Pane::Contents);

        let narrow = render(&mut model, 79);
        assert!(!narrow.contains("Contents"));
        assert_eq!(model.focused_pane, Pane::Page);
        model.handle_key(KeyCode::Tab).unwrap();
        assert_eq!(model.focused_pane, Pane::Page);

        assert!(render(&mut model, 80).contains("Contents"));
    }

    #[test]
    fn contents_pane_hidden_when_disabled() {
        let mut content = Content::builtin().unwrap();
        content.projects.table_of_contents.display = false;
        let mut model = model_with_content(content, "octocat", 3);
        assert!(!render(&mut model, 100).contains("Contents"));
        model.handle_key(KeyCode::Tab).unwrap();
        assert_eq!(model.focused_pane, Pane::Page);
    }
}
