use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::UnicodeWidthStr;

use crate::content::{Content, FeaturedProject};
use crate::loader::FetchState;
use crate::present::{self, hex_rgb, DisplayWindow, RepoCard, EMPTY_MESSAGE};
use crate::toc::Anchor;

pub const COLOR_BG: Color = Color::Rgb(30, 30, 46);
pub const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
pub const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
pub const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
pub const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
pub const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
pub const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
pub const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
pub const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
pub const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const INDENT: &str = "  ";

/// State of the repositories section at render time.
pub struct RepoView<'a> {
    pub state: &'a FetchState,
    pub identity: Option<&'a str>,
    pub window: DisplayWindow,
    pub selected_card: Option<usize>,
    pub spinner: &'a str,
}

/// The projects page laid out for one width.
#[derive(Default)]
pub struct Page {
    pub lines: Vec<Line<'static>>,
    pub anchors: Vec<Anchor>,
    pub cards: Vec<RepoCard>,
    /// First line of each card, parallel to `cards`.
    pub card_lines: Vec<usize>,
}

impl Page {
    fn anchor(&mut self, id: &str) {
        self.anchors.push(Anchor {
            id: id.to_string(),
            line: self.lines.len(),
        });
    }

    fn push(&mut self, line: Line<'static>) {
        self.lines.push(line);
    }

    fn blank(&mut self) {
        self.lines.push(Line::default());
    }

    fn text(&mut self, text: &str, width: usize, indent: &str, style: Style) {
        self.lines.extend(wrap_styled(text, width, indent, style));
    }
}

pub fn build(content: &Content, repos: &RepoView<'_>, width: u16) -> Page {
    let width = usize::from(width).max(20);
    let projects = &content.projects;
    let mut page = Page::default();

    let heading = Style::default()
        .fg(COLOR_TEXT_PRIMARY)
        .add_modifier(Modifier::BOLD);
    let body = Style::default().fg(COLOR_TEXT_PRIMARY);
    let muted = Style::default().fg(COLOR_TEXT_SECONDARY);
    let accent = Style::default().fg(COLOR_ACCENT);

    page.anchor(&projects.intro.title);
    page.text(&projects.title, width, "", heading.add_modifier(Modifier::UNDERLINED));
    if !projects.subtitle.is_empty() {
        page.text(&projects.subtitle, width, "", muted);
    }
    let byline = [content.profile.name.as_str(), content.profile.role.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" · ");
    if !byline.is_empty() {
        page.text(&byline, width, "", accent);
    }
    page.blank();
    if projects.intro.display && !projects.intro.description.is_empty() {
        page.text(&projects.intro.description, width, "", body);
        page.blank();
    }

    if projects.featured.display {
        page.anchor(&projects.featured.title);
        page.text(&projects.featured.title, width, "", heading);
        page.blank();
        for project in &projects.featured.items {
            featured_project(&mut page, project, width);
        }
    }

    if projects.categories.display {
        page.anchor(&projects.categories.title);
        page.text(&projects.categories.title, width, "", heading);
        page.blank();
        for group in &projects.categories.groups {
            page.anchor(&group.name);
            page.text(&group.name, width, "", body.add_modifier(Modifier::BOLD));
            if !group.description.is_empty() {
                page.text(&group.description, width, "", muted);
            }
            for project in &group.projects {
                let line = match &project.description {
                    Some(description) => format!("{} — {}", project.name, description),
                    None => project.name.clone(),
                };
                page.lines.extend(wrap_hanging(&line, width, "  • ", "    ", body));
            }
            page.blank();
        }
    }

    if projects.repositories.display {
        repositories(&mut page, &projects.repositories.title, repos, width);
    }

    page
}

fn featured_project(page: &mut Page, project: &FeaturedProject, width: usize) {
    page.anchor(&project.title);
    let title_style = Style::default()
        .fg(COLOR_TEXT_PRIMARY)
        .add_modifier(Modifier::BOLD);
    match &project.year {
        Some(year) => {
            let used = project.title.width() + year.width();
            let gap = width.saturating_sub(used).max(1);
            page.push(Line::from(vec![
                Span::styled(project.title.clone(), title_style),
                Span::raw(" ".repeat(gap)),
                Span::styled(year.clone(), Style::default().fg(COLOR_TEXT_SECONDARY)),
            ]));
        }
        None => page.text(&project.title, width, "", title_style),
    }
    if let Some(role) = &project.role {
        page.text(role, width, "", Style::default().fg(COLOR_ACCENT));
    }
    page.text(&project.description, width, INDENT, Style::default().fg(COLOR_TEXT_PRIMARY));
    if !project.technologies.is_empty() {
        let tags = project
            .technologies
            .iter()
            .map(|tech| format!("[{}]", tech.name))
            .collect::<Vec<_>>()
            .join(" ");
        page.text(&tags, width, INDENT, Style::default().fg(COLOR_TEXT_SECONDARY));
    }
    for link in &project.links {
        page.text(
            &format!("{}: {}", link.label, link.url),
            width,
            INDENT,
            Style::default().fg(COLOR_ACCENT),
        );
    }
    page.blank();
}

fn repositories(page: &mut Page, title: &str, repos: &RepoView<'_>, width: usize) {
    let heading = Style::default()
        .fg(COLOR_TEXT_PRIMARY)
        .add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(COLOR_TEXT_SECONDARY);

    page.anchor(title);
    page.text(title, width, "", heading);
    if let Some(identity) = repos.identity.filter(|identity| !identity.is_empty()) {
        let mut subline = format!("@{identity}");
        if let FetchState::Ready(items) = repos.state {
            if let Some((start, end)) = repos.window.clip(items.len()) {
                subline.push_str(&format!(" · showing {start}–{end} of {}", items.len()));
            }
        }
        page.text(&subline, width, "", muted);
    }
    page.blank();

    match repos.state {
        FetchState::Loading => {
            page.text(
                &format!("{} Loading projects...", repos.spinner).trim().to_string(),
                width,
                INDENT,
                muted,
            );
        }
        FetchState::Error(message) => {
            page.text(
                &format!("Error loading projects: {message}"),
                width,
                INDENT,
                Style::default().fg(COLOR_ERROR),
            );
            page.text("Press r to retry.", width, INDENT, muted);
        }
        FetchState::Ready(items) => {
            let cards = present::present(items, repos.window);
            if cards.is_empty() {
                page.text(EMPTY_MESSAGE, width, INDENT, muted);
            }
            for (idx, card) in cards.iter().enumerate() {
                page.card_lines.push(page.lines.len());
                repo_card(page, card, repos.selected_card == Some(idx), width);
            }
            page.cards = cards;
        }
    }
    page.blank();
}

fn repo_card(page: &mut Page, card: &RepoCard, selected: bool, width: usize) {
    let background = if selected {
        COLOR_PANEL_SELECTED_BG
    } else {
        COLOR_PANEL_BG
    };
    let base = Style::default().bg(background);
    let marker = if selected { "▌ " } else { "  " };
    let inner = width.saturating_sub(marker.width()).max(10);

    let mut header = vec![
        Span::styled(marker, base.fg(COLOR_ACCENT)),
        Span::styled(
            card.name.clone(),
            base.fg(if selected { COLOR_ACCENT } else { COLOR_TEXT_PRIMARY })
                .add_modifier(Modifier::BOLD),
        ),
    ];
    let counts = format!("⭐ {}  🔀 {}", card.stars, card.forks);
    let gap = inner
        .saturating_sub(card.name.width() + counts.width())
        .max(2);
    header.push(Span::styled(" ".repeat(gap), base));
    header.push(Span::styled(counts, base.fg(COLOR_TEXT_SECONDARY)));
    page.push(Line::from(header));

    if let Some(language) = &card.language {
        let dot = match hex_rgb(language.color) {
            Some((r, g, b)) => Color::Rgb(r, g, b),
            None => COLOR_TEXT_SECONDARY,
        };
        page.push(Line::from(vec![
            Span::styled(marker, base.fg(COLOR_ACCENT)),
            Span::styled("● ", base.fg(dot)),
            Span::styled(language.name.clone(), base.fg(COLOR_TEXT_SECONDARY)),
        ]));
    }

    if let Some(description) = &card.description {
        for line in wrap(description, WrapOptions::new(inner)) {
            page.push(Line::from(vec![
                Span::styled(marker, base.fg(COLOR_ACCENT)),
                Span::styled(line.into_owned(), base.fg(COLOR_TEXT_PRIMARY)),
            ]));
        }
    }

    if !card.topics.is_empty() {
        let topics = card
            .topics
            .iter()
            .map(|topic| format!("#{topic}"))
            .collect::<Vec<_>>()
            .join(" ");
        for line in wrap(&topics, WrapOptions::new(inner)) {
            page.push(Line::from(vec![
                Span::styled(marker, base.fg(COLOR_ACCENT)),
                Span::styled(line.into_owned(), base.fg(COLOR_ACCENT)),
            ]));
        }
    }

    let mut actions = vec![
        Span::styled(marker, base.fg(COLOR_ACCENT)),
        Span::styled("[o] View Code", base.fg(COLOR_TEXT_PRIMARY)),
    ];
    if card.demo_url().is_some() {
        actions.push(Span::styled("  [d] Live Demo", base.fg(COLOR_TEXT_PRIMARY)));
    }
    page.push(Line::from(actions));
    page.blank();
}

fn wrap_styled(text: &str, width: usize, indent: &str, style: Style) -> Vec<Line<'static>> {
    wrap_hanging(text, width, indent, indent, style)
}

fn wrap_hanging(text: &str, width: usize, first: &str, rest: &str, style: Style) -> Vec<Line<'static>> {
    let options = WrapOptions::new(width.max(first.width().max(rest.width()) + 1))
        .initial_indent(first)
        .subsequent_indent(rest);
    wrap(text, options)
        .into_iter()
        .map(|line| Line::from(Span::styled(line.into_owned(), style)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{filter_and_rank, sample_repo};

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn texts(page: &Page) -> Vec<String> {
        page.lines.iter().map(plain).collect()
    }

    fn view(state: &FetchState) -> RepoView<'_> {
        RepoView {
            state,
            identity: Some("octocat"),
            window: DisplayWindow::default(),
            selected_card: None,
            spinner: "⠋",
        }
    }

    #[test]
    fn anchors_point_at_section_headings() {
        let content = Content::builtin().unwrap();
        let state = FetchState::Loading;
        let page = build(&content, &view(&state), 80);
        let lines = texts(&page);
        for anchor in &page.anchors {
            if anchor.id == content.projects.intro.title {
                assert_eq!(anchor.line, 0);
                continue;
            }
            assert!(
                lines[anchor.line].contains(&anchor.id),
                "anchor {} points at {:?}",
                anchor.id,
                lines[anchor.line]
            );
        }
        assert!(page.anchors.iter().any(|a| a.id == "GitHub Repositories"));
    }

    #[test]
    fn loading_state_shows_spinner_line() {
        let content = Content::builtin().unwrap();
        let state = FetchState::Loading;
        let lines = texts(&build(&content, &view(&state), 80));
        assert!(lines.iter().any(|line| line.contains("⠋ Loading projects...")));
    }

    #[test]
    fn error_state_shows_message() {
        let content = Content::builtin().unwrap();
        let state = FetchState::Error("Failed to fetch repositories (HTTP 404)".into());
        let lines = texts(&build(&content, &view(&state), 80));
        assert!(lines
            .iter()
            .any(|line| line.contains("Error loading projects: Failed to fetch repositories (HTTP 404)")));
    }

    #[test]
    fn empty_selection_shows_indicator() {
        let content = Content::builtin().unwrap();
        let state = FetchState::Ready(Vec::new());
        let page = build(&content, &view(&state), 80);
        assert!(page.cards.is_empty());
        assert!(texts(&page).iter().any(|line| line.contains(EMPTY_MESSAGE)));
    }

    #[test]
    fn ready_state_renders_windowed_cards() {
        let content = Content::builtin().unwrap();
        let items = filter_and_rank((1..=9u64).map(|id| sample_repo(id, id as u32, false)).collect());
        let state = FetchState::Ready(items);
        let page = build(&content, &view(&state), 80);
        assert_eq!(page.cards.len(), 6);
        assert_eq!(page.card_lines.len(), 6);
        let lines = texts(&page);
        assert!(lines.iter().any(|line| line.contains("showing 1–6 of 9")));
        assert!(lines[page.card_lines[0]].contains("repo-9"));
        assert!(!lines.iter().any(|line| line.contains("Live Demo")));
    }

    #[test]
    fn hidden_sections_are_not_rendered() {
        let mut content = Content::builtin().unwrap();
        content.projects.featured.display = false;
        let state = FetchState::Loading;
        let page = build(&content, &view(&state), 80);
        assert!(!page.anchors.iter().any(|a| a.id == "Featured Projects"));
        assert!(!texts(&page).iter().any(|line| line.contains("Ledgerline")));
    }
}
