use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::github::RepositoryItem;

pub const MAX_TOPICS: usize = 5;
pub const DEFAULT_LANGUAGE_COLOR: &str = "#8b949e";
pub const EMPTY_MESSAGE: &str = "No projects found";

static LANGUAGE_COLORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("JavaScript", "#f1e05a"),
        ("TypeScript", "#3178c6"),
        ("Python", "#3572A5"),
        ("Java", "#b07219"),
        ("Go", "#00ADD8"),
        ("Rust", "#dea584"),
        ("Ruby", "#701516"),
        ("PHP", "#4F5D95"),
        ("Swift", "#ffac45"),
        ("Kotlin", "#A97BFF"),
        ("Dart", "#00B4AB"),
        ("C", "#555555"),
        ("C++", "#f34b7d"),
        ("C#", "#178600"),
        ("HTML", "#e34c26"),
        ("CSS", "#563d7c"),
        ("Vue", "#41b883"),
        ("React", "#61dafb"),
    ])
});

/// Hex colour for a language label, or the neutral default when the label is
/// not in the table.
pub fn language_color(language: &str) -> &'static str {
    LANGUAGE_COLORS
        .get(language)
        .copied()
        .unwrap_or(DEFAULT_LANGUAGE_COLOR)
}

/// Parses `#rrggbb` into its channels.
pub fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window start {start} is after end {end}")]
    Inverted { start: usize, end: usize },
    #[error("window {0:?} is not of the form START:END")]
    Malformed(String),
}

/// 1-based inclusive range over the ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayWindow {
    start: usize,
    end: usize,
}

impl Default for DisplayWindow {
    fn default() -> Self {
        Self { start: 1, end: 6 }
    }
}

impl DisplayWindow {
    pub fn new(start: usize, end: usize) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }

    /// Effective 1-based bounds after clipping to `len`, or `None` when
    /// nothing falls inside.
    pub fn clip(&self, len: usize) -> Option<(usize, usize)> {
        let start = self.start.max(1);
        let end = self.end.min(len);
        (start <= end).then_some((start, end))
    }

    pub fn select<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.clip(items.len()) {
            Some((start, end)) => &items[start - 1..end],
            None => &[],
        }
    }

    pub fn next_page(&self, len: usize) -> Option<Self> {
        let start = self.end.checked_add(1)?;
        if start > len {
            return None;
        }
        Some(Self {
            start,
            end: start + self.width() - 1,
        })
    }

    pub fn previous_page(&self) -> Option<Self> {
        if self.start <= 1 {
            return None;
        }
        let start = self.start.saturating_sub(self.width()).max(1);
        Some(Self {
            start,
            end: start + self.width() - 1,
        })
    }
}

impl fmt::Display for DisplayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for DisplayWindow {
    type Err = WindowError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || WindowError::Malformed(raw.to_string());
        let (start, end) = raw
            .trim()
            .split_once(|c: char| c == ':' || c == '-')
            .ok_or_else(malformed)?;
        let start = start.trim().parse().map_err(|_| malformed())?;
        let end = end.trim().parse().map_err(|_| malformed())?;
        Self::new(start, end)
    }
}

impl TryFrom<String> for DisplayWindow {
    type Error = WindowError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<DisplayWindow> for String {
    fn from(window: DisplayWindow) -> Self {
        window.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageLabel {
    pub name: String,
    pub color: &'static str,
}

/// Everything a repository card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCard {
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub homepage_url: Option<String>,
    pub language: Option<LanguageLabel>,
    pub stars: u32,
    pub forks: u32,
    pub topics: Vec<String>,
}

impl RepoCard {
    pub fn from_item(item: &RepositoryItem) -> Self {
        RepoCard {
            name: item.name.clone(),
            description: non_empty(item.description.as_deref()),
            url: item.html_url.clone(),
            homepage_url: non_empty(item.homepage.as_deref()),
            language: non_empty(item.language.as_deref()).map(|name| LanguageLabel {
                color: language_color(&name),
                name,
            }),
            stars: item.stargazers_count,
            forks: item.forks_count,
            topics: item.topics.iter().take(MAX_TOPICS).cloned().collect(),
        }
    }

    pub fn code_url(&self) -> &str {
        &self.url
    }

    pub fn demo_url(&self) -> Option<&str> {
        self.homepage_url.as_deref()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn present(ranked: &[RepositoryItem], window: DisplayWindow) -> Vec<RepoCard> {
    window.select(ranked).iter().map(RepoCard::from_item).collect()
}

/// Plain-text rendering of a card list for non-interactive output.
pub fn plain_text(cards: &[RepoCard], width: usize) -> String {
    if cards.is_empty() {
        return format!("{EMPTY_MESSAGE}\n");
    }

    let width = width.max(20);
    let mut out = String::new();
    for card in cards {
        out.push_str(&format!("{}  ⭐ {}  🔀 {}\n", card.name, card.stars, card.forks));
        if let Some(language) = &card.language {
            out.push_str(&format!("  {} ({})\n", language.name, language.color));
        }
        if let Some(description) = &card.description {
            for line in textwrap::wrap(description, textwrap::Options::new(width).initial_indent("  ").subsequent_indent("  ")) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        if !card.topics.is_empty() {
            out.push_str(&format!("  #{}\n", card.topics.join(" #")));
        }
        out.push_str(&format!("  View Code: {}\n", card.url));
        if let Some(demo) = card.demo_url() {
            out.push_str(&format!("  Live Demo: {demo}\n"));
        }
        out.push('\n');
    }
    out
}
