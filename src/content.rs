use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const BUILTIN_CONTENT: &str = include_str!("../content/default.yaml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub profile: Profile,
    pub projects: ProjectsPage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Profile {
    /// GitHub handle from the profile, accepting a bare handle or a profile URL.
    pub fn github_handle(&self) -> Option<String> {
        let raw = self.github.as_deref()?.trim();
        let handle = raw
            .strip_prefix("https://github.com/")
            .or_else(|| raw.strip_prefix("http://github.com/"))
            .or_else(|| raw.strip_prefix('@'))
            .unwrap_or(raw)
            .trim_end_matches('/');
        (!handle.is_empty()).then(|| handle.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectsPage {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub table_of_contents: TocSettings,
    pub intro: Intro,
    #[serde(default)]
    pub featured: Featured,
    #[serde(default)]
    pub categories: Categories,
    #[serde(default)]
    pub repositories: RepositoriesSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TocSettings {
    #[serde(default = "default_display")]
    pub display: bool,
}

impl Default for TocSettings {
    fn default() -> Self {
        Self { display: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intro {
    pub title: String,
    #[serde(default = "default_display")]
    pub display: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Featured {
    pub title: String,
    #[serde(default = "default_display")]
    pub display: bool,
    #[serde(default)]
    pub items: Vec<FeaturedProject>,
}

impl Default for Featured {
    fn default() -> Self {
        Self {
            title: "Featured Projects".into(),
            display: false,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeaturedProject {
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<Technology>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Technology {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Categories {
    pub title: String,
    #[serde(default = "default_display")]
    pub display: bool,
    #[serde(default)]
    pub groups: Vec<CategoryGroup>,
}

impl Default for Categories {
    fn default() -> Self {
        Self {
            title: "Projects".into(),
            display: false,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub projects: Vec<CategoryProject>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoriesSection {
    pub title: String,
    #[serde(default = "default_display")]
    pub display: bool,
}

impl Default for RepositoriesSection {
    fn default() -> Self {
        Self {
            title: "GitHub Repositories".into(),
            display: true,
        }
    }
}

fn default_display() -> bool {
    true
}

impl Content {
    pub fn builtin() -> Result<Self> {
        parse(BUILTIN_CONTENT).context("content: parse built-in content")
    }
}

/// Loads the content document at `path`, or the built-in one when no path is
/// configured.
pub fn load(path: Option<&Path>) -> Result<Content> {
    let Some(path) = path else {
        return Content::builtin();
    };
    let data = fs::read_to_string(path)
        .with_context(|| format!("content: failed to read {}", path.display()))?;
    parse(&data).with_context(|| format!("content: failed to parse {}", path.display()))
}

fn parse(data: &str) -> Result<Content> {
    let content: Content = serde_yaml::from_str(data)?;
    Ok(content)
}
