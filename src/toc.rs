use crate::content::ProjectsPage;

/// Lines kept visible above a section heading after jumping to it.
pub const SCROLL_OFFSET: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub display: bool,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub depth: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub id: String,
    pub line: usize,
}

/// Section structure of the projects page, in page order.
pub fn structure(page: &ProjectsPage) -> Vec<Section> {
    vec![
        Section {
            title: page.intro.title.clone(),
            display: page.intro.display,
            items: Vec::new(),
        },
        Section {
            title: page.featured.title.clone(),
            display: page.featured.display,
            items: page.featured.items.iter().map(|item| item.title.clone()).collect(),
        },
        Section {
            title: page.categories.title.clone(),
            display: page.categories.display,
            items: page.categories.groups.iter().map(|group| group.name.clone()).collect(),
        },
        Section {
            title: page.repositories.title.clone(),
            display: page.repositories.display,
            items: Vec::new(),
        },
    ]
}

/// Flattens displayed sections into navigable entries, each section followed
/// by its sub-items.
pub fn entries(sections: &[Section]) -> Vec<Entry> {
    sections
        .iter()
        .filter(|section| section.display)
        .flat_map(|section| {
            std::iter::once(Entry {
                id: section.title.clone(),
                depth: 0,
            })
            .chain(section.items.iter().map(|item| Entry {
                id: item.clone(),
                depth: 1,
            }))
        })
        .collect()
}

/// Scroll position that brings `id` into view, or `None` for an unknown id.
pub fn scroll_target(anchors: &[Anchor], id: &str) -> Option<usize> {
    anchors
        .iter()
        .find(|anchor| anchor.id == id)
        .map(|anchor| anchor.line.saturating_sub(SCROLL_OFFSET))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;

    fn section(title: &str, display: bool, items: &[&str]) -> Section {
        Section {
            title: title.into(),
            display,
            items: items.iter().map(|item| item.to_string()).collect(),
        }
    }

    #[test]
    fn hidden_sections_are_skipped() {
        let sections = vec![
            section("Overview", true, &[]),
            section("Featured", false, &["A"]),
            section("Projects", true, &["Web", "Tools"]),
        ];
        let ids: Vec<(String, u8)> = entries(&sections).into_iter().map(|e| (e.id, e.depth)).collect();
        assert_eq!(
            ids,
            vec![
                ("Overview".to_string(), 0),
                ("Projects".to_string(), 0),
                ("Web".to_string(), 1),
                ("Tools".to_string(), 1),
            ]
        );
    }

    #[test]
    fn structure_follows_page_order() {
        let content = Content::builtin().unwrap();
        let titles: Vec<String> = structure(&content.projects).into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Overview", "Featured Projects", "Projects", "GitHub Repositories"]);
    }

    #[test]
    fn scroll_target_keeps_offset_above_heading() {
        let anchors = vec![
            Anchor { id: "Overview".into(), line: 0 },
            Anchor { id: "Projects".into(), line: 14 },
        ];
        assert_eq!(scroll_target(&anchors, "Overview"), Some(0));
        assert_eq!(scroll_target(&anchors, "Projects"), Some(13));
        assert_eq!(scroll_target(&anchors, "Missing"), None);
    }
}
