//! Selection of publications used as LLM context.

use crate::error::Error;
use crate::models::{Publication, PublicationSet};
use serde::{Deserialize, Serialize};

/// An ordered, user-chosen list of publication titles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSelection {
    titles: Vec<String>,
}

impl ContextSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select only the primary publication of a set
    pub fn primary_only(set: &PublicationSet) -> Self {
        Self {
            titles: vec![set.primary_title().to_string()],
        }
    }

    /// Select a title; selecting the same title twice is a no-op
    pub fn select(&mut self, title: impl Into<String>) -> &mut Self {
        let title = title.into();
        if !self.titles.contains(&title) {
            self.titles.push(title);
        }
        self
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Render the selected publications into text snippets, one per title
    pub fn snippets(&self, set: &PublicationSet) -> Result<Vec<String>, Error> {
        self.titles
            .iter()
            .map(|title| {
                set.get(title)
                    .map(render_snippet)
                    .ok_or_else(|| Error::UnknownPublication(title.clone()))
            })
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ContextSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut selection = Self::new();
        for title in iter {
            selection.select(title);
        }
        selection
    }
}

/// Title followed by every abstract section that has text
fn render_snippet(publication: &Publication) -> String {
    let mut parts = vec![publication.title.clone()];
    parts.extend(
        publication
            .abstract_sections
            .with_text()
            .map(|(name, text)| format!("{}: {}", name, text.trim())),
    );
    parts.join("\n\n")
}
