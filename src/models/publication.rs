//! Normalized publication records shared by every metadata source.

use crate::error::Error;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Abstract text split into named sections, in upstream order.
///
/// PDBe reports structured abstracts (`background`, `methods`, ..., `unassigned`)
/// where most sections are usually `null`; RCSB reports a single `abstract`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbstractSections(Vec<(String, Option<String>)>);

impl AbstractSections {
    /// Create an empty section map
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a section, replacing the text of an existing section with the same name
    pub fn insert(&mut self, name: impl Into<String>, text: Option<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = text,
            None => self.0.push((name, text)),
        }
    }

    /// Text of a section, if the section exists and has text
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .and_then(|(_, text)| text.as_deref())
    }

    /// Whether a section with this name exists (even without text)
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(existing, _)| existing == name)
    }

    /// All sections, including those without text
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_deref()))
    }

    /// Sections that carry non-blank text
    pub fn with_text(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|(name, text)| {
            text.as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(|t| (name.as_str(), t))
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Option<String>)> for AbstractSections {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        let mut sections = Self::new();
        for (name, text) in iter {
            sections.insert(name, text);
        }
        sections
    }
}

impl Serialize for AbstractSections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, text) in &self.0 {
            map.serialize_entry(name, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AbstractSections {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SectionsVisitor;

        impl<'de> Visitor<'de> for SectionsVisitor {
            type Value = AbstractSections;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of abstract section names to text or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut sections = AbstractSections::new();
                while let Some((name, text)) = access.next_entry::<String, Option<String>>()? {
                    sections.insert(name, text);
                }
                Ok(sections)
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(AbstractSections::new())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(AbstractSections::new())
            }
        }

        deserializer.deserialize_any(SectionsVisitor)
    }
}

/// A single publication attached to a PDB entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    /// Publication title (unique within a [`PublicationSet`])
    pub title: String,

    /// Digital Object Identifier; `None` for work that is not yet published
    pub doi: Option<String>,

    /// Abstract sections in upstream order
    #[serde(rename = "abstract", default)]
    pub abstract_sections: AbstractSections,

    /// Whether this is the entry's primary citation
    #[serde(rename = "primary")]
    pub is_primary: bool,
}

impl Publication {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            doi: None,
            abstract_sections: AbstractSections::new(),
            is_primary: false,
        }
    }

    pub fn doi(mut self, doi: Option<String>) -> Self {
        self.doi = doi.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn abstract_sections(mut self, sections: AbstractSections) -> Self {
        self.abstract_sections = sections;
        self
    }

    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Resolver link for the DOI
    pub fn doi_url(&self) -> Option<String> {
        self.doi.as_ref().map(|doi| format!("https://doi.org/{}", doi))
    }
}

/// The publications of one PDB entry, keyed by title, with a designated primary.
///
/// Insertion order is preserved. Inserting a title that is already present
/// replaces the earlier record in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationSet {
    primary_title: String,
    publications: Vec<Publication>,
}

impl PublicationSet {
    /// Create an empty set that designates `primary_title` as primary
    pub fn new(primary_title: impl Into<String>) -> Self {
        Self {
            primary_title: primary_title.into(),
            publications: Vec::new(),
        }
    }

    /// Insert a publication, returning the record it replaced (if any)
    pub fn insert(&mut self, publication: Publication) -> Option<Publication> {
        match self
            .publications
            .iter_mut()
            .find(|p| p.title == publication.title)
        {
            Some(existing) => Some(std::mem::replace(existing, publication)),
            None => {
                self.publications.push(publication);
                None
            }
        }
    }

    pub fn primary_title(&self) -> &str {
        &self.primary_title
    }

    /// The primary publication, if present
    pub fn primary(&self) -> Option<&Publication> {
        self.get(&self.primary_title)
    }

    pub fn get(&self, title: &str) -> Option<&Publication> {
        self.publications.iter().find(|p| p.title == title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.get(title).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Publication> {
        self.publications.iter()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.publications.iter().map(|p| p.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    /// Check that the primary title is present and flagged primary
    pub fn validate(&self) -> Result<(), Error> {
        match self.primary() {
            Some(p) if p.is_primary => Ok(()),
            Some(_) => Err(Error::UpstreamMalformed(format!(
                "primary publication '{}' is not flagged as primary",
                self.primary_title
            ))),
            None => Err(Error::UpstreamMalformed(format!(
                "primary publication '{}' is missing from the result set",
                self.primary_title
            ))),
        }
    }
}
