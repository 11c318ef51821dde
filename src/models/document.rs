use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CuttleError, Result};

/// External document ID (catalog record identifier)
pub type DocumentId = u64;

/// ISO language code identifying one per-language index
///
/// Validated on construction: 2 to 8 lowercase ASCII letters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: &str) -> Result<Self> {
        let valid =
            (2..=8).contains(&code.len()) && code.chars().all(|c| c.is_ascii_lowercase());
        if valid {
            Ok(Self(code.to_string()))
        } else {
            Err(CuttleError::InvalidLanguageCode(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LanguageCode {
    type Err = CuttleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A taxonomy (facet) entry referenced by indexed documents
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FacetLabel {
    /// Facet dimension, e.g. "keyword" or "resourceType"
    pub category: String,
    /// Label value within the dimension
    pub value: String,
}

impl FacetLabel {
    pub fn new(category: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for FacetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.value)
    }
}

/// A catalog record projected into indexable form
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Full-text content extracted from the record
    pub content: String,
    /// Facet labels attached to the record
    pub facets: Vec<FacetLabel>,
}

impl Document {
    pub fn new(id: DocumentId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            facets: Vec::new(),
        }
    }

    pub fn with_facet(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.facets.push(FacetLabel::new(category, value));
        self
    }
}
